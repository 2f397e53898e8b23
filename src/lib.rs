//! Bridges raw pixel buffers and a JPEG 2000 codec that talks through a
//! random-access byte stream and a component-planar image model.
//!
//! The crate owns data transport and layout: an in-memory stream with the
//! codec's callback conventions, tiled encoding into contiguous tile buffers,
//! and conversion of decoded component planes back into one array. The
//! compression itself is done by a `Codec` backend; enable the `openjpeg`
//! feature for the OpenJPEG one.

pub mod array;
pub mod array_codec;
pub mod codec;
pub mod constants;
pub mod error;
pub mod memory_stream;
#[cfg(feature = "openjpeg")]
pub mod openjpeg;
pub mod params;
pub mod pipeline;
pub mod planar;
pub mod stream;
pub mod tiling;

pub use array::{PixelArray, SampleType};
pub use array_codec::{CodecId, Jpeg2000, Jpeg2000Config};
pub use codec::Codec;
pub use error::{Jpeg2kError, Result};
pub use memory_stream::MemoryStream;
#[cfg(feature = "openjpeg")]
pub use openjpeg::OpenJpeg;
pub use params::{
    CodecFormat, ColorSpace, ComponentSpec, DecodeParameters, EncodeParameters, ImageSpec,
    MessageLevel, MessageObserver, ProgressionChange, ProgressionOrder, RateControl,
};
pub use pipeline::{decode, encode};
pub use planar::DecodedComponent;
pub use stream::{CodecStream, StreamAdapter, StreamDirection};
pub use tiling::{TileGrid, TileRect, encode_tiles};
