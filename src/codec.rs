//! The codec capability the pipeline drives.
//!
//! A backend exposes its native handles as three associated types (stream,
//! codec and image) and reports success of each protocol step as a plain
//! `bool` or `Option`, which is how block codecs report failure. The pipeline
//! owns the handles and turns failed steps into `Jpeg2kError` values; the
//! backend releases native resources when a handle is dropped.

use crate::params::{CodecFormat, DecodeParameters, EncodeParameters, ImageSpec, MessageObserver};
use crate::planar::DecodedComponent;
use crate::stream::{CodecStream, StreamDirection};

pub trait Codec {
    /// Stream handle bound to a caller-owned `CodecStream` for its lifetime.
    type Stream<'s>;
    /// Compressor or decompressor handle.
    type Handle;
    type Image;

    /// Wraps `stream` in the codec's stream callbacks.
    fn open_stream<'s>(
        &self,
        stream: &'s mut dyn CodecStream,
        direction: StreamDirection,
    ) -> Option<Self::Stream<'s>>;

    fn create_compress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<Self::Handle>;

    fn create_decompress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<Self::Handle>;

    /// Allocates an image without sample data; tiles are written separately.
    fn create_image(&self, spec: &ImageSpec) -> Option<Self::Image>;

    fn setup_encoder(
        &self,
        handle: &mut Self::Handle,
        parameters: &EncodeParameters,
        image: &mut Self::Image,
    ) -> bool;

    fn start_compress(
        &self,
        handle: &mut Self::Handle,
        image: &mut Self::Image,
        stream: &mut Self::Stream<'_>,
    ) -> bool;

    /// Writes one tile. `data` holds exactly the tile's samples, component
    /// by component.
    fn write_tile(
        &self,
        handle: &mut Self::Handle,
        tile_index: u32,
        data: &[u8],
        stream: &mut Self::Stream<'_>,
    ) -> bool;

    fn end_compress(&self, handle: &mut Self::Handle, stream: &mut Self::Stream<'_>) -> bool;

    fn setup_decoder(&self, handle: &mut Self::Handle, parameters: &DecodeParameters) -> bool;

    fn read_header(
        &self,
        handle: &mut Self::Handle,
        stream: &mut Self::Stream<'_>,
    ) -> Option<Self::Image>;

    fn set_decoded_components(&self, handle: &mut Self::Handle, components: &[u32]) -> bool;

    fn decode(
        &self,
        handle: &mut Self::Handle,
        stream: &mut Self::Stream<'_>,
        image: &mut Self::Image,
    ) -> bool;

    fn end_decompress(&self, handle: &mut Self::Handle, stream: &mut Self::Stream<'_>) -> bool;

    /// Decoded planes of `image`, one per component.
    fn components<'i>(&self, image: &'i Self::Image) -> Vec<DecodedComponent<'i>>;
}
