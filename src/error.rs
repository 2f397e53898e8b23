use thiserror::Error;

use crate::array::SampleType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Jpeg2kError {
    // Resource creation
    #[error("Failed to create the codec stream")]
    StreamCreation,
    #[error("Failed to create the {format} codec")]
    CodecCreation { format: &'static str },
    #[error("Failed to create the codec image")]
    ImageCreation,

    // Codec protocol
    #[error("Failed to set up the {0}")]
    Setup(&'static str),
    #[error("Failed to start compression")]
    StartCompress,
    #[error("Failed to write tile {tile_index}")]
    TileWriteFailed { tile_index: u32 },
    #[error("Failed to finish compression")]
    EndCompress,
    #[error("Failed to read the image header")]
    ReadHeader,
    #[error("Failed to select decoded components {0:?}")]
    SetDecodedComponents(Vec<u32>),
    #[error("Failed to decode the image")]
    Decode,
    #[error("Failed to finish decompression")]
    EndDecompress,

    // Data consistency
    #[error("Image has no components")]
    NoComponents,
    #[error("Component {index} does not match component 0: {detail}")]
    InconsistentComponents { index: usize, detail: String },
    #[error("Unsupported sample precision: {0} bits")]
    UnsupportedPrecision(u32),
    #[error("Unsupported sample type: {0:?}")]
    UnsupportedSampleType(SampleType),
    #[error("Unsupported array shape: {0:?}")]
    UnsupportedShape(Vec<usize>),
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },
    #[error("Invalid tile grid: {0}")]
    InvalidTileGrid(String),
    #[error("Invalid image extent: {0}")]
    InvalidImageExtent(String),

    // Stream boundaries, surfaced only by direct MemoryStream use
    #[error("Read at offset {position} is past the end of a {length} byte stream")]
    ReadPastEnd { position: u64, length: usize },
    #[error("Seek to {offset} is outside a {length} byte stream")]
    SeekOutOfRange { offset: i64, length: usize },
    #[error("Write of {length} bytes at offset {position} cannot be allocated")]
    WriteOverflow { position: u64, length: usize },

    // Configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unrecognized JPEG 2000 header")]
    UnknownFormat,
}

pub type Result<T> = std::result::Result<T, Jpeg2kError>;
