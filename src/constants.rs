// JPEG 2000 signatures, see ISO/IEC 15444-1 annex I (JP2) and A.4.1 (SOC + SIZ).

/// JP2 signature box as registered by RFC 3745.
pub const JP2_RFC3745_MAGIC: &[u8] = b"\x00\x00\x00\x0c\x6a\x50\x20\x20\x0d\x0a\x87\x0a";

/// Bare JP2 signature box contents.
pub const JP2_MAGIC: &[u8] = b"\x0d\x0a\x87\x0a";

/// Start of codestream followed by the image and tile size marker.
pub const J2K_CODESTREAM_MAGIC: &[u8] = &[0xFF, 0x4F, 0xFF, 0x51];

pub const DEFAULT_CODEBLOCK_SIZE: u32 = 64;

/// Progression order changes the codec accepts per image.
pub const MAXIMUM_PROGRESSION_CHANGES: usize = 32;

/// Quality layers the codec accepts per image.
pub const MAXIMUM_QUALITY_LAYERS: usize = 100;

pub const CODEC_ID: &str = "jpeg2000";
