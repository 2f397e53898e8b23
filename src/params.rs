//! Encoder, decoder and image parameters passed to a codec.
//!
//! These follow the shape of the codec's own parameter blocks closely so a
//! backend can copy them field by field.

use crate::array::SampleType;
use crate::constants::{
    DEFAULT_CODEBLOCK_SIZE, J2K_CODESTREAM_MAGIC, JP2_MAGIC, JP2_RFC3745_MAGIC,
};
use crate::error::{Jpeg2kError, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::sync::Arc;

/// Container or stream syntax handled by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum CodecFormat {
    /// Raw JPEG 2000 codestream.
    J2k = 0,
    /// JPT-stream (JPIP), read only.
    Jpt = 1,
    /// JP2 file format.
    Jp2 = 2,
    /// JPP-stream (JPIP).
    Jpp = 3,
    /// JPX file format (Part 2).
    Jpx = 4,
}

impl CodecFormat {
    /// Identifies the format from the first bytes of a compressed buffer.
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.starts_with(JP2_RFC3745_MAGIC) || data.starts_with(JP2_MAGIC) {
            Ok(CodecFormat::Jp2)
        } else if data.starts_with(J2K_CODESTREAM_MAGIC) {
            Ok(CodecFormat::J2k)
        } else {
            Err(Jpeg2kError::UnknownFormat)
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecFormat::J2k => "J2K",
            CodecFormat::Jpt => "JPT",
            CodecFormat::Jp2 => "JP2",
            CodecFormat::Jpp => "JPP",
            CodecFormat::Jpx => "JPX",
        }
    }
}

/// Packet progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ProgressionOrder {
    /// Layer, resolution, component, precinct.
    Lrcp = 0,
    /// Resolution, layer, component, precinct.
    Rlcp = 1,
    /// Resolution, precinct, component, layer.
    Rpcl = 2,
    /// Precinct, component, resolution, layer.
    Pcrl = 3,
    /// Component, precinct, resolution, layer.
    Cprl = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ColorSpace {
    Unspecified = 0,
    Srgb = 1,
    Gray = 2,
    Sycc = 3,
    Eycc = 4,
    Cmyk = 5,
}

/// How the encoder allocates bits to quality layers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RateControl {
    /// A single reversible layer.
    #[default]
    Lossless,
    /// Compression ratios per layer, decreasing. A trailing 0 means the last
    /// layer is lossless.
    Rates(Vec<f32>),
    /// Target PSNR in dB per layer, increasing. A trailing 0 means the last
    /// layer is lossless.
    Psnr(Vec<f32>),
}

impl RateControl {
    pub fn layer_count(&self) -> usize {
        match self {
            RateControl::Lossless => 1,
            RateControl::Rates(layers) | RateControl::Psnr(layers) => layers.len(),
        }
    }

    /// The irreversible wavelet is used unless the final layer is lossless.
    pub fn irreversible(&self) -> bool {
        match self {
            RateControl::Lossless => false,
            RateControl::Rates(layers) | RateControl::Psnr(layers) => {
                layers.last().is_some_and(|&last| last != 0.0)
            }
        }
    }
}

/// A progression order change entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionChange {
    pub tile: u32,
    pub resolution_start: u32,
    pub component_start: u32,
    pub layer_end: u32,
    pub resolution_end: u32,
    pub component_end: u32,
    pub order: ProgressionOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Receives diagnostic messages emitted by the codec.
pub type MessageObserver = Arc<dyn Fn(MessageLevel, &str) + Send + Sync>;

/// Sends a codec message to the observer, or to the `log` facade when none
/// is installed.
pub fn report(observer: Option<&MessageObserver>, level: MessageLevel, message: &str) {
    let message = message.trim_end();
    match observer {
        Some(observer) => observer(level, message),
        None => match level {
            MessageLevel::Info => log::debug!("codec: {}", message),
            MessageLevel::Warning => log::warn!("codec: {}", message),
            MessageLevel::Error => log::error!("codec: {}", message),
        },
    }
}

/// Compression parameters.
#[derive(Clone)]
pub struct EncodeParameters {
    pub tiling: bool,
    pub tile_origin: (u32, u32),
    pub tile_size: (u32, u32),
    pub rate_control: RateControl,
    pub progression_order: ProgressionOrder,
    pub resolutions: u32,
    pub codeblock_size: (u32, u32),
    /// Multi-component transform on the first three components.
    pub mct: bool,
    pub comment: Option<String>,
    pub progression_changes: Vec<ProgressionChange>,
    pub observer: Option<MessageObserver>,
}

impl Default for EncodeParameters {
    fn default() -> Self {
        Self {
            tiling: false,
            tile_origin: (0, 0),
            tile_size: (0, 0),
            rate_control: RateControl::Lossless,
            progression_order: ProgressionOrder::Lrcp,
            // Only the full resolution is ever requested back.
            resolutions: 1,
            codeblock_size: (DEFAULT_CODEBLOCK_SIZE, DEFAULT_CODEBLOCK_SIZE),
            mct: false,
            comment: None,
            progression_changes: Vec::new(),
            observer: None,
        }
    }
}

impl fmt::Debug for EncodeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeParameters")
            .field("tiling", &self.tiling)
            .field("tile_origin", &self.tile_origin)
            .field("tile_size", &self.tile_size)
            .field("rate_control", &self.rate_control)
            .field("progression_order", &self.progression_order)
            .field("resolutions", &self.resolutions)
            .field("codeblock_size", &self.codeblock_size)
            .field("mct", &self.mct)
            .field("comment", &self.comment)
            .field("progression_changes", &self.progression_changes)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl EncodeParameters {
    /// Enables tiling with the given nominal tile size.
    pub fn with_tiles(mut self, width: u32, height: u32) -> Self {
        self.tiling = true;
        self.tile_size = (width, height);
        self
    }

    pub fn with_rate_control(mut self, rate_control: RateControl) -> Self {
        self.rate_control = rate_control;
        self
    }

    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Geometry and encoding of one image component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    pub width: u32,
    pub height: u32,
    pub dx: u32,
    pub dy: u32,
    pub x0: u32,
    pub y0: u32,
    pub precision: u32,
    pub bit_depth: u32,
    pub signed: bool,
}

impl ComponentSpec {
    pub fn new(width: u32, height: u32, precision: u32, signed: bool) -> Self {
        Self {
            width,
            height,
            dx: 1,
            dy: 1,
            x0: 0,
            y0: 0,
            precision,
            bit_depth: precision,
            signed,
        }
    }
}

/// Image handed to the codec for compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub color_space: ColorSpace,
    pub components: Vec<ComponentSpec>,
}

impl ImageSpec {
    /// `count` identical components covering a `width` x `height` grid.
    pub fn uniform(
        width: u32,
        height: u32,
        count: usize,
        precision: u32,
        signed: bool,
        color_space: ColorSpace,
    ) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
            color_space,
            components: vec![ComponentSpec::new(width, height, precision, signed); count],
        }
    }

    /// Width of the image area, zero when `x1` lies before `x0`.
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height of the image area, zero when `y1` lies before `y0`.
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// `(width, height)` of the image area. Fails unless `x0 < x1` and
    /// `y0 < y1`.
    pub fn extent(&self) -> Result<(u32, u32)> {
        match (self.x1.checked_sub(self.x0), self.y1.checked_sub(self.y0)) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Ok((width, height)),
            _ => Err(Jpeg2kError::InvalidImageExtent(format!(
                "({}, {}) to ({}, {})",
                self.x0, self.y0, self.x1, self.y1
            ))),
        }
    }

    /// Sample type shared by every component.
    ///
    /// Components must agree on precision and signedness, the same rule the
    /// decoder applies, and the precision must fit 32 bits.
    pub fn sample_type(&self) -> Result<SampleType> {
        let first = self.components.first().ok_or(Jpeg2kError::NoComponents)?;
        for (index, component) in self.components.iter().enumerate().skip(1) {
            if component.precision != first.precision {
                return Err(Jpeg2kError::InconsistentComponents {
                    index,
                    detail: format!(
                        "precision {} differs from {}",
                        component.precision, first.precision
                    ),
                });
            }
            if component.signed != first.signed {
                return Err(Jpeg2kError::InconsistentComponents {
                    index,
                    detail: "signedness differs".to_string(),
                });
            }
        }
        SampleType::for_precision(first.precision, first.signed)
    }

    /// Bytes per sample of the shared sample type.
    pub fn item_size(&self) -> Result<usize> {
        Ok(self.sample_type()?.item_size())
    }
}

/// Decompression parameters.
#[derive(Clone)]
pub struct DecodeParameters {
    pub format: CodecFormat,
    /// Number of highest resolution levels to discard.
    pub reduce: u32,
    /// Maximum number of quality layers to decode, 0 for all.
    pub layer: u32,
    /// Restricts decoding to these component indices.
    pub components: Option<Vec<u32>>,
    pub observer: Option<MessageObserver>,
}

impl DecodeParameters {
    pub fn new(format: CodecFormat) -> Self {
        Self {
            format,
            reduce: 0,
            layer: 0,
            components: None,
            observer: None,
        }
    }

    pub fn with_components(mut self, components: Vec<u32>) -> Self {
        self.components = Some(components);
        self
    }

    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl fmt::Debug for DecodeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeParameters")
            .field("format", &self.format)
            .field("reduce", &self.reduce)
            .field("layer", &self.layer)
            .field("components", &self.components)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
