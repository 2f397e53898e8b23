//! Array codec: compresses integer `PixelArray`s to JPEG 2000 codestreams.

use crate::array::PixelArray;
use crate::codec::Codec;
use crate::constants::CODEC_ID;
use crate::error::{Jpeg2kError, Result};
use crate::params::{
    CodecFormat, ColorSpace, DecodeParameters, EncodeParameters, ImageSpec, MessageObserver,
    RateControl,
};
use crate::pipeline;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The `id` entry of a serialized config. Always `"jpeg2000"`; any other
/// value is rejected when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecId;

impl Serialize for CodecId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(CODEC_ID)
    }
}

impl<'de> Deserialize<'de> for CodecId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        if id == CODEC_ID {
            Ok(CodecId)
        } else {
            Err(D::Error::custom(format!(
                "expected codec id {:?}, got {:?}",
                CODEC_ID, id
            )))
        }
    }
}

/// Quality settings. With both values at zero compression is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Jpeg2000Config {
    pub id: CodecId,
    /// Target signal to noise ratio in dB.
    pub snr: f32,
    /// Compression ratio, e.g. 10 for a tenfold reduction.
    pub rate: f32,
}

impl Jpeg2000Config {
    pub fn lossless() -> Self {
        Self::default()
    }

    pub fn with_snr(snr: f32) -> Self {
        Self {
            snr,
            ..Self::default()
        }
    }

    pub fn with_rate(rate: f32) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &'static str {
        CODEC_ID
    }

    pub fn validate(&self) -> Result<()> {
        if self.snr > 0.0 && self.rate > 0.0 {
            return Err(Jpeg2kError::InvalidConfig(
                "snr and rate are mutually exclusive".to_string(),
            ));
        }
        if self.snr < 0.0 || self.snr.is_nan() {
            return Err(Jpeg2kError::InvalidConfig(format!(
                "snr must be positive, got {}",
                self.snr
            )));
        }
        if self.rate < 0.0 || self.rate.is_nan() {
            return Err(Jpeg2kError::InvalidConfig(format!(
                "rate must be positive, got {}",
                self.rate
            )));
        }
        Ok(())
    }

    pub fn rate_control(&self) -> RateControl {
        if self.snr > 0.0 {
            RateControl::Psnr(vec![self.snr])
        } else if self.rate > 0.0 {
            RateControl::Rates(vec![self.rate])
        } else {
            RateControl::Lossless
        }
    }
}

/// JPEG 2000 codec over N-dimensional integer arrays.
///
/// Layout by shape:
/// - `(h, w)`: one gray component.
/// - `(h, w, 3)` or `(h, w, 4)`: sRGB components.
/// - anything else with two or more axes: leading axes are folded into rows
///   and each `(shape[-2], shape[-1])` slab becomes one tile.
pub struct Jpeg2000<C: Codec> {
    codec: C,
    config: Jpeg2000Config,
    observer: Option<MessageObserver>,
}

impl<C: Codec> Jpeg2000<C> {
    pub fn new(codec: C, config: Jpeg2000Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            codec,
            config,
            observer: None,
        })
    }

    pub fn from_config(codec: C, config: Jpeg2000Config) -> Result<Self> {
        Self::new(codec, config)
    }

    pub fn config(&self) -> Jpeg2000Config {
        self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Image and encoder parameters for an array, plus the planar sample
    /// bytes to hand to the pipeline.
    fn prepare(&self, array: &PixelArray) -> Result<(ImageSpec, EncodeParameters, Vec<u8>)> {
        let sample_type = array.sample_type();
        if !sample_type.is_integer() || sample_type.item_size() > 4 {
            return Err(Jpeg2kError::UnsupportedSampleType(sample_type));
        }
        let precision = (sample_type.item_size() * 8) as u32;
        let signed = sample_type.is_signed();

        let mut parameters = EncodeParameters::default()
            .with_rate_control(self.config.rate_control());
        parameters.observer = self.observer.clone();

        let shape = array.shape();
        let dimension = |value: usize| {
            u32::try_from(value).map_err(|_| Jpeg2kError::UnsupportedShape(shape.to_vec()))
        };
        match *shape {
            [] | [_] => Err(Jpeg2kError::UnsupportedShape(shape.to_vec())),
            [height, width] => {
                let spec = ImageSpec::uniform(
                    dimension(width)?,
                    dimension(height)?,
                    1,
                    precision,
                    signed,
                    ColorSpace::Gray,
                );
                Ok((spec, parameters, array.as_bytes().to_vec()))
            }
            [height, width, channels @ (3 | 4)] => {
                let spec = ImageSpec::uniform(
                    dimension(width)?,
                    dimension(height)?,
                    channels,
                    precision,
                    signed,
                    ColorSpace::Srgb,
                );
                Ok((spec, parameters, array.to_planar()?.into_bytes()))
            }
            [.., tile_height, tile_width] => {
                let rows = array.len() / tile_width.max(1);
                let spec = ImageSpec::uniform(
                    dimension(tile_width)?,
                    dimension(rows)?,
                    1,
                    precision,
                    signed,
                    ColorSpace::Gray,
                );
                let parameters =
                    parameters.with_tiles(dimension(tile_width)?, dimension(tile_height)?);
                Ok((spec, parameters, array.as_bytes().to_vec()))
            }
        }
    }

    /// Encodes `array` as a raw J2K codestream.
    pub fn encode(&self, array: &PixelArray) -> Result<Vec<u8>> {
        let (spec, parameters, pixels) = self.prepare(array)?;
        pipeline::encode(&self.codec, &pixels, &parameters, &spec, CodecFormat::J2k)
    }

    /// Decodes a J2K or JP2 buffer into a flat array.
    pub fn decode(&self, data: &[u8]) -> Result<PixelArray> {
        let format = CodecFormat::detect(data)?;
        let mut parameters = DecodeParameters::new(format);
        parameters.observer = self.observer.clone();
        Ok(pipeline::decode(&self.codec, data, &parameters)?.flatten())
    }

    /// Decodes into `out`, which must have the decoded element count and
    /// sample type. The shape of `out` is kept.
    pub fn decode_into(&self, data: &[u8], out: &mut PixelArray) -> Result<()> {
        let decoded = self.decode(data)?;
        if decoded.sample_type() != out.sample_type() {
            return Err(Jpeg2kError::UnsupportedSampleType(out.sample_type()));
        }
        if decoded.len() != out.len() {
            return Err(Jpeg2kError::InvalidBufferSize {
                expected: decoded.as_bytes().len(),
                actual: out.as_bytes().len(),
            });
        }
        out.as_bytes_mut().copy_from_slice(decoded.as_bytes());
        Ok(())
    }
}
