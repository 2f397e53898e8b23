//! Planar-to-interleaved conversion of decoded components.
//!
//! Codecs hand back one flat `i32` plane per component. `convert` checks that
//! the planes describe the same geometry and produces a single array of the
//! smallest integer type that holds the sample precision: `(height, width)`
//! for one component, `(height, width, components)` otherwise.

use crate::array::{PixelArray, SampleType};
use crate::error::{Jpeg2kError, Result};

/// One decoded component plane as reported by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedComponent<'a> {
    pub width: usize,
    pub height: usize,
    /// Significant bits per sample.
    pub precision: u32,
    pub signed: bool,
    /// Row-major samples, `width * height` of them.
    pub data: &'a [i32],
}

/// Ensures all components share width, height, precision and signedness.
pub fn check_consistency(components: &[DecodedComponent<'_>]) -> Result<()> {
    let Some(first) = components.first() else {
        return Err(Jpeg2kError::NoComponents);
    };
    for (index, component) in components.iter().enumerate() {
        let detail = if (component.width, component.height) != (first.width, first.height) {
            format!(
                "size {}x{} differs from {}x{}",
                component.width, component.height, first.width, first.height
            )
        } else if component.precision != first.precision {
            format!(
                "precision {} differs from {}",
                component.precision, first.precision
            )
        } else if component.signed != first.signed {
            format!(
                "signedness {} differs from {}",
                component.signed, first.signed
            )
        } else if component.data.len() < component.width * component.height {
            format!(
                "{} samples for a {}x{} plane",
                component.data.len(),
                component.width,
                component.height
            )
        } else {
            continue;
        };
        return Err(Jpeg2kError::InconsistentComponents { index, detail });
    }
    Ok(())
}

/// Output element type for a set of consistent components.
pub fn output_sample_type(components: &[DecodedComponent<'_>]) -> Result<SampleType> {
    let first = components.first().ok_or(Jpeg2kError::NoComponents)?;
    SampleType::for_precision(first.precision, first.signed)
}

/// Narrows `value` to `sample_type` and stores it at `out`. The cast keeps
/// the low bits; values are assumed to already fit the declared precision.
#[inline]
fn store(out: &mut [u8], sample_type: SampleType, value: i32) {
    match sample_type {
        SampleType::U8 => out[0] = value as u8,
        SampleType::I8 => out[0] = value as i8 as u8,
        SampleType::U16 => out.copy_from_slice(&(value as u16).to_ne_bytes()),
        SampleType::I16 => out.copy_from_slice(&(value as i16).to_ne_bytes()),
        SampleType::U32 => out.copy_from_slice(&(value as u32).to_ne_bytes()),
        _ => out.copy_from_slice(&value.to_ne_bytes()),
    }
}

/// Builds the output array from decoded component planes.
pub fn convert(components: &[DecodedComponent<'_>]) -> Result<PixelArray> {
    check_consistency(components)?;
    let sample_type = output_sample_type(components)?;
    let size = sample_type.item_size();

    let first = &components[0];
    let (width, height) = (first.width, first.height);
    let pixels = width * height;
    let count = components.len();

    let shape = if count == 1 {
        vec![height, width]
    } else {
        vec![height, width, count]
    };
    let mut output = PixelArray::zeros(&shape, sample_type);
    let out = output.as_bytes_mut();

    if count == 1 {
        for (dst, &value) in out.chunks_exact_mut(size).zip(&first.data[..pixels]) {
            store(dst, sample_type, value);
        }
    } else {
        for (j, component) in components.iter().enumerate() {
            for (i, &value) in component.data[..pixels].iter().enumerate() {
                let at = (i * count + j) * size;
                store(&mut out[at..at + size], sample_type, value);
            }
        }
    }
    Ok(output)
}
