//! N-dimensional sample arrays.
//!
//! `PixelArray` is the buffer type exchanged with callers: a row-major shape,
//! a sample type and the samples themselves as native-endian bytes.

use crate::error::{Jpeg2kError, Result};

/// Element type of a `PixelArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl SampleType {
    pub fn item_size(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::U64 | SampleType::I64 | SampleType::F64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            SampleType::I8 | SampleType::I16 | SampleType::I32 | SampleType::I64
        )
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Smallest integer type able to hold `precision` bits.
    pub fn for_precision(precision: u32, signed: bool) -> Result<Self> {
        let sample_type = match (precision, signed) {
            (1..=8, false) => SampleType::U8,
            (1..=8, true) => SampleType::I8,
            (9..=16, false) => SampleType::U16,
            (9..=16, true) => SampleType::I16,
            (17..=32, false) => SampleType::U32,
            (17..=32, true) => SampleType::I32,
            _ => return Err(Jpeg2kError::UnsupportedPrecision(precision)),
        };
        Ok(sample_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelArray {
    shape: Vec<usize>,
    sample_type: SampleType,
    data: Vec<u8>,
}

macro_rules! typed_constructor {
    ($name:ident, $ty:ty, $sample:expr) => {
        pub fn $name(shape: &[usize], values: &[$ty]) -> Result<Self> {
            let data = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
            Self::from_bytes(shape, $sample, data)
        }
    };
}

impl PixelArray {
    /// Wraps native-endian sample bytes. The byte count must match the shape.
    pub fn from_bytes(shape: &[usize], sample_type: SampleType, data: Vec<u8>) -> Result<Self> {
        let expected = shape.iter().product::<usize>() * sample_type.item_size();
        if data.len() != expected {
            return Err(Jpeg2kError::InvalidBufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            sample_type,
            data,
        })
    }

    pub fn zeros(shape: &[usize], sample_type: SampleType) -> Self {
        let len = shape.iter().product::<usize>() * sample_type.item_size();
        Self {
            shape: shape.to_vec(),
            sample_type,
            data: vec![0; len],
        }
    }

    typed_constructor!(from_u8, u8, SampleType::U8);
    typed_constructor!(from_i8, i8, SampleType::I8);
    typed_constructor!(from_u16, u16, SampleType::U16);
    typed_constructor!(from_i16, i16, SampleType::I16);
    typed_constructor!(from_u32, u32, SampleType::U32);
    typed_constructor!(from_i32, i32, SampleType::I32);
    typed_constructor!(from_u64, u64, SampleType::U64);
    typed_constructor!(from_i64, i64, SampleType::I64);
    typed_constructor!(from_f32, f32, SampleType::F32);
    typed_constructor!(from_f64, f64, SampleType::F64);

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn item_size(&self) -> usize {
        self.sample_type.item_size()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns the same samples under a new shape with the same element count.
    pub fn reshape(mut self, shape: &[usize]) -> Result<Self> {
        if shape.iter().product::<usize>() != self.len() {
            return Err(Jpeg2kError::UnsupportedShape(shape.to_vec()));
        }
        self.shape = shape.to_vec();
        Ok(self)
    }

    pub fn flatten(self) -> Self {
        let len = self.len();
        Self {
            shape: vec![len],
            ..self
        }
    }

    /// Integer value at a row-major index, widened to `i64`. Returns `None`
    /// for out-of-range indices and floating point arrays.
    pub fn get(&self, index: &[usize]) -> Option<i64> {
        if index.len() != self.shape.len() || !self.sample_type.is_integer() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        Some(self.value_at(offset))
    }

    fn value_at(&self, element: usize) -> i64 {
        let size = self.item_size();
        let b = &self.data[element * size..(element + 1) * size];
        match self.sample_type {
            SampleType::U8 => b[0] as i64,
            SampleType::I8 => b[0] as i8 as i64,
            SampleType::U16 => u16::from_ne_bytes([b[0], b[1]]) as i64,
            SampleType::I16 => i16::from_ne_bytes([b[0], b[1]]) as i64,
            SampleType::U32 => u32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as i64,
            SampleType::I32 => i32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as i64,
            SampleType::U64 | SampleType::I64 => {
                i64::from_ne_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            SampleType::F32 | SampleType::F64 => 0,
        }
    }

    /// All samples of an integer array widened to `i64`, in row-major order.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        (0..self.len()).map(|i| self.value_at(i)).collect()
    }

    /// Converts a channel-last `(height, width, channels)` array into a
    /// planar `(channels, height, width)` one.
    pub fn to_planar(&self) -> Result<Self> {
        let &[height, width, channels] = self.shape.as_slice() else {
            return Err(Jpeg2kError::UnsupportedShape(self.shape.clone()));
        };
        let size = self.item_size();
        let plane = height * width;
        let mut data = vec![0u8; self.data.len()];
        for pixel in 0..plane {
            for c in 0..channels {
                let src = (pixel * channels + c) * size;
                let dst = (c * plane + pixel) * size;
                data[dst..dst + size].copy_from_slice(&self.data[src..src + size]);
            }
        }
        Ok(Self {
            shape: vec![channels, height, width],
            sample_type: self.sample_type,
            data,
        })
    }
}
