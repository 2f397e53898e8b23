//! Array codec behaviour over the recording codec.

mod support;

use jpeg2k_bridge::{Jpeg2000, Jpeg2000Config, Jpeg2kError, PixelArray, SampleType};
use support::MockCodec;

fn codec() -> Jpeg2000<MockCodec> {
    Jpeg2000::new(MockCodec::new(), Jpeg2000Config::default()).unwrap()
}

fn ramp_u8(shape: &[usize]) -> PixelArray {
    let len: usize = shape.iter().product();
    let values: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
    PixelArray::from_u8(shape, &values).unwrap()
}

fn tile_events(codec: &Jpeg2000<MockCodec>) -> usize {
    codec
        .codec()
        .events()
        .iter()
        .filter(|e| e.starts_with("tile"))
        .count()
}

#[test]
fn test_two_dimensional_round_trip() {
    let codec = codec();
    let array = ramp_u8(&[30, 40]);
    let encoded = codec.encode(&array).unwrap();
    assert_eq!(tile_events(&codec), 1);

    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded.shape(), &[1200]);
    assert_eq!(decoded.as_bytes(), array.as_bytes());
}

#[test]
fn test_sixteen_bit_round_trip() {
    let values: Vec<u16> = (0..41 * 29).map(|i| (i * 13 % 4096) as u16).collect();
    let array = PixelArray::from_u16(&[41, 29], &values).unwrap();
    let codec = codec();
    let decoded = codec.decode(&codec.encode(&array).unwrap()).unwrap();
    assert_eq!(decoded.sample_type(), SampleType::U16);
    assert_eq!(decoded.as_bytes(), array.as_bytes());
}

#[test]
fn test_signed_and_wide_integers() {
    let codec = codec();

    let signed = PixelArray::from_i8(&[2, 3], &[-128, -1, 0, 1, 64, 127]).unwrap();
    let decoded = codec.decode(&codec.encode(&signed).unwrap()).unwrap();
    assert_eq!(decoded.sample_type(), SampleType::I8);
    assert_eq!(decoded.to_i64_vec(), vec![-128, -1, 0, 1, 64, 127]);

    let wide = PixelArray::from_u32(&[2, 2], &[0, 1, 1 << 31, u32::MAX]).unwrap();
    let decoded = codec.decode(&codec.encode(&wide).unwrap()).unwrap();
    assert_eq!(decoded.sample_type(), SampleType::U32);
    assert_eq!(decoded.as_bytes(), wide.as_bytes());
}

#[test]
fn test_color_image_round_trip() {
    let codec = codec();
    let array = ramp_u8(&[5, 6, 3]);
    let encoded = codec.encode(&array).unwrap();
    assert!(codec.codec().events().contains(&"tile 0 (90 bytes)".to_string()));

    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded.shape(), &[90]);
    assert_eq!(decoded.as_bytes(), array.as_bytes());

    let rgba = ramp_u8(&[4, 4, 4]);
    let decoded = codec.decode(&codec.encode(&rgba).unwrap()).unwrap();
    assert_eq!(decoded.as_bytes(), rgba.as_bytes());
}

#[test]
fn test_volume_is_tiled_per_slab() {
    let codec = codec();
    let array = ramp_u8(&[21, 22, 23]);
    let encoded = codec.encode(&array).unwrap();
    assert_eq!(tile_events(&codec), 21);

    let decoded = codec.decode(&encoded).unwrap();
    assert_eq!(decoded.len(), 21 * 22 * 23);
    assert_eq!(decoded.as_bytes(), array.as_bytes());
}

#[test]
fn test_four_dimensional_round_trip() {
    let codec = codec();
    let array = ramp_u8(&[2, 3, 4, 5]);
    let decoded = codec.decode(&codec.encode(&array).unwrap()).unwrap();
    assert_eq!(tile_events(&codec), 6);
    assert_eq!(decoded.as_bytes(), array.as_bytes());
}

#[test]
fn test_rejected_arrays() {
    let codec = codec();
    assert_eq!(
        codec.encode(&ramp_u8(&[255])),
        Err(Jpeg2kError::UnsupportedShape(vec![255]))
    );
    let floats = PixelArray::from_f32(&[2, 2], &[0.0, 1.0, 2.0, 3.0]).unwrap();
    assert_eq!(
        codec.encode(&floats),
        Err(Jpeg2kError::UnsupportedSampleType(SampleType::F32))
    );
    let wide = PixelArray::from_i64(&[2, 2], &[0, 1, 2, 3]).unwrap();
    assert_eq!(
        codec.encode(&wide),
        Err(Jpeg2kError::UnsupportedSampleType(SampleType::I64))
    );
    let wide = PixelArray::from_u64(&[2, 2], &[0, 1, 2, 3]).unwrap();
    assert!(codec.encode(&wide).is_err());
    assert!(codec.codec().events().is_empty());
}

#[test]
fn test_decode_into_caller_buffer() {
    let codec = codec();
    let array = ramp_u8(&[8, 8]);
    let encoded = codec.encode(&array).unwrap();

    let mut out = PixelArray::zeros(&[4, 16], SampleType::U8);
    codec.decode_into(&encoded, &mut out).unwrap();
    assert_eq!(out.shape(), &[4, 16]);
    assert_eq!(out.as_bytes(), array.as_bytes());

    let mut wrong_type = PixelArray::zeros(&[8, 8], SampleType::U16);
    assert!(codec.decode_into(&encoded, &mut wrong_type).is_err());
    let mut wrong_size = PixelArray::zeros(&[8, 7], SampleType::U8);
    assert!(matches!(
        codec.decode_into(&encoded, &mut wrong_size),
        Err(Jpeg2kError::InvalidBufferSize { .. })
    ));
}

#[test]
fn test_unknown_header() {
    assert_eq!(
        codec().decode(b"not a jpeg 2000 stream"),
        Err(Jpeg2kError::UnknownFormat)
    );
}

#[test]
fn test_config_round_trip() {
    let codec = Jpeg2000::from_config(MockCodec::new(), Jpeg2000Config::with_snr(45.0)).unwrap();
    assert_eq!(codec.config(), Jpeg2000Config::with_snr(45.0));
    assert_eq!(codec.config().id(), "jpeg2000");

    let config = Jpeg2000Config {
        snr: 30.0,
        rate: 5.0,
        ..Jpeg2000Config::default()
    };
    let result = Jpeg2000::new(MockCodec::new(), config);
    assert!(matches!(result, Err(Jpeg2kError::InvalidConfig(_))));
}

#[test]
fn test_lossy_settings_still_decode() {
    // The recording codec stores samples verbatim whatever the rate control.
    let codec = Jpeg2000::new(MockCodec::new(), Jpeg2000Config::with_rate(10.0)).unwrap();
    let array = ramp_u8(&[12, 9]);
    let decoded = codec.decode(&codec.encode(&array).unwrap()).unwrap();
    assert_eq!(decoded.as_bytes(), array.as_bytes());
}
