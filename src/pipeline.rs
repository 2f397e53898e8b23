//! Encode and decode operations over a `Codec`.
//!
//! Each call owns one `MemoryStream`, one codec handle and one image handle.
//! Handles are bound in the order image, codec, stream so that Rust drops
//! them stream first, then codec, then image, on every return path.

use crate::array::PixelArray;
use crate::codec::Codec;
use crate::error::{Jpeg2kError, Result};
use crate::memory_stream::MemoryStream;
use crate::params::{CodecFormat, DecodeParameters, EncodeParameters, ImageSpec};
use crate::planar;
use crate::stream::StreamDirection;
use crate::tiling::{self, TileGrid};
use log::debug;

/// Tile layout for `spec` under `parameters`. Without tiling the whole image
/// is one tile.
///
/// Also checks the image extent and that all components share one sample
/// type, so nothing is handed to a codec that the decoder would reject.
pub fn tile_grid(parameters: &EncodeParameters, spec: &ImageSpec) -> Result<TileGrid> {
    let (image_width, image_height) = spec.extent()?;
    let item_size = spec.item_size()?;
    if let Some(index) = spec
        .components
        .iter()
        .position(|c| c.width != image_width || c.height != image_height)
    {
        return Err(Jpeg2kError::InvalidTileGrid(format!(
            "component {} does not cover the {}x{} image",
            index, image_width, image_height
        )));
    }
    let (width, height) = (image_width as usize, image_height as usize);

    let grid = if parameters.tiling {
        if parameters.tile_origin != (spec.x0, spec.y0) {
            return Err(Jpeg2kError::InvalidTileGrid(format!(
                "tile origin {:?} differs from image origin ({}, {})",
                parameters.tile_origin, spec.x0, spec.y0
            )));
        }
        let (tile_width, tile_height) = parameters.tile_size;
        TileGrid::new(
            width,
            height,
            tile_width as usize,
            tile_height as usize,
            item_size,
        )
    } else {
        TileGrid::single_tile(width, height, item_size)
    };
    let grid = grid.with_planes(spec.components.len());
    grid.validate()?;
    Ok(grid)
}

/// Compresses `pixels` and returns the codestream.
///
/// `pixels` holds the components back to back, each a row-major plane of
/// `spec.item_size()` byte native-endian samples. The image spec is checked
/// before any codec resource is created.
pub fn encode<C: Codec>(
    codec: &C,
    pixels: &[u8],
    parameters: &EncodeParameters,
    spec: &ImageSpec,
    format: CodecFormat,
) -> Result<Vec<u8>> {
    if spec.components.is_empty() {
        return Err(Jpeg2kError::NoComponents);
    }
    let grid = tile_grid(parameters, spec)?;
    if pixels.len() != grid.image_size() {
        return Err(Jpeg2kError::InvalidBufferSize {
            expected: grid.image_size(),
            actual: pixels.len(),
        });
    }
    debug!(
        "encoding {}x{} image, {} components, {} tiles as {}",
        spec.width(),
        spec.height(),
        spec.components.len(),
        grid.tile_count(),
        format.name()
    );

    let mut output = MemoryStream::with_capacity(pixels.len() / 2);
    let mut image = codec.create_image(spec).ok_or(Jpeg2kError::ImageCreation)?;
    let mut handle = codec
        .create_compress(format, parameters.observer.as_ref())
        .ok_or(Jpeg2kError::CodecCreation {
            format: format.name(),
        })?;
    let mut stream = codec
        .open_stream(&mut output, StreamDirection::Output)
        .ok_or(Jpeg2kError::StreamCreation)?;

    if !codec.setup_encoder(&mut handle, parameters, &mut image) {
        return Err(Jpeg2kError::Setup("encoder"));
    }
    if !codec.start_compress(&mut handle, &mut image, &mut stream) {
        return Err(Jpeg2kError::StartCompress);
    }
    tiling::encode_tiles(pixels, &grid, |tile_index, data| {
        codec.write_tile(&mut handle, tile_index, data, &mut stream)
    })?;
    if !codec.end_compress(&mut handle, &mut stream) {
        return Err(Jpeg2kError::EndCompress);
    }

    drop(stream);
    drop(handle);
    drop(image);
    debug!("encoded {} bytes", output.len());
    Ok(output.into_inner())
}

/// Decompresses `data` into a `(height, width)` or `(height, width,
/// components)` array.
pub fn decode<C: Codec>(
    codec: &C,
    data: &[u8],
    parameters: &DecodeParameters,
) -> Result<PixelArray> {
    debug!(
        "decoding {} bytes as {}, reduce {}, layer {}",
        data.len(),
        parameters.format.name(),
        parameters.reduce,
        parameters.layer
    );

    let mut input = MemoryStream::with_data(data.to_vec());
    let mut image: Option<C::Image> = None;
    let mut handle = codec
        .create_decompress(parameters.format, parameters.observer.as_ref())
        .ok_or(Jpeg2kError::CodecCreation {
            format: parameters.format.name(),
        })?;
    let mut stream = codec
        .open_stream(&mut input, StreamDirection::Input)
        .ok_or(Jpeg2kError::StreamCreation)?;

    if !codec.setup_decoder(&mut handle, parameters) {
        return Err(Jpeg2kError::Setup("decoder"));
    }
    let decoded = image.insert(
        codec
            .read_header(&mut handle, &mut stream)
            .ok_or(Jpeg2kError::ReadHeader)?,
    );
    if let Some(components) = &parameters.components {
        if !codec.set_decoded_components(&mut handle, components) {
            return Err(Jpeg2kError::SetDecodedComponents(components.clone()));
        }
    }
    if !codec.decode(&mut handle, &mut stream, decoded) {
        return Err(Jpeg2kError::Decode);
    }
    if !codec.end_decompress(&mut handle, &mut stream) {
        return Err(Jpeg2kError::EndDecompress);
    }

    let output = planar::convert(&codec.components(decoded))?;
    debug!(
        "decoded {:?} array of {:?}",
        output.shape(),
        output.sample_type()
    );
    Ok(output)
}
