//! A recording codec for integration tests.
//!
//! The "codestream" is a plain container: a header with the image geometry,
//! an optional comment, then one record per tile (index, length, raw tile
//! bytes) and a two byte end marker. Everything goes through the
//! `StreamAdapter` callbacks, the same way a native codec drives them.

#![allow(dead_code)]

use jpeg2k_bridge::constants::J2K_CODESTREAM_MAGIC;
use jpeg2k_bridge::params::report;
use jpeg2k_bridge::stream::READ_FAILED;
use jpeg2k_bridge::{
    Codec, CodecFormat, CodecStream, DecodeParameters, DecodedComponent, EncodeParameters,
    ImageSpec, MessageLevel, MessageObserver, SampleType, StreamAdapter, StreamDirection,
    TileGrid,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

const END_MARKER: [u8; 2] = [0xFF, 0xD9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OpenStream,
    CreateCodec,
    CreateImage,
    SetupEncoder,
    StartCompress,
    WriteTile(u32),
    EndCompress,
    SetupDecoder,
    ReadHeader,
    SetDecodedComponents,
    Decode,
    EndDecompress,
}

pub type Events = Rc<RefCell<Vec<String>>>;

#[derive(Default, Clone)]
pub struct MockCodec {
    pub events: Events,
    pub fail_at: Option<Stage>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Teardown events in the order they happened.
    pub fn teardown(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("destroy"))
            .collect()
    }

    fn fails(&self, stage: Stage) -> bool {
        self.fail_at == Some(stage)
    }

    fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }
}

pub struct MockStream<'s> {
    adapter: StreamAdapter<'s>,
    events: Events,
}

impl MockStream<'_> {
    fn read_exact(&mut self, count: usize) -> Option<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            let read = self.adapter.read(&mut buffer[filled..]);
            if read == READ_FAILED {
                return None;
            }
            filled += read;
        }
        Some(buffer)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_exact(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_u32(&mut self, value: u32) {
        self.adapter.write(&value.to_be_bytes());
    }
}

impl Drop for MockStream<'_> {
    fn drop(&mut self) {
        self.adapter.release();
        self.events.borrow_mut().push("destroy stream".to_string());
    }
}

pub struct MockHandle {
    events: Events,
    format: CodecFormat,
    observer: Option<MessageObserver>,
    grid: Option<TileGrid>,
    comment: Option<String>,
    selected: Option<Vec<u32>>,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.events.borrow_mut().push("destroy codec".to_string());
    }
}

pub struct MockImage {
    events: Events,
    spec: ImageSpec,
    planes: Vec<Vec<i32>>,
}

impl Drop for MockImage {
    fn drop(&mut self) {
        self.events.borrow_mut().push("destroy image".to_string());
    }
}

fn sample_type(spec: &ImageSpec) -> Option<SampleType> {
    let first = spec.components.first()?;
    SampleType::for_precision(first.precision, first.signed).ok()
}

fn sample_value(bytes: &[u8], sample_type: SampleType) -> i32 {
    match sample_type {
        SampleType::U8 => bytes[0] as i32,
        SampleType::I8 => bytes[0] as i8 as i32,
        SampleType::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as i32,
        SampleType::I16 => i16::from_ne_bytes([bytes[0], bytes[1]]) as i32,
        _ => i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

impl MockCodec {
    fn create(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
        kind: &str,
    ) -> Option<MockHandle> {
        if self.fails(Stage::CreateCodec) {
            return None;
        }
        self.record(format!("create {} {}", kind, format.name()));
        Some(MockHandle {
            events: self.events.clone(),
            format,
            observer: observer.cloned(),
            grid: None,
            comment: None,
            selected: None,
        })
    }
}

impl Codec for MockCodec {
    type Stream<'s> = MockStream<'s>;
    type Handle = MockHandle;
    type Image = MockImage;

    fn open_stream<'s>(
        &self,
        stream: &'s mut dyn CodecStream,
        direction: StreamDirection,
    ) -> Option<MockStream<'s>> {
        if self.fails(Stage::OpenStream) {
            return None;
        }
        self.record(format!("open stream {:?}", direction));
        Some(MockStream {
            adapter: StreamAdapter::new(stream, direction),
            events: self.events.clone(),
        })
    }

    fn create_compress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<MockHandle> {
        self.create(format, observer, "compress")
    }

    fn create_decompress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<MockHandle> {
        self.create(format, observer, "decompress")
    }

    fn create_image(&self, spec: &ImageSpec) -> Option<MockImage> {
        if self.fails(Stage::CreateImage) {
            return None;
        }
        self.record("create image");
        Some(MockImage {
            events: self.events.clone(),
            spec: spec.clone(),
            planes: Vec::new(),
        })
    }

    fn setup_encoder(
        &self,
        handle: &mut MockHandle,
        parameters: &EncodeParameters,
        image: &mut MockImage,
    ) -> bool {
        if self.fails(Stage::SetupEncoder) {
            return false;
        }
        let spec = &image.spec;
        let Ok(item_size) = spec.item_size() else {
            return false;
        };
        let (tile_width, tile_height) = if parameters.tiling {
            parameters.tile_size
        } else {
            (spec.width(), spec.height())
        };
        handle.grid = Some(
            TileGrid::new(
                spec.width() as usize,
                spec.height() as usize,
                tile_width as usize,
                tile_height as usize,
                item_size,
            )
            .with_planes(spec.components.len()),
        );
        handle.comment = parameters.comment.clone();
        report(
            handle.observer.as_ref(),
            MessageLevel::Info,
            &format!("tile size {}x{}\n", tile_width, tile_height),
        );
        true
    }

    fn start_compress(
        &self,
        handle: &mut MockHandle,
        image: &mut MockImage,
        stream: &mut MockStream<'_>,
    ) -> bool {
        if self.fails(Stage::StartCompress) {
            return false;
        }
        let Some(grid) = handle.grid else {
            return false;
        };
        let spec = &image.spec;
        let first = spec.components[0];
        stream.adapter.write(J2K_CODESTREAM_MAGIC);
        stream.write_u32(spec.width());
        stream.write_u32(spec.height());
        stream.write_u32(spec.components.len() as u32);
        stream.write_u32(first.precision);
        stream.write_u32(first.signed as u32);
        stream.write_u32(grid.tile_width as u32);
        stream.write_u32(grid.tile_height as u32);
        let comment = handle.comment.clone().unwrap_or_default();
        stream.write_u32(comment.len() as u32);
        stream.adapter.write(comment.as_bytes());
        true
    }

    fn write_tile(
        &self,
        handle: &mut MockHandle,
        tile_index: u32,
        data: &[u8],
        stream: &mut MockStream<'_>,
    ) -> bool {
        if self.fails(Stage::WriteTile(tile_index)) {
            return false;
        }
        let Some(grid) = handle.grid else {
            return false;
        };
        // Tile buffers must carry exactly the clamped tile extent.
        let Some(rect) = grid.tile_rect(tile_index as usize) else {
            return false;
        };
        if data.len() != rect.plane_size(grid.item_size) * grid.planes {
            return false;
        }
        self.record(format!("tile {} ({} bytes)", tile_index, data.len()));
        stream.write_u32(tile_index);
        stream.write_u32(data.len() as u32);
        stream.adapter.write(data);
        true
    }

    fn end_compress(&self, _handle: &mut MockHandle, stream: &mut MockStream<'_>) -> bool {
        if self.fails(Stage::EndCompress) {
            return false;
        }
        stream.adapter.write(&END_MARKER);
        true
    }

    fn setup_decoder(&self, handle: &mut MockHandle, parameters: &DecodeParameters) -> bool {
        if self.fails(Stage::SetupDecoder) {
            return false;
        }
        handle.format == parameters.format
    }

    fn read_header(
        &self,
        handle: &mut MockHandle,
        stream: &mut MockStream<'_>,
    ) -> Option<MockImage> {
        if self.fails(Stage::ReadHeader) {
            return None;
        }
        let magic = stream.read_exact(J2K_CODESTREAM_MAGIC.len())?;
        if magic != J2K_CODESTREAM_MAGIC {
            return None;
        }
        let width = stream.read_u32()?;
        let height = stream.read_u32()?;
        let count = stream.read_u32()? as usize;
        let precision = stream.read_u32()?;
        let signed = stream.read_u32()? != 0;
        let tile_width = stream.read_u32()?;
        let tile_height = stream.read_u32()?;
        let comment_length = stream.read_u32()? as i64;
        if stream.adapter.skip(comment_length) != comment_length {
            return None;
        }

        let spec = ImageSpec::uniform(
            width,
            height,
            count,
            precision,
            signed,
            jpeg2k_bridge::ColorSpace::Unspecified,
        );
        handle.grid = Some(
            TileGrid::new(
                width as usize,
                height as usize,
                tile_width as usize,
                tile_height as usize,
                spec.item_size().ok()?,
            )
            .with_planes(count),
        );
        self.record(format!("header {}x{}x{}", width, height, count));
        Some(MockImage {
            events: self.events.clone(),
            spec,
            planes: Vec::new(),
        })
    }

    fn set_decoded_components(&self, handle: &mut MockHandle, components: &[u32]) -> bool {
        if self.fails(Stage::SetDecodedComponents) {
            return false;
        }
        handle.selected = Some(components.to_vec());
        true
    }

    fn decode(
        &self,
        handle: &mut MockHandle,
        stream: &mut MockStream<'_>,
        image: &mut MockImage,
    ) -> bool {
        if self.fails(Stage::Decode) {
            return false;
        }
        let (Some(grid), Some(kind)) = (handle.grid, sample_type(&image.spec)) else {
            return false;
        };
        let size = kind.item_size();
        let mut planes = vec![vec![0i32; grid.image_width * grid.image_height]; grid.planes];

        loop {
            let Some(lead) = stream.read_exact(2) else {
                return false;
            };
            if lead == END_MARKER {
                break;
            }
            let Some(rest) = stream.read_exact(2) else {
                return false;
            };
            let index = u32::from_be_bytes([lead[0], lead[1], rest[0], rest[1]]);
            let Some(length) = stream.read_u32() else {
                return false;
            };
            let (Some(data), Some(rect)) = (
                stream.read_exact(length as usize),
                grid.tile_rect(index as usize),
            ) else {
                return false;
            };

            let mut samples = data.chunks_exact(size);
            for plane in planes.iter_mut() {
                for row in rect.y..rect.y + rect.height {
                    for col in rect.x..rect.x + rect.width {
                        let Some(bytes) = samples.next() else {
                            return false;
                        };
                        plane[row * grid.image_width + col] = sample_value(bytes, kind);
                    }
                }
            }
        }

        image.planes = match &handle.selected {
            Some(selected) => {
                let mut kept = Vec::with_capacity(selected.len());
                for &index in selected {
                    match planes.get(index as usize) {
                        Some(plane) => kept.push(plane.clone()),
                        None => return false,
                    }
                }
                kept
            }
            None => planes,
        };
        true
    }

    fn end_decompress(&self, _handle: &mut MockHandle, _stream: &mut MockStream<'_>) -> bool {
        !self.fails(Stage::EndDecompress)
    }

    fn components<'i>(&self, image: &'i MockImage) -> Vec<DecodedComponent<'i>> {
        let first = image.spec.components[0];
        image
            .planes
            .iter()
            .map(|plane| DecodedComponent {
                width: image.spec.width() as usize,
                height: image.spec.height() as usize,
                precision: first.precision,
                signed: first.signed,
                data: plane,
            })
            .collect()
    }
}

pub type Messages = Arc<Mutex<Vec<(MessageLevel, String)>>>;

/// An observer that collects codec messages.
pub fn collecting_observer() -> (MessageObserver, Messages) {
    let messages: Messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let observer: MessageObserver = Arc::new(move |level: MessageLevel, message: &str| {
        sink.lock().unwrap().push((level, message.to_string()));
    });
    (observer, messages)
}
