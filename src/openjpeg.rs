//! OpenJPEG backend.
//!
//! Every native object is owned by a Rust handle and destroyed in `Drop`.
//! Stream callbacks receive a pointer to the handle's boxed `StreamAdapter`
//! as user data; message handlers receive a pointer to the boxed observer.

use crate::codec::Codec;
use crate::params::{
    CodecFormat, ColorSpace, DecodeParameters, EncodeParameters, ImageSpec, MessageLevel,
    MessageObserver, ProgressionOrder, RateControl, report,
};
use crate::constants::{MAXIMUM_PROGRESSION_CHANGES, MAXIMUM_QUALITY_LAYERS};
use crate::planar::DecodedComponent;
use crate::stream::{CodecStream, StreamAdapter, StreamDirection};
use log::warn;
use openjpeg_sys as opj;
use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;
use std::slice;

/// Chunk size of the codec's internal stream buffer (OPJ_J2K_STREAM_CHUNK_SIZE).
const STREAM_CHUNK_SIZE: usize = 0x10_0000;

/// The OpenJPEG library as a `Codec`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenJpeg;

impl OpenJpeg {
    pub fn new() -> Self {
        Self
    }
}

pub struct OpjStream<'s> {
    raw: *mut opj::opj_stream_t,
    // Boxed so the address handed to the codec stays put.
    adapter: Box<StreamAdapter<'s>>,
}

impl Drop for OpjStream<'_> {
    fn drop(&mut self) {
        // Runs the release callback while the adapter is still alive.
        unsafe { opj::opj_stream_destroy(self.raw) };
    }
}

pub struct OpjCodec {
    raw: *mut opj::opj_codec_t,
    observer: Box<Option<MessageObserver>>,
}

impl Drop for OpjCodec {
    fn drop(&mut self) {
        unsafe { opj::opj_destroy_codec(self.raw) };
    }
}

pub struct OpjImage {
    raw: *mut opj::opj_image_t,
}

impl Drop for OpjImage {
    fn drop(&mut self) {
        unsafe { opj::opj_image_destroy(self.raw) };
    }
}

unsafe extern "C" fn read_callback(
    buffer: *mut c_void,
    count: usize,
    user_data: *mut c_void,
) -> usize {
    let adapter = unsafe { &mut *(user_data as *mut StreamAdapter<'_>) };
    let destination = unsafe { slice::from_raw_parts_mut(buffer as *mut u8, count) };
    adapter.read(destination)
}

unsafe extern "C" fn write_callback(
    buffer: *mut c_void,
    count: usize,
    user_data: *mut c_void,
) -> usize {
    let adapter = unsafe { &mut *(user_data as *mut StreamAdapter<'_>) };
    let data = unsafe { slice::from_raw_parts(buffer as *const u8, count) };
    adapter.write(data)
}

unsafe extern "C" fn skip_callback(count: i64, user_data: *mut c_void) -> i64 {
    let adapter = unsafe { &mut *(user_data as *mut StreamAdapter<'_>) };
    adapter.skip(count)
}

unsafe extern "C" fn seek_callback(offset: i64, user_data: *mut c_void) -> opj::OPJ_BOOL {
    let adapter = unsafe { &mut *(user_data as *mut StreamAdapter<'_>) };
    adapter.seek(offset) as opj::OPJ_BOOL
}

unsafe extern "C" fn release_callback(user_data: *mut c_void) {
    let adapter = unsafe { &mut *(user_data as *mut StreamAdapter<'_>) };
    adapter.release();
}

fn forward_message(level: MessageLevel, message: *const c_char, client_data: *mut c_void) {
    if message.is_null() || client_data.is_null() {
        return;
    }
    let observer = unsafe { &*(client_data as *const Option<MessageObserver>) };
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    report(observer.as_ref(), level, &message);
}

unsafe extern "C" fn info_handler(message: *const c_char, client_data: *mut c_void) {
    forward_message(MessageLevel::Info, message, client_data);
}

unsafe extern "C" fn warning_handler(message: *const c_char, client_data: *mut c_void) {
    forward_message(MessageLevel::Warning, message, client_data);
}

unsafe extern "C" fn error_handler(message: *const c_char, client_data: *mut c_void) {
    forward_message(MessageLevel::Error, message, client_data);
}

fn codec_format(format: CodecFormat) -> opj::CODEC_FORMAT {
    match format {
        CodecFormat::J2k => opj::CODEC_FORMAT::OPJ_CODEC_J2K,
        CodecFormat::Jpt => opj::CODEC_FORMAT::OPJ_CODEC_JPT,
        CodecFormat::Jp2 => opj::CODEC_FORMAT::OPJ_CODEC_JP2,
        CodecFormat::Jpp => opj::CODEC_FORMAT::OPJ_CODEC_JPP,
        CodecFormat::Jpx => opj::CODEC_FORMAT::OPJ_CODEC_JPX,
    }
}

fn color_space(color_space: ColorSpace) -> opj::COLOR_SPACE {
    match color_space {
        ColorSpace::Unspecified => opj::COLOR_SPACE::OPJ_CLRSPC_UNSPECIFIED,
        ColorSpace::Srgb => opj::COLOR_SPACE::OPJ_CLRSPC_SRGB,
        ColorSpace::Gray => opj::COLOR_SPACE::OPJ_CLRSPC_GRAY,
        ColorSpace::Sycc => opj::COLOR_SPACE::OPJ_CLRSPC_SYCC,
        ColorSpace::Eycc => opj::COLOR_SPACE::OPJ_CLRSPC_EYCC,
        ColorSpace::Cmyk => opj::COLOR_SPACE::OPJ_CLRSPC_CMYK,
    }
}

fn progression_order(order: ProgressionOrder) -> opj::PROG_ORDER {
    match order {
        ProgressionOrder::Lrcp => opj::PROG_ORDER::OPJ_LRCP,
        ProgressionOrder::Rlcp => opj::PROG_ORDER::OPJ_RLCP,
        ProgressionOrder::Rpcl => opj::PROG_ORDER::OPJ_RPCL,
        ProgressionOrder::Pcrl => opj::PROG_ORDER::OPJ_PCRL,
        ProgressionOrder::Cprl => opj::PROG_ORDER::OPJ_CPRL,
    }
}

impl OpenJpeg {
    fn create(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
        compress: bool,
    ) -> Option<OpjCodec> {
        let raw = unsafe {
            if compress {
                opj::opj_create_compress(codec_format(format))
            } else {
                opj::opj_create_decompress(codec_format(format))
            }
        };
        if raw.is_null() {
            return None;
        }
        let codec = OpjCodec {
            raw,
            observer: Box::new(observer.cloned()),
        };
        let client_data = &*codec.observer as *const Option<MessageObserver> as *mut c_void;
        unsafe {
            opj::opj_set_info_handler(codec.raw, Some(info_handler), client_data);
            opj::opj_set_warning_handler(codec.raw, Some(warning_handler), client_data);
            opj::opj_set_error_handler(codec.raw, Some(error_handler), client_data);
        }
        Some(codec)
    }
}

impl Codec for OpenJpeg {
    type Stream<'s> = OpjStream<'s>;
    type Handle = OpjCodec;
    type Image = OpjImage;

    fn open_stream<'s>(
        &self,
        stream: &'s mut dyn CodecStream,
        direction: StreamDirection,
    ) -> Option<OpjStream<'s>> {
        let is_input = direction == StreamDirection::Input;
        let raw = unsafe { opj::opj_stream_create(STREAM_CHUNK_SIZE, is_input as _) };
        if raw.is_null() {
            return None;
        }
        let mut opened = OpjStream {
            raw,
            adapter: Box::new(StreamAdapter::new(stream, direction)),
        };
        let length = opened.adapter.data_length();
        let user_data = &mut *opened.adapter as *mut StreamAdapter<'s> as *mut c_void;
        unsafe {
            opj::opj_stream_set_user_data(opened.raw, user_data, Some(release_callback));
            if is_input {
                opj::opj_stream_set_user_data_length(opened.raw, length);
                opj::opj_stream_set_read_function(opened.raw, Some(read_callback));
            } else {
                opj::opj_stream_set_write_function(opened.raw, Some(write_callback));
            }
            opj::opj_stream_set_skip_function(opened.raw, Some(skip_callback));
            opj::opj_stream_set_seek_function(opened.raw, Some(seek_callback));
        }
        Some(opened)
    }

    fn create_compress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<OpjCodec> {
        self.create(format, observer, true)
    }

    fn create_decompress(
        &self,
        format: CodecFormat,
        observer: Option<&MessageObserver>,
    ) -> Option<OpjCodec> {
        self.create(format, observer, false)
    }

    fn create_image(&self, spec: &ImageSpec) -> Option<OpjImage> {
        let mut components: Vec<opj::opj_image_cmptparm_t> = spec
            .components
            .iter()
            .map(|c| {
                let mut parameter: opj::opj_image_cmptparm_t = unsafe { std::mem::zeroed() };
                parameter.dx = c.dx as _;
                parameter.dy = c.dy as _;
                parameter.w = c.width as _;
                parameter.h = c.height as _;
                parameter.x0 = c.x0 as _;
                parameter.y0 = c.y0 as _;
                parameter.prec = c.precision as _;
                parameter.bpp = c.bit_depth as _;
                parameter.sgnd = c.signed as _;
                parameter
            })
            .collect();
        let raw = unsafe {
            opj::opj_image_tile_create(
                components.len() as _,
                components.as_mut_ptr(),
                color_space(spec.color_space),
            )
        };
        if raw.is_null() {
            return None;
        }
        unsafe {
            (*raw).x0 = spec.x0 as _;
            (*raw).y0 = spec.y0 as _;
            (*raw).x1 = spec.x1 as _;
            (*raw).y1 = spec.y1 as _;
        }
        Some(OpjImage { raw })
    }

    fn setup_encoder(
        &self,
        handle: &mut OpjCodec,
        parameters: &EncodeParameters,
        image: &mut OpjImage,
    ) -> bool {
        let mut native: opj::opj_cparameters_t = unsafe { std::mem::zeroed() };
        unsafe { opj::opj_set_default_encoder_parameters(&mut native) };

        native.tile_size_on = parameters.tiling as _;
        native.cp_tx0 = parameters.tile_origin.0 as _;
        native.cp_ty0 = parameters.tile_origin.1 as _;
        native.cp_tdx = parameters.tile_size.0 as _;
        native.cp_tdy = parameters.tile_size.1 as _;
        native.prog_order = progression_order(parameters.progression_order);
        native.numresolution = parameters.resolutions as _;
        native.cblockw_init = parameters.codeblock_size.0 as _;
        native.cblockh_init = parameters.codeblock_size.1 as _;
        native.tcp_mct = parameters.mct as _;
        native.irreversible = parameters.rate_control.irreversible() as _;

        let layers = match &parameters.rate_control {
            RateControl::Lossless => {
                native.cp_disto_alloc = 1;
                native.tcp_rates[0] = 0.0;
                1
            }
            RateControl::Rates(rates) => {
                native.cp_disto_alloc = 1;
                native.cp_fixed_quality = 0;
                for (slot, &rate) in native.tcp_rates.iter_mut().zip(rates) {
                    *slot = rate;
                }
                rates.len()
            }
            RateControl::Psnr(psnrs) => {
                native.cp_disto_alloc = 0;
                native.cp_fixed_quality = 1;
                for (slot, &psnr) in native.tcp_distoratio.iter_mut().zip(psnrs) {
                    *slot = psnr;
                }
                psnrs.len()
            }
        };
        if layers == 0 || layers > MAXIMUM_QUALITY_LAYERS {
            warn!("unsupported number of quality layers: {}", layers);
            return false;
        }
        native.tcp_numlayers = layers as _;

        if parameters.progression_changes.len() > MAXIMUM_PROGRESSION_CHANGES {
            warn!(
                "too many progression order changes: {}",
                parameters.progression_changes.len()
            );
            return false;
        }
        for (slot, change) in native.POC.iter_mut().zip(&parameters.progression_changes) {
            slot.tile = change.tile as _;
            slot.resno0 = change.resolution_start as _;
            slot.compno0 = change.component_start as _;
            slot.layno1 = change.layer_end as _;
            slot.resno1 = change.resolution_end as _;
            slot.compno1 = change.component_end as _;
            slot.prg1 = progression_order(change.order);
        }
        native.numpocs = parameters.progression_changes.len() as _;

        // The codec copies the comment during setup.
        let comment = match parameters.comment.as_deref().map(CString::new) {
            Some(Ok(comment)) => Some(comment),
            Some(Err(_)) => {
                warn!("comment contains a NUL byte");
                return false;
            }
            None => None,
        };
        native.cp_comment = comment
            .as_ref()
            .map_or(ptr::null_mut(), |c| c.as_ptr() as *mut c_char);

        unsafe { opj::opj_setup_encoder(handle.raw, &mut native, image.raw) != 0 }
    }

    fn start_compress(
        &self,
        handle: &mut OpjCodec,
        image: &mut OpjImage,
        stream: &mut OpjStream<'_>,
    ) -> bool {
        unsafe { opj::opj_start_compress(handle.raw, image.raw, stream.raw) != 0 }
    }

    fn write_tile(
        &self,
        handle: &mut OpjCodec,
        tile_index: u32,
        data: &[u8],
        stream: &mut OpjStream<'_>,
    ) -> bool {
        let Ok(size) = u32::try_from(data.len()) else {
            return false;
        };
        // The codec only reads from the tile buffer.
        unsafe {
            opj::opj_write_tile(
                handle.raw,
                tile_index,
                data.as_ptr() as *mut u8,
                size,
                stream.raw,
            ) != 0
        }
    }

    fn end_compress(&self, handle: &mut OpjCodec, stream: &mut OpjStream<'_>) -> bool {
        unsafe { opj::opj_end_compress(handle.raw, stream.raw) != 0 }
    }

    fn setup_decoder(&self, handle: &mut OpjCodec, parameters: &DecodeParameters) -> bool {
        let mut native: opj::opj_dparameters_t = unsafe { std::mem::zeroed() };
        unsafe { opj::opj_set_default_decoder_parameters(&mut native) };
        native.cp_reduce = parameters.reduce as _;
        native.cp_layer = parameters.layer as _;
        unsafe { opj::opj_setup_decoder(handle.raw, &mut native) != 0 }
    }

    fn read_header(&self, handle: &mut OpjCodec, stream: &mut OpjStream<'_>) -> Option<OpjImage> {
        let mut raw: *mut opj::opj_image_t = ptr::null_mut();
        let ok = unsafe { opj::opj_read_header(stream.raw, handle.raw, &mut raw) != 0 };
        // The header reader may allocate the image before failing.
        let image = (!raw.is_null()).then(|| OpjImage { raw });
        if ok { image } else { None }
    }

    fn set_decoded_components(&self, handle: &mut OpjCodec, components: &[u32]) -> bool {
        unsafe {
            opj::opj_set_decoded_components(
                handle.raw,
                components.len() as _,
                components.as_ptr(),
                0,
            ) != 0
        }
    }

    fn decode(
        &self,
        handle: &mut OpjCodec,
        stream: &mut OpjStream<'_>,
        image: &mut OpjImage,
    ) -> bool {
        unsafe { opj::opj_decode(handle.raw, stream.raw, image.raw) != 0 }
    }

    fn end_decompress(&self, handle: &mut OpjCodec, stream: &mut OpjStream<'_>) -> bool {
        unsafe { opj::opj_end_decompress(handle.raw, stream.raw) != 0 }
    }

    fn components<'i>(&self, image: &'i OpjImage) -> Vec<DecodedComponent<'i>> {
        let native = unsafe { &*image.raw };
        if native.comps.is_null() {
            return Vec::new();
        }
        let comps = unsafe { slice::from_raw_parts(native.comps, native.numcomps as usize) };
        comps
            .iter()
            .map(|comp| {
                let width = comp.w as usize;
                let height = comp.h as usize;
                let data: &'i [i32] = if comp.data.is_null() {
                    &[]
                } else {
                    unsafe { slice::from_raw_parts(comp.data, width * height) }
                };
                DecodedComponent {
                    width,
                    height,
                    precision: comp.prec as u32,
                    signed: comp.sgnd != 0,
                    data,
                }
            })
            .collect()
    }
}
