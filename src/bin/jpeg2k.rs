//! jpeg2k CLI - JPEG 2000 encode, decode and inspect through OpenJPEG.

use clap::{Parser, Subcommand, ValueEnum};
use jpeg2k_bridge::{
    CodecFormat, ColorSpace, DecodeParameters, EncodeParameters, ImageSpec, MessageLevel,
    MessageObserver, OpenJpeg, PixelArray, ProgressionOrder, RateControl, SampleType,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// JPEG 2000 codec for raw sample buffers
#[derive(Parser)]
#[command(name = "jpeg2k")]
#[command(version)]
#[command(about = "Encode, decode and inspect JPEG 2000 images", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpeg2k encode -i pixels.raw -o image.j2k -w 512 -H 512
    jpeg2k encode -i rgb.raw -o image.jp2 -w 640 -H 480 -n 3 -f jp2 --rate 20
    jpeg2k decode -i image.jp2 -o pixels.raw
    jpeg2k info -i image.j2k")]
struct Cli {
    /// Print codec messages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode raw samples to a J2K codestream or JP2 file
    ///
    /// Input samples are row-major and interleaved, native-endian when wider
    /// than one byte.
    #[command(visible_alias = "e")]
    Encode {
        #[arg(short, long, help = "Path to raw sample data")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the encoded output file")]
        output: PathBuf,

        /// Image width in pixels
        #[arg(short, long)]
        width: u32,

        /// Image height in pixels
        #[arg(short = 'H', long)]
        height: u32,

        /// Number of components per pixel
        #[arg(short = 'n', long, default_value = "1")]
        components: usize,

        /// Bits per sample (1-32)
        #[arg(short, long, default_value = "8")]
        bits: u32,

        /// Samples are signed
        #[arg(long)]
        signed: bool,

        /// Container format
        #[arg(short, long, default_value = "j2k", value_enum)]
        format: Container,

        /// Tile size as WIDTHxHEIGHT
        #[arg(short, long, value_parser = parse_tile_size)]
        tile: Option<(u32, u32)>,

        /// Compression ratio per quality layer, decreasing; 0 for a final lossless layer
        #[arg(long, num_args = 1.., conflicts_with = "psnr")]
        rate: Vec<f32>,

        /// Target PSNR in dB per quality layer, increasing; 0 for a final lossless layer
        #[arg(long, num_args = 1..)]
        psnr: Vec<f32>,

        /// Packet progression order
        #[arg(short, long, default_value = "lrcp", value_enum)]
        progression: Progression,

        /// Number of resolution levels
        #[arg(short, long, default_value = "1")]
        resolutions: u32,

        /// Apply the multi-component transform to the first three components
        #[arg(long)]
        mct: bool,

        /// Comment stored in the codestream
        #[arg(long)]
        comment: Option<String>,
    },

    /// Decode a J2K or JP2 file to raw interleaved samples
    #[command(visible_alias = "d")]
    Decode {
        #[arg(short, long, help = "Path to the input image file")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the decoded samples")]
        output: PathBuf,

        /// Number of highest resolution levels to discard
        #[arg(long, default_value = "0")]
        reduce: u32,

        /// Maximum number of quality layers to decode (0 for all)
        #[arg(long, default_value = "0")]
        layer: u32,

        /// Decode only these component indices
        #[arg(long, value_delimiter = ',')]
        components: Vec<u32>,
    },

    /// Display format and image information
    #[command(visible_alias = "i")]
    Info {
        #[arg(short, long, help = "Path to the image file to inspect")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Container {
    /// Raw JPEG 2000 codestream
    J2k,
    /// JP2 file format
    Jp2,
}

#[derive(Clone, Copy, ValueEnum)]
enum Progression {
    Lrcp,
    Rlcp,
    Rpcl,
    Pcrl,
    Cprl,
}

impl From<Progression> for ProgressionOrder {
    fn from(value: Progression) -> Self {
        match value {
            Progression::Lrcp => ProgressionOrder::Lrcp,
            Progression::Rlcp => ProgressionOrder::Rlcp,
            Progression::Rpcl => ProgressionOrder::Rpcl,
            Progression::Pcrl => ProgressionOrder::Pcrl,
            Progression::Cprl => ProgressionOrder::Cprl,
        }
    }
}

fn parse_tile_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let width = width.parse().map_err(|e| format!("tile width: {e}"))?;
    let height = height.parse().map_err(|e| format!("tile height: {e}"))?;
    Ok((width, height))
}

fn main() {
    let cli = Cli::parse();
    let observer = cli.verbose.then(|| -> MessageObserver {
        Arc::new(|level: MessageLevel, message: &str| eprintln!("[{:?}] {}", level, message))
    });

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            width,
            height,
            components,
            bits,
            signed,
            format,
            tile,
            rate,
            psnr,
            progression,
            resolutions,
            mct,
            comment,
        } => {
            let rate_control = if !psnr.is_empty() {
                RateControl::Psnr(psnr)
            } else if !rate.is_empty() {
                RateControl::Rates(rate)
            } else {
                RateControl::Lossless
            };
            let mut parameters = EncodeParameters {
                rate_control,
                progression_order: progression.into(),
                resolutions,
                mct,
                comment,
                observer,
                ..EncodeParameters::default()
            };
            if let Some((tile_width, tile_height)) = tile {
                parameters = parameters.with_tiles(tile_width, tile_height);
            }
            let spec = ImageSpec::uniform(
                width,
                height,
                components,
                bits,
                signed,
                color_space(components),
            );
            encode_image(&input, &output, &spec, &parameters, format)
        }
        Commands::Decode {
            input,
            output,
            reduce,
            layer,
            components,
        } => decode_image(&input, &output, reduce, layer, components, observer),
        Commands::Info { input } => show_info(&input, observer),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn color_space(components: usize) -> ColorSpace {
    match components {
        1 => ColorSpace::Gray,
        3 | 4 => ColorSpace::Srgb,
        _ => ColorSpace::Unspecified,
    }
}

fn encode_image(
    input: &PathBuf,
    output: &PathBuf,
    spec: &ImageSpec,
    parameters: &EncodeParameters,
    container: Container,
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = fs::read(input)?;
    let component_spec = spec.components.first().ok_or("at least one component is required")?;
    let sample_type = SampleType::for_precision(component_spec.precision, component_spec.signed)?;

    let (width, height) = (spec.width() as usize, spec.height() as usize);
    let count = spec.components.len();
    let pixels = if count == 1 {
        PixelArray::from_bytes(&[height, width], sample_type, samples)?.into_bytes()
    } else {
        PixelArray::from_bytes(&[height, width, count], sample_type, samples)?
            .to_planar()?
            .into_bytes()
    };

    let format = match container {
        Container::J2k => CodecFormat::J2k,
        Container::Jp2 => CodecFormat::Jp2,
    };
    let encoded = jpeg2k_bridge::encode(&OpenJpeg::new(), &pixels, parameters, spec, format)?;
    fs::write(output, &encoded)?;
    println!(
        "✓ Encoded {}x{} image ({} components) to {:?} as {}, {} bytes",
        width,
        height,
        count,
        output,
        format.name(),
        encoded.len()
    );
    Ok(())
}

fn decode_image(
    input: &PathBuf,
    output: &PathBuf,
    reduce: u32,
    layer: u32,
    components: Vec<u32>,
    observer: Option<MessageObserver>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let mut parameters = DecodeParameters::new(CodecFormat::detect(&data)?);
    parameters.reduce = reduce;
    parameters.layer = layer;
    parameters.observer = observer;
    if !components.is_empty() {
        parameters = parameters.with_components(components);
    }

    let image = jpeg2k_bridge::decode(&OpenJpeg::new(), &data, &parameters)?;
    fs::write(output, image.as_bytes())?;
    println!(
        "✓ Decoded {:?} array of {:?} to {:?}",
        image.shape(),
        image.sample_type(),
        output
    );
    Ok(())
}

/// Fields of the SIZ marker segment that opens a J2K codestream.
struct SizMarker {
    width: u32,
    height: u32,
    origin: (u32, u32),
    tile_size: (u32, u32),
    components: Vec<(u32, bool)>,
}

fn read_siz(data: &[u8]) -> Option<SizMarker> {
    let be32 = |at: usize| -> Option<u32> {
        Some(u32::from_be_bytes(data.get(at..at + 4)?.try_into().ok()?))
    };
    // SOC (2) + SIZ marker (2) + Lsiz (2) + Rsiz (2)
    let x1 = be32(8)?;
    let y1 = be32(12)?;
    let x0 = be32(16)?;
    let y0 = be32(20)?;
    let tile_size = (be32(24)?, be32(28)?);
    let count = u16::from_be_bytes(data.get(40..42)?.try_into().ok()?) as usize;
    let components = (0..count)
        .map(|i| {
            let ssiz = *data.get(42 + i * 3)?;
            Some(((ssiz & 0x7F) as u32 + 1, ssiz & 0x80 != 0))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(SizMarker {
        width: x1.checked_sub(x0)?,
        height: y1.checked_sub(y0)?,
        origin: (x0, y0),
        tile_size,
        components,
    })
}

fn show_info(
    input: &PathBuf,
    observer: Option<MessageObserver>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let format = CodecFormat::detect(&data)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    match format {
        CodecFormat::J2k => {
            println!("Format: JPEG 2000 Codestream");
            let siz = read_siz(&data).ok_or("truncated SIZ marker segment")?;
            println!("  Dimensions: {}x{}", siz.width, siz.height);
            println!("  Origin:     {:?}", siz.origin);
            println!("  Tile size:  {}x{}", siz.tile_size.0, siz.tile_size.1);
            println!("  Components: {}", siz.components.len());
            for (index, (precision, signed)) in siz.components.iter().enumerate() {
                println!(
                    "    {}: {} bits, {}",
                    index,
                    precision,
                    if *signed { "signed" } else { "unsigned" }
                );
            }
        }
        _ => {
            println!("Format: {} Container (JPEG 2000)", format.name());
            let mut parameters = DecodeParameters::new(format);
            parameters.observer = observer;
            let image = jpeg2k_bridge::decode(&OpenJpeg::new(), &data, &parameters)?;
            let shape = image.shape();
            println!("  Dimensions: {}x{}", shape[1], shape[0]);
            println!("  Components: {}", shape.get(2).copied().unwrap_or(1));
            println!("  Samples:    {:?}", image.sample_type());
        }
    }

    Ok(())
}
