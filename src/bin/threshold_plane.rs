use clap::Parser;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::path::PathBuf;
use tracing::{error, info, Level};

use voxel_tools::errors::VolumeError;
use voxel_tools::vector::{parse_fixed, ParseVectorError};
use voxel_tools::volume::UnsupportedDimension;
use voxel_tools::{read_volume, write_volume, AnyVolume, Dimension, PlaneThreshold, SupportedCompressor, ThresholdError};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Invalid dimension: {}", source))]
    InvalidDimension { source: UnsupportedDimension },

    #[snafu(display("Invalid plane {}: {}", name, source))]
    InvalidVector {
        name: &'static str,
        source: ParseVectorError,
    },

    #[snafu(display("Invalid plane: {}", source))]
    InvalidPlane { source: ThresholdError },

    #[snafu(display("Error reading input {}: {}", path.display(), source))]
    ReadInput {
        path: PathBuf,
        #[snafu(source(from(VolumeError, Box::new)))]
        source: Box<VolumeError>,
    },

    #[snafu(display("Error writing output {}: {}", path.display(), source))]
    WriteOutput {
        path: PathBuf,
        #[snafu(source(from(VolumeError, Box::new)))]
        source: Box<VolumeError>,
    },
}

#[derive(Parser, Debug)]
#[command(
    author = "voxel-tools developers",
    version = env!("CARGO_PKG_VERSION"),
    about = "Zero every voxel lying behind a plane given by a physical origin and normal",
    long_about = None
)]
struct Args {
    #[arg(help = "Image dimension (2 or 3)", value_parser = clap::value_parser!(u8).range(2..=3))]
    dimension: u8,

    #[arg(help = "Input image or volume")]
    input: PathBuf,

    #[arg(help = "Output image, written as 32-bit float (TIFF)")]
    output: PathBuf,

    #[arg(help = "Plane origin in physical coordinates, e.g. 10x-4.5x20", allow_hyphen_values = true)]
    origin: String,

    #[arg(help = "Plane normal, e.g. 0x0x1. Voxels on its side are kept", allow_hyphen_values = true)]
    normal: String,

    #[arg(
        help = "Compression for TIFF output",
        long = "compression",
        short = 'c',
        default_value_t = SupportedCompressor::default(),
    )]
    compression: SupportedCompressor,

    #[arg(
        help = "Enable verbose logging",
        long = "verbose",
        short = 'v',
        default_value = "false"
    )]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(level)
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    run(args).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-1);
    });
}

fn run(args: Args) -> Result<usize, Error> {
    let dimension = Dimension::try_from(args.dimension).context(InvalidDimensionSnafu)?;
    let origin = parse_fixed::<f64>(&args.origin, dimension).context(InvalidVectorSnafu { name: "origin" })?;
    let normal = parse_fixed::<f64>(&args.normal, dimension).context(InvalidVectorSnafu { name: "normal" })?;
    let threshold = PlaneThreshold::new(origin, normal, dimension).context(InvalidPlaneSnafu)?;

    let mut volume = read_volume(&args.input, Some(dimension))
        .context(ReadInputSnafu { path: &args.input })?
        .into_volume::<f32>();
    let cleared = threshold.apply_mut(&mut volume);
    info!("Cleared {} of {} voxels", cleared, volume.len());

    write_volume(&args.output, &AnyVolume::from(volume), args.compression)
        .context(WriteOutputSnafu { path: &args.output })?;
    Ok(cleared)
}
