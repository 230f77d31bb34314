use clap::Parser;
use indicatif::ProgressBar;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::path::PathBuf;
use tracing::{error, info, Level};

use voxel_tools::errors::VolumeError;
use voxel_tools::file::default_bar;
use voxel_tools::vector::{parse_radius, ParseVectorError};
use voxel_tools::volume::UnsupportedDimension;
use voxel_tools::{
    read_volume, write_volume, AnyVolume, Dimension, ElementShape, GrayscaleDilate, StructuringElement,
    SupportedCompressor,
};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Invalid dimension: {}", source))]
    InvalidDimension { source: UnsupportedDimension },

    #[snafu(display("Invalid radius: {}", source))]
    InvalidRadius { source: ParseVectorError },

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
    about = "Grayscale dilation with a flat box, ball or diamond structuring element",
    long_about = None
)]
struct Args {
    #[arg(help = "Input image or volume")]
    input: PathBuf,

    #[arg(help = "Output image (TIFF or PNG), written with the input pixel type")]
    output: PathBuf,

    #[arg(help = "Element radius, either one value or one per axis, e.g. 2 or 2x2x1")]
    radius: String,

    #[arg(
        help = "Structuring element shape",
        long = "shape",
        short = 's',
        default_value_t = ElementShape::default(),
    )]
    shape: ElementShape,

    #[arg(
        help = "Image dimension (2 or 3)",
        long = "dimension",
        short = 'd',
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(2..=3)
    )]
    dimension: u8,

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

fn dilate(filter: &GrayscaleDilate, volume: AnyVolume, pb: ProgressBar) -> AnyVolume {
    match volume {
        AnyVolume::U8(v) => filter.apply_with_progress(&v, pb).into(),
        AnyVolume::U16(v) => filter.apply_with_progress(&v, pb).into(),
        AnyVolume::I16(v) => filter.apply_with_progress(&v, pb).into(),
        AnyVolume::U32(v) => filter.apply_with_progress(&v, pb).into(),
        AnyVolume::F32(v) => filter.apply_with_progress(&v, pb).into(),
    }
}

fn run(args: Args) -> Result<(), Error> {
    let dimension = Dimension::try_from(args.dimension).context(InvalidDimensionSnafu)?;
    let radius = parse_radius(&args.radius, dimension).context(InvalidRadiusSnafu)?;

    let volume = read_volume(&args.input, Some(dimension)).context(ReadInputSnafu { path: &args.input })?;
    let element = StructuringElement::new(args.shape, radius, dimension);
    info!(
        "Dilating {} {} image with a {} element of radius {:?} ({} offsets)",
        dimension,
        volume.pixel_type(),
        args.shape,
        &radius[..dimension.axes()],
        element.len()
    );

    let [_, _, depth] = volume.size();
    let pb = default_bar(depth as u64);
    pb.set_message("Dilating");
    let result = dilate(&GrayscaleDilate::new(element), volume, pb);

    write_volume(&args.output, &result, args.compression).context(WriteOutputSnafu { path: &args.output })?;
    Ok(())
}
