use clap::Parser;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::path::PathBuf;
use tracing::{error, info, Level};

use voxel_tools::annotate::{resolve_target, AnnotateError, Directions, LineAnnotator};
use voxel_tools::errors::VolumeError;
use voxel_tools::vector::{parse_index, ParseVectorError};
use voxel_tools::volume::UnsupportedDimension;
use voxel_tools::{read_volume, write_volume, AnyVolume, Dimension, SupportedCompressor};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Invalid dimension: {}", source))]
    InvalidDimension { source: UnsupportedDimension },

    #[snafu(display("Invalid target index: {}", source))]
    InvalidTarget { source: ParseVectorError },

    #[snafu(display("Error reading mask {}: {}", path.display(), source))]
    ReadMask {
        path: PathBuf,
        #[snafu(source(from(VolumeError, Box::new)))]
        source: Box<VolumeError>,
    },

    #[snafu(display("Error reading directions {}: {}", path.display(), source))]
    ReadDirections {
        path: PathBuf,
        #[snafu(source(from(AnnotateError, Box::new)))]
        source: Box<AnnotateError>,
    },

    #[snafu(display("Error drawing lines: {}", source))]
    Annotate {
        #[snafu(source(from(AnnotateError, Box::new)))]
        source: Box<AnnotateError>,
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
    about = "Draw discrete lines from a binary mask to a target voxel and mark where they cross the mask",
    long_about = None
)]
struct Args {
    #[arg(help = "Image dimension (2 or 3)", value_parser = clap::value_parser!(u8).range(2..=3))]
    dimension: u8,

    #[arg(help = "Binary mask, with the object labelled 1")]
    mask: PathBuf,

    #[arg(help = "Output label image (TIFF or PNG)")]
    output: PathBuf,

    #[arg(
        help = "Point set file of sample directions: a count followed by the direction components",
        long = "directions",
        short = 'd'
    )]
    directions: Option<PathBuf>,

    #[arg(
        help = "Target voxel index, e.g. 64x64x20. Defaults to the mask centre of mass",
        long = "target",
        short = 't'
    )]
    target: Option<String>,

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

fn run(args: Args) -> Result<(), Error> {
    let dimension = Dimension::try_from(args.dimension).context(InvalidDimensionSnafu)?;
    let target = args
        .target
        .as_deref()
        .map(|t| parse_index(t, dimension))
        .transpose()
        .context(InvalidTargetSnafu)?;
    let directions = match &args.directions {
        Some(path) => Some(Directions::open(path, dimension.axes()).context(ReadDirectionsSnafu { path })?),
        None => None,
    };

    let mut mask = read_volume(&args.mask, Some(dimension))
        .context(ReadMaskSnafu { path: &args.mask })?
        .into_volume::<u32>();
    let target = resolve_target(&mask, target).context(AnnotateSnafu)?;
    info!("Drawing lines toward {:?}", target);

    LineAnnotator::new(target, directions)
        .annotate(&mut mask)
        .context(AnnotateSnafu)?;

    write_volume(&args.output, &AnyVolume::from(mask), args.compression)
        .context(WriteOutputSnafu { path: &args.output })?;
    Ok(())
}
