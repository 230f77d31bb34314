use clap::Parser;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, Level};

use voxel_tools::errors::{DicomError, VolumeError};
use voxel_tools::file::default_bar;
use voxel_tools::series::{SeriesWriter, TagAssignment};
use voxel_tools::{read_volume, Dimension};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Error reading volume {}: {}", path.display(), source))]
    ReadVolume {
        path: PathBuf,
        #[snafu(source(from(VolumeError, Box::new)))]
        source: Box<VolumeError>,
    },

    #[snafu(display("Error printing tag assignments: {}", source))]
    PrintTags {
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("Error writing DICOM series to {}: {}", path.display(), source))]
    WriteSeries {
        path: PathBuf,
        #[snafu(source(from(DicomError, Box::new)))]
        source: Box<DicomError>,
    },
}

#[derive(Parser, Debug)]
#[command(author = "voxel-tools developers", version = env!("CARGO_PKG_VERSION"), about = "Export a volume as a DICOM series, one file per slice", long_about = None)]
struct Args {
    #[arg(help = "Input volume (TIFF, PNG, DICOM file or DICOM directory)")]
    input: PathBuf,

    #[arg(help = "Output directory, created if missing")]
    output: PathBuf,

    #[arg(help = "File name prefix, followed by a four digit slice index")]
    prefix: String,

    #[arg(
        help = "Tag assignment as GGGG|EEEE,value, e.g. '0010|0010,Doe^John'. May be repeated",
        long = "tag",
        short = 't',
        value_parser = clap::builder::ValueParser::new(|s: &str| {
            s.parse::<TagAssignment>().map_err(|e| e.to_string())
        })
    )]
    tags: Vec<TagAssignment>,

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

/// One `GGGG|EEEE,value` line per assignment, in the order they are applied
fn print_tags<W: Write>(out: &mut W, tags: &[TagAssignment]) -> std::io::Result<()> {
    writeln!(out, "Adding the following tag,value pairs:")?;
    for assignment in tags {
        writeln!(out, "{}", assignment)?;
    }
    Ok(())
}

fn run(args: Args) -> Result<Vec<PathBuf>, Error> {
    let volume = read_volume(&args.input, Some(Dimension::Three))
        .context(ReadVolumeSnafu { path: &args.input })?
        .into_volume::<i16>();
    info!("Adding {} tag assignments", args.tags.len());
    if !args.tags.is_empty() {
        print_tags(&mut std::io::stdout().lock(), &args.tags).context(PrintTagsSnafu)?;
    }

    let [_, _, depth] = volume.size();
    let pb = default_bar(depth as u64);
    pb.set_message("Writing DICOM slices");
    let paths = SeriesWriter::new(&args.output, &args.prefix)
        .with_tags(args.tags)
        .write(&volume, pb)
        .context(WriteSeriesSnafu { path: &args.output })?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::dictionary_std::tags;
    use dicom::object::open_file;
    use tempfile::tempdir;
    use voxel_tools::{write_volume, AnyVolume, SupportedCompressor, Volume};

    fn args(input: PathBuf, output: PathBuf, tags: Vec<&str>) -> Args {
        Args {
            input,
            output,
            prefix: "img".to_string(),
            tags: tags.into_iter().map(|t| t.parse().unwrap()).collect(),
            verbose: false,
        }
    }

    #[test]
    fn test_run_saturates_to_i16() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("volume.tiff");
        let mut volume = Volume::from_elem([4, 3, 3], Dimension::Three, 100u16);
        volume.set([0, 0, 2], 40000);
        write_volume(&input, &AnyVolume::from(volume), SupportedCompressor::default()).unwrap();

        let output = dir.path().join("dicom");
        let paths = run(args(input, output.clone(), vec!["0010|0020,ID42"])).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2], output.join("img0002.dcm"));

        let obj = open_file(&paths[2]).unwrap();
        assert_eq!(obj.element(tags::PATIENT_ID).unwrap().to_str().unwrap().trim(), "ID42");
        let pixels = obj.element(tags::PIXEL_DATA).unwrap().to_bytes().unwrap();
        assert_eq!(&pixels[..2], &i16::MAX.to_le_bytes());
    }

    #[test]
    fn test_run_2d_input_is_one_slice() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("image.png");
        let volume = Volume::from_elem([5, 5, 1], Dimension::Two, 7u8);
        write_volume(&input, &AnyVolume::from(volume), SupportedCompressor::default()).unwrap();

        let paths = run(args(input, dir.path().to_path_buf(), vec![])).unwrap();
        assert_eq!(paths, vec![dir.path().join("img0000.dcm")]);
    }

    #[test]
    fn test_run_missing_input() {
        let dir = tempdir().unwrap();
        let result = run(args(dir.path().join("missing.tif"), dir.path().join("out"), vec![]));
        assert!(matches!(result, Err(Error::ReadVolume { .. })));
    }

    #[test]
    fn test_print_tags() {
        let tags = ["0008|0060,MR", "0010|0010,Doe^John"]
            .iter()
            .map(|t| t.parse::<TagAssignment>().unwrap())
            .collect::<Vec<_>>();
        let mut out = Vec::new();
        print_tags(&mut out, &tags).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Adding the following tag,value pairs:\n0008|0060,MR\n0010|0010,Doe^John\n"
        );
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "image-to-dicom",
            "in.tif",
            "out",
            "slice",
            "-t",
            "0008|0060,MR",
            "--tag",
            "0010|0010,A,B",
        ])
        .unwrap();
        assert_eq!(args.tags.len(), 2);
        assert_eq!(args.tags[1].value, "A,B");
        assert!(Args::try_parse_from(["image-to-dicom", "in.tif", "out", "slice", "-t", "0010|0010"]).is_err());
    }
}
