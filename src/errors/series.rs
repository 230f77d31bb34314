use dicom::object::{WithMetaError, WriteError};
pub use snafu::{Snafu, Whatever};
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DicomError {
    #[snafu(display("invalid tag assignment '{}': {}", input, reason))]
    InvalidTag { input: String, reason: &'static str },

    #[snafu(display("unable to parse value '{}' of tag {} as {}", value, tag, vr))]
    ParseValue {
        tag: String,
        vr: String,
        value: String,
    },

    #[snafu(display("error building DICOM file meta for slice {}: {:?}", slice, source))]
    BuildMeta {
        slice: usize,
        #[snafu(source(from(WithMetaError, Box::new)))]
        source: Box<WithMetaError>,
    },

    #[snafu(display("error writing DICOM file {}: {:?}", path.display(), source))]
    Write {
        path: PathBuf,
        #[snafu(source(from(WriteError, Box::new)))]
        source: Box<WriteError>,
    },

    #[snafu(display("slice size {}x{} exceeds the DICOM limit of {} rows and columns", width, height, u16::MAX))]
    ImageTooLarge { width: usize, height: usize },

    #[snafu(display("unable to create output directory {}", path.display()))]
    CreateDir {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("{}", message))]
    Other { message: String },
}

impl From<Whatever> for DicomError {
    fn from(source: Whatever) -> Self {
        Self::Other {
            message: source.to_string(),
        }
    }
}
