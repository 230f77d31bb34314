use dicom::object::ReadError;
pub use snafu::{Snafu, Whatever};
use std::path::PathBuf;
use tiff::decoder::DecodingResult;
use tiff::ColorType;
use tiff::TiffError as BaseTiffError;

use crate::volume::UnsupportedDimension;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VolumeError {
    #[snafu(display("IO error on {}", path.display()))]
    IOError {
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
        path: PathBuf,
    },

    #[snafu(display("unsupported image format: {}", path.display()))]
    UnsupportedFormat { path: PathBuf },

    #[snafu(display("error reading TIFF file {}", path.display()))]
    TiffRead {
        path: PathBuf,
        #[snafu(source(from(BaseTiffError, Box::new)))]
        source: Box<BaseTiffError>,
    },

    #[snafu(display("error writing TIFF file {}", path.display()))]
    TiffWrite {
        path: PathBuf,
        #[snafu(source(from(BaseTiffError, Box::new)))]
        source: Box<BaseTiffError>,
    },

    #[snafu(display("unsupported TIFF color type: {:?}", color_type))]
    UnsupportedColorType { color_type: ColorType },

    #[snafu(display("unsupported TIFF data type: {}", data_type))]
    UnsupportedDataType { data_type: String },

    #[snafu(display("error reading image {}: {:?}", path.display(), source))]
    ImageRead {
        path: PathBuf,
        #[snafu(source(from(image::ImageError, Box::new)))]
        source: Box<image::ImageError>,
    },

    #[snafu(display("error writing image {}: {:?}", path.display(), source))]
    ImageWrite {
        path: PathBuf,
        #[snafu(source(from(image::ImageError, Box::new)))]
        source: Box<image::ImageError>,
    },

    #[snafu(display("error reading DICOM file {}: {:?}", path.display(), source))]
    DicomRead {
        path: PathBuf,
        #[snafu(source(from(ReadError, Box::new)))]
        source: Box<ReadError>,
    },

    #[snafu(display("error decoding DICOM pixel data in {}: {:?}", path.display(), source))]
    PixelData {
        path: PathBuf,
        #[snafu(source(from(dicom::pixeldata::Error, Box::new)))]
        source: Box<dicom::pixeldata::Error>,
    },

    #[snafu(display("no DICOM files found in {}", path.display()))]
    EmptySeries { path: PathBuf },

    #[snafu(display(
        "slice {} has size {:?}, expected {:?}",
        slice,
        actual,
        expected
    ))]
    InconsistentSlices {
        slice: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[snafu(display("expected a 2D image but {} has {} slices", path.display(), depth))]
    NotTwoDimensional { path: PathBuf, depth: usize },

    #[snafu(display(
        "volume of size {:?} exceeds the TIFF limits of {} pages and {} pixels per row or column",
        size,
        u16::MAX,
        u32::MAX
    ))]
    TiffTooLarge { size: [usize; 3] },

    #[snafu(display("PNG output supports 2D images only, got {} slices", depth))]
    PngDepth { depth: usize },

    #[snafu(display("voxel data does not match shape {:?}", shape))]
    Shape {
        shape: [usize; 3],
        source: ndarray::ShapeError,
    },

    #[snafu(display("{}", source))]
    Dimension { source: UnsupportedDimension },

    #[snafu(display("{}", message))]
    Other { message: String },
}

impl VolumeError {
    pub(crate) fn unsupported_data_type(result: &DecodingResult) -> Self {
        let data_type = match result {
            DecodingResult::U8(_) => "u8",
            DecodingResult::U16(_) => "u16",
            DecodingResult::U32(_) => "u32",
            DecodingResult::U64(_) => "u64",
            DecodingResult::F32(_) => "f32",
            DecodingResult::F64(_) => "f64",
            DecodingResult::I8(_) => "i8",
            DecodingResult::I16(_) => "i16",
            DecodingResult::I32(_) => "i32",
            DecodingResult::I64(_) => "i64",
        };
        VolumeError::UnsupportedDataType {
            data_type: data_type.to_string(),
        }
    }
}

impl From<Whatever> for VolumeError {
    fn from(source: Whatever) -> Self {
        Self::Other {
            message: source.to_string(),
        }
    }
}

impl From<UnsupportedDimension> for VolumeError {
    fn from(source: UnsupportedDimension) -> Self {
        Self::Dimension { source }
    }
}
