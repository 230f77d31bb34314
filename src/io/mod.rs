use snafu::ensure;
use std::path::Path;
use tracing::info;

use crate::errors::volume::*;
use crate::file::{VolumeFileOperations, VolumeFormat};
use crate::pixel::AnyVolume;
use crate::volume::Dimension;

pub mod dcm;
pub mod png;
pub mod tiff;

pub use self::tiff::SupportedCompressor;

/// Read an image or volume, choosing the format from the path.
///
/// With a requested dimension, a 2D file read as 3D becomes a volume of depth 1,
/// while reading a volume with more than one slice as 2D is an error.
pub fn read_volume<P: AsRef<Path>>(path: P, dimension: Option<Dimension>) -> Result<AnyVolume, VolumeError> {
    let path = path.as_ref();
    let volume = match path.volume_format() {
        Some(VolumeFormat::Tiff) => self::tiff::read(path)?,
        Some(VolumeFormat::Png) => self::png::read(path)?,
        Some(VolumeFormat::Dicom) => self::dcm::read_file(path)?,
        Some(VolumeFormat::DicomSeries) => self::dcm::read_series(path)?,
        None => return UnsupportedFormatSnafu { path }.fail(),
    };
    info!(
        "Read {} {} image of size {:?} from {}",
        volume.dimension(),
        volume.pixel_type(),
        volume.size(),
        path.display()
    );
    match dimension {
        Some(Dimension::Two) => {
            let [_, _, depth] = volume.size();
            ensure!(depth <= 1, NotTwoDimensionalSnafu { path, depth });
            Ok(volume.with_dimension(Dimension::Two))
        }
        Some(Dimension::Three) => Ok(volume.with_dimension(Dimension::Three)),
        None => Ok(volume),
    }
}

/// Write an image or volume, choosing the format from the path. DICOM output goes
/// through the series writer instead.
pub fn write_volume<P: AsRef<Path>>(
    path: P,
    volume: &AnyVolume,
    compressor: SupportedCompressor,
) -> Result<(), VolumeError> {
    let path = path.as_ref();
    match path.volume_format() {
        Some(VolumeFormat::Tiff) => self::tiff::write(path, volume, compressor)?,
        Some(VolumeFormat::Png) => self::png::write(path, volume)?,
        _ => return UnsupportedFormatSnafu { path }.fail(),
    }
    info!(
        "Wrote {} {} image of size {:?} to {}",
        volume.dimension(),
        volume.pixel_type(),
        volume.size(),
        path.display()
    );
    Ok(())
}
