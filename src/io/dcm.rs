use dicom::dictionary_std::tags;
use dicom::object::{open_file, DefaultDicomObject};
use dicom::pixeldata::PixelDecoder;
use indicatif::ParallelProgressIterator;
use ndarray::{concatenate, Array3, Axis};
use rayon::prelude::*;
use snafu::{ensure, ResultExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::volume::*;
use crate::file::{default_bar, default_spinner, VolumeFileOperations};
use crate::pixel::AnyVolume;
use crate::volume::{Dimension, Geometry, Volume};

/// One decoded DICOM file, possibly multi-frame
#[derive(Debug)]
struct Slice {
    path: PathBuf,
    instance_number: Option<i32>,
    position: Option<[f64; 3]>,
    thickness: Option<f64>,
    pixel_spacing: Option<[f64; 2]>,
    frames: Array3<f32>,
}

fn multi_float<const N: usize>(obj: &DefaultDicomObject, tag: dicom::core::Tag) -> Option<[f64; N]> {
    let values = obj.element(tag).ok()?.to_multi_float64().ok()?;
    values.get(..N)?.try_into().ok()
}

fn read_slice(path: &Path) -> Result<Slice, VolumeError> {
    let obj = open_file(path).context(DicomReadSnafu { path })?;
    let pixel_data = obj.decode_pixel_data().context(PixelDataSnafu { path })?;
    let frames = pixel_data.number_of_frames() as usize;
    let rows = pixel_data.rows() as usize;
    let columns = pixel_data.columns() as usize;
    let samples = pixel_data.samples_per_pixel().max(1) as usize;
    if samples > 1 {
        warn!("{} has {} samples per pixel, keeping the first", path.display(), samples);
    }
    let values = pixel_data.to_vec::<f32>().context(PixelDataSnafu { path })?;
    let values = values.into_iter().step_by(samples).collect::<Vec<_>>();
    let frames = Array3::from_shape_vec((frames, rows, columns), values).context(ShapeSnafu {
        shape: [columns, rows, frames],
    })?;

    // Pixel Spacing is (row, column), i.e. (y, x)
    let pixel_spacing = multi_float::<2>(&obj, tags::PIXEL_SPACING)
        .or_else(|| multi_float::<2>(&obj, tags::IMAGER_PIXEL_SPACING))
        .map(|[row, column]| [column, row]);
    let thickness = obj
        .element(tags::SPACING_BETWEEN_SLICES)
        .or_else(|_| obj.element(tags::SLICE_THICKNESS))
        .ok()
        .and_then(|e| e.to_float64().ok())
        .filter(|t| *t > 0.0);
    let instance_number = obj
        .element(tags::INSTANCE_NUMBER)
        .ok()
        .and_then(|e| e.to_int::<i32>().ok());

    Ok(Slice {
        path: path.to_path_buf(),
        instance_number,
        position: multi_float::<3>(&obj, tags::IMAGE_POSITION_PATIENT),
        thickness,
        pixel_spacing,
        frames,
    })
}

fn geometry(first: &Slice, second: Option<&Slice>) -> Geometry {
    let mut geometry = Geometry::default();
    if let Some([x, y]) = first.pixel_spacing {
        geometry.spacing[0] = x;
        geometry.spacing[1] = y;
    }
    let distance = match (first.position, second.and_then(|s| s.position)) {
        (Some(a), Some(b)) => Some((b[2] - a[2]).abs()).filter(|d| *d > 0.0),
        _ => None,
    };
    if let Some(z) = distance.or(first.thickness) {
        geometry.spacing[2] = z;
    }
    if let Some(origin) = first.position {
        geometry.origin = origin;
    }
    geometry
}

fn into_volume(frames: Array3<f32>, geometry: Geometry) -> AnyVolume {
    let dimension = if frames.len_of(Axis(0)) > 1 {
        Dimension::Three
    } else {
        Dimension::Two
    };
    AnyVolume::from(Volume::new(frames, dimension).with_geometry(geometry))
}

/// Read a single, possibly multi-frame, DICOM file. Values are modality rescaled.
pub fn read_file(path: &Path) -> Result<AnyVolume, VolumeError> {
    let slice = read_slice(path)?;
    let geometry = geometry(&slice, None);
    debug!("Read DICOM {} with geometry {:?}", path.display(), geometry);
    Ok(into_volume(slice.frames, geometry))
}

/// Read every DICOM file below a directory and stack them by Instance Number.
pub fn read_series(dir: &Path) -> Result<AnyVolume, VolumeError> {
    let spinner = default_spinner();
    spinner.set_message(format!("Searching for DICOM files in {}", dir.display()));
    let paths = dir
        .find_dicoms()
        .context(IOSnafu { path: dir })?
        .inspect(|_| spinner.tick())
        .collect::<Vec<_>>();
    spinner.finish_and_clear();
    ensure!(!paths.is_empty(), EmptySeriesSnafu { path: dir });

    let pb = default_bar(paths.len() as u64);
    pb.set_message("Reading DICOM series");
    let mut slices = paths
        .par_iter()
        .progress_with(pb)
        .map(|path| read_slice(path))
        .collect::<Result<Vec<_>, _>>()?;
    slices.sort_by(|a, b| {
        a.instance_number
            .cmp(&b.instance_number)
            .then_with(|| a.path.cmp(&b.path))
    });

    let (_, rows, columns) = slices[0].frames.dim();
    for (i, slice) in slices.iter().enumerate() {
        let (_, r, c) = slice.frames.dim();
        ensure!(
            (r, c) == (rows, columns),
            InconsistentSlicesSnafu {
                slice: i,
                expected: (columns as u32, rows as u32),
                actual: (c as u32, r as u32),
            }
        );
    }

    let geometry = geometry(&slices[0], slices.get(1));
    let views = slices.iter().map(|s| s.frames.view()).collect::<Vec<_>>();
    let depth = views.iter().map(|v| v.len_of(Axis(0))).sum::<usize>();
    let frames = concatenate(Axis(0), &views).context(ShapeSnafu {
        shape: [columns, rows, depth],
    })?;
    debug!("Stacked {} DICOM files from {}", slices.len(), dir.display());
    // A series is a volume even when it holds a single slice
    Ok(into_volume(frames, geometry).with_dimension(Dimension::Three))
}
