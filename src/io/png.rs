use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array3;
use snafu::{OptionExt, ResultExt};
use std::path::Path;
use tracing::warn;

use crate::errors::volume::*;
use crate::pixel::{AnyVolume, Pixel};
use crate::volume::{Dimension, Volume};

fn to_volume<T: Pixel>(width: u32, height: u32, data: Vec<T>) -> Result<Volume<T>, VolumeError> {
    let shape = [width as usize, height as usize, 1];
    let data = Array3::from_shape_vec((1, height as usize, width as usize), data)
        .context(ShapeSnafu { shape })?;
    Ok(Volume::new(data, Dimension::Two))
}

/// Read a PNG as an 8- or 16-bit grayscale 2D image. Color images are converted to luma.
pub fn read(path: &Path) -> Result<AnyVolume, VolumeError> {
    let image = image::open(path).context(ImageReadSnafu { path })?;
    let (width, height) = (image.width(), image.height());
    let volume = match image {
        DynamicImage::ImageLuma8(buffer) => AnyVolume::from(to_volume(width, height, buffer.into_raw())?),
        DynamicImage::ImageLuma16(buffer) => AnyVolume::from(to_volume(width, height, buffer.into_raw())?),
        image if image.color().bytes_per_pixel() / image.color().channel_count() == 1 => {
            warn!("Converting {:?} image {} to grayscale", image.color(), path.display());
            AnyVolume::from(to_volume(width, height, image.into_luma8().into_raw())?)
        }
        image => {
            warn!("Converting {:?} image {} to grayscale", image.color(), path.display());
            AnyVolume::from(to_volume(width, height, image.into_luma16().into_raw())?)
        }
    };
    Ok(volume)
}

fn save<T>(path: &Path, volume: &Volume<T>) -> Result<(), VolumeError>
where
    T: Pixel + image::Primitive,
    Luma<T>: image::Pixel<Subpixel = T> + image::PixelWithColorType,
    [T]: image::EncodableLayout,
{
    let [width, height, _] = volume.size();
    let buffer = ImageBuffer::<Luma<T>, Vec<T>>::from_raw(width as u32, height as u32, volume.to_raw_vec())
        .context(OtherSnafu {
            message: format!("could not build a {}x{} image buffer", width, height),
        })?;
    buffer
        .save_with_format(path, ImageFormat::Png)
        .context(ImageWriteSnafu { path })
}

/// Write a 2D image as a grayscale PNG. Types other than u8 and u16 saturate to u16.
pub fn write(path: &Path, volume: &AnyVolume) -> Result<(), VolumeError> {
    let [_, _, depth] = volume.size();
    if depth > 1 {
        return PngDepthSnafu { depth }.fail();
    }
    match volume {
        AnyVolume::U8(v) => save(path, v),
        AnyVolume::U16(v) => save(path, v),
        other => {
            warn!("Saturating {} voxels to u16 for PNG output", other.pixel_type());
            save(path, &other.clone().into_volume::<u16>())
        }
    }
}
