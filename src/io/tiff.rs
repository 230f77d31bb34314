use ndarray::Array3;
use snafu::{ensure, ResultExt};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray16, Gray32, Gray32Float, Gray8, GrayI16};
use tiff::encoder::compression::{Compression, Compressor, Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::ColorType as TiffColorType;
use tracing::debug;

use crate::errors::volume::*;
use crate::metadata::{PageMetadata, PageNumber, WriteTags};
use crate::pixel::{AnyVolume, Pixel, PixelType};
use crate::volume::{Dimension, Geometry, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum SupportedCompressor {
    #[default]
    Packbits,
    Lzw,
    Deflate,
    #[value(name = "none")]
    Uncompressed,
}

impl From<SupportedCompressor> for Compressor {
    fn from(value: SupportedCompressor) -> Self {
        match value {
            SupportedCompressor::Packbits => Compressor::Packbits(Packbits),
            SupportedCompressor::Lzw => Compressor::Lzw(Lzw),
            SupportedCompressor::Deflate => Compressor::Deflate(Deflate::default()),
            SupportedCompressor::Uncompressed => Compressor::Uncompressed(Uncompressed),
        }
    }
}

impl fmt::Display for SupportedCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compressor_str = match self {
            SupportedCompressor::Packbits => "packbits",
            SupportedCompressor::Lzw => "lzw",
            SupportedCompressor::Deflate => "deflate",
            SupportedCompressor::Uncompressed => "none",
        };
        write!(f, "{}", compressor_str)
    }
}

/// Read a multi-page grayscale TIFF, one page per z slice.
pub fn read(path: &Path) -> Result<AnyVolume, VolumeError> {
    let file = File::open(path).context(IOSnafu { path })?;
    let mut decoder = Decoder::new(BufReader::new(file)).context(TiffReadSnafu { path })?;
    let geometry = Geometry::try_from(&mut decoder).context(TiffReadSnafu { path })?;
    let expected = decoder.dimensions().context(TiffReadSnafu { path })?;

    let mut pages = Vec::with_capacity(PageNumber::count(&mut decoder).unwrap_or(1));
    loop {
        match decoder.colortype().context(TiffReadSnafu { path })? {
            TiffColorType::Gray(_) => {}
            color_type => return UnsupportedColorTypeSnafu { color_type }.fail(),
        }
        let actual = decoder.dimensions().context(TiffReadSnafu { path })?;
        ensure!(
            actual == expected,
            InconsistentSlicesSnafu {
                slice: pages.len(),
                expected,
                actual,
            }
        );
        pages.push(decoder.read_image().context(TiffReadSnafu { path })?);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().context(TiffReadSnafu { path })?;
    }

    let (width, height) = expected;
    let shape = [width as usize, height as usize, pages.len()];
    debug!("Read TIFF {} with size {:?}", path.display(), shape);

    macro_rules! stack {
        ($variant:ident, $pixel:ty) => {{
            let mut data: Vec<$pixel> = Vec::with_capacity(shape.iter().product());
            for page in pages {
                match page {
                    DecodingResult::$variant(values) => data.extend(values),
                    other => return Err(VolumeError::unsupported_data_type(&other)),
                }
            }
            AnyVolume::from(assemble(data, shape, geometry)?)
        }};
    }

    let pixel_type = match pages.first() {
        Some(DecodingResult::U8(_)) => PixelType::U8,
        Some(DecodingResult::U16(_)) => PixelType::U16,
        Some(DecodingResult::I16(_)) => PixelType::I16,
        Some(DecodingResult::U32(_)) => PixelType::U32,
        Some(DecodingResult::F32(_)) => PixelType::F32,
        Some(other) => return Err(VolumeError::unsupported_data_type(other)),
        None => {
            return OtherSnafu {
                message: format!("TIFF file {} has no pages", path.display()),
            }
            .fail()
        }
    };
    let volume = match pixel_type {
        PixelType::U8 => stack!(U8, u8),
        PixelType::U16 => stack!(U16, u16),
        PixelType::I16 => stack!(I16, i16),
        PixelType::U32 => stack!(U32, u32),
        PixelType::F32 => stack!(F32, f32),
    };
    Ok(volume)
}

fn assemble<T: Pixel>(data: Vec<T>, shape: [usize; 3], geometry: Geometry) -> Result<Volume<T>, VolumeError> {
    let [width, height, depth] = shape;
    let data = Array3::from_shape_vec((depth, height, width), data).context(ShapeSnafu { shape })?;
    let dimension = if depth > 1 {
        Dimension::Three
    } else {
        Dimension::Two
    };
    Ok(Volume::new(data, dimension).with_geometry(geometry))
}

fn write_pages<C, D>(
    encoder: &mut TiffEncoder<File>,
    volume: &Volume<C::Inner>,
    compression: D,
) -> Result<(), tiff::TiffError>
where
    C: ColorType,
    C::Inner: Pixel,
    [C::Inner]: TiffValue,
    D: Compression + Clone,
{
    let [width, height, depth] = volume.size();
    for z in 0..depth {
        let mut image = encoder.new_image_with_compression::<C, D>(
            width as u32,
            height as u32,
            compression.clone(),
        )?;
        let metadata = PageMetadata {
            geometry: volume.geometry,
            page: PageNumber {
                page: z as u16,
                total: depth as u16,
            },
        };
        metadata.write_tags(&mut image)?;
        let plane = volume.slice(z).iter().copied().collect::<Vec<_>>();
        image.write_data(&plane)?;
    }
    Ok(())
}

/// Implement the writer for every supported compression of a color type
macro_rules! impl_write_volume {
    ($fn_name:ident, $color_type:ty) => {
        fn $fn_name(
            encoder: &mut TiffEncoder<File>,
            volume: &Volume<<$color_type as ColorType>::Inner>,
            compressor: Compressor,
        ) -> Result<(), tiff::TiffError> {
            match compressor {
                Compressor::Uncompressed(c) => write_pages::<$color_type, _>(encoder, volume, c),
                Compressor::Packbits(c) => write_pages::<$color_type, _>(encoder, volume, c),
                Compressor::Lzw(c) => write_pages::<$color_type, _>(encoder, volume, c),
                Compressor::Deflate(c) => write_pages::<$color_type, _>(encoder, volume, c),
            }
        }
    };
}

impl_write_volume!(write_gray8, Gray8);
impl_write_volume!(write_gray16, Gray16);
impl_write_volume!(write_gray_i16, GrayI16);
impl_write_volume!(write_gray32, Gray32);
impl_write_volume!(write_gray32_float, Gray32Float);

/// Write a volume as a multi-page TIFF carrying its geometry in every page.
pub fn write(path: &Path, volume: &AnyVolume, compressor: SupportedCompressor) -> Result<(), VolumeError> {
    let size = volume.size();
    let [width, height, depth] = size;
    // Page numbers are 16 bit, row and column counts 32 bit
    ensure!(
        depth <= u16::MAX as usize && width <= u32::MAX as usize && height <= u32::MAX as usize,
        TiffTooLargeSnafu { size }
    );
    let file = File::create(path).context(IOSnafu { path })?;
    let mut encoder = TiffEncoder::new(file).context(TiffWriteSnafu { path })?;
    let compressor = Compressor::from(compressor);
    match volume {
        AnyVolume::U8(v) => write_gray8(&mut encoder, v, compressor),
        AnyVolume::U16(v) => write_gray16(&mut encoder, v, compressor),
        AnyVolume::I16(v) => write_gray_i16(&mut encoder, v, compressor),
        AnyVolume::U32(v) => write_gray32(&mut encoder, v, compressor),
        AnyVolume::F32(v) => write_gray32_float(&mut encoder, v, compressor),
    }
    .context(TiffWriteSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    fn ramp<T: Pixel>(size: [usize; 3], dimension: Dimension) -> Volume<T> {
        let mut volume = Volume::from_elem(size, dimension, T::zero());
        let mut next = 0u32;
        volume.for_each_mut(|_, v| {
            *v = T::saturating_from(next);
            next += 1;
        });
        volume.with_geometry(Geometry {
            spacing: [0.5, 0.75, 2.0],
            origin: [-4.0, 8.0, 16.0],
        })
    }

    #[rstest]
    #[case::u8(AnyVolume::from(ramp::<u8>([4, 3, 1], Dimension::Two)), SupportedCompressor::Uncompressed)]
    #[case::u16(AnyVolume::from(ramp::<u16>([4, 3, 5], Dimension::Three)), SupportedCompressor::Packbits)]
    #[case::i16(AnyVolume::from(ramp::<i16>([3, 3, 2], Dimension::Three)), SupportedCompressor::Lzw)]
    #[case::u32(AnyVolume::from(ramp::<u32>([2, 5, 1], Dimension::Two)), SupportedCompressor::Deflate)]
    #[case::f32(AnyVolume::from(ramp::<f32>([3, 2, 3], Dimension::Three)), SupportedCompressor::Packbits)]
    fn test_write_then_read(#[case] volume: AnyVolume, #[case] compressor: SupportedCompressor) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("volume.tiff");
        write(&path, &volume, compressor).unwrap();
        let actual = read(&path).unwrap();
        assert_eq!(actual, volume);
    }

    #[test]
    fn test_read_untagged_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("untagged.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        for value in 1u8..=3 {
            encoder.write_image::<Gray8>(2, 2, &[value; 4]).unwrap();
        }
        let actual = read(&path).unwrap();
        assert_eq!(actual.size(), [2, 2, 3]);
        assert_eq!(actual.dimension(), Dimension::Three);
        let actual = actual.into_volume::<u8>();
        assert_eq!(actual.to_raw_vec(), vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn test_read_rejects_rgb() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgb.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        encoder
            .write_image::<tiff::encoder::colortype::RGB8>(1, 1, &[1, 2, 3])
            .unwrap();
        assert!(matches!(
            read(&path),
            Err(VolumeError::UnsupportedColorType { .. })
        ));
    }

    #[test]
    fn test_read_rejects_mismatched_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        encoder.write_image::<Gray8>(2, 2, &[0; 4]).unwrap();
        encoder.write_image::<Gray8>(3, 1, &[0; 3]).unwrap();
        assert!(matches!(
            read(&path),
            Err(VolumeError::InconsistentSlices { slice: 1, .. })
        ));
    }

    #[test]
    fn test_write_too_many_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep.tiff");
        let volume = Volume::from_elem([1, 1, u16::MAX as usize + 1], Dimension::Three, 0u8);
        let result = write(&path, &AnyVolume::from(volume), SupportedCompressor::default());
        assert!(matches!(result, Err(VolumeError::TiffTooLarge { size: [1, 1, 65536] })));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read(Path::new("does-not-exist.tif")),
            Err(VolumeError::IOError { .. })
        ));
    }
}
