use std::io::{Read, Seek, Write};
use tiff::decoder::Decoder;
use tiff::encoder::colortype::ColorType;
use tiff::encoder::compression::Compression;
use tiff::encoder::{ImageEncoder, Rational, TiffKind};
use tiff::tags::{ResolutionUnit, Tag};
use tiff::TiffError;

use crate::metadata::WriteTags;
use crate::volume::Geometry;

const MM_PER_CM: f64 = 10.0;
const MM_PER_INCH: f64 = 25.4;
const RESOLUTION_DENOMINATOR: u32 = 1000;

/// Private tags carrying the full (x, y, z) geometry as f32 triples
pub const SPACING_TAG: u16 = 65000;
pub const ORIGIN_TAG: u16 = 65001;

impl WriteTags for Geometry {
    fn write_tags<W, C, K, D>(&self, tiff: &mut ImageEncoder<W, C, K, D>) -> Result<(), TiffError>
    where
        W: Write + Seek,
        C: ColorType,
        K: TiffKind,
        D: Compression,
    {
        let spacing = self.spacing.map(|s| s as f32);
        let origin = self.origin.map(|o| o as f32);
        tiff.encoder()
            .write_tag(Tag::Unknown(SPACING_TAG), spacing.as_slice())?;
        tiff.encoder()
            .write_tag(Tag::Unknown(ORIGIN_TAG), origin.as_slice())?;

        let [x, y, _] = self.spacing;
        if x > 0.0 && y > 0.0 {
            tiff.x_resolution(pixels_per_cm(x));
            tiff.y_resolution(pixels_per_cm(y));
            tiff.resolution_unit(ResolutionUnit::Centimeter);
        }
        Ok(())
    }
}

fn pixels_per_cm(spacing_mm: f64) -> Rational {
    Rational {
        n: (MM_PER_CM / spacing_mm * RESOLUTION_DENOMINATOR as f64).round() as u32,
        d: RESOLUTION_DENOMINATOR,
    }
}

fn read_triple<T: Read + Seek>(decoder: &mut Decoder<T>, tag: u16) -> Option<[f64; 3]> {
    let values = decoder.get_tag_f32_vec(Tag::Unknown(tag)).ok()?;
    match values.as_slice() {
        [x, y, z] => Some([*x as f64, *y as f64, *z as f64]),
        _ => None,
    }
}

fn read_resolution<T: Read + Seek>(decoder: &mut Decoder<T>, tag: Tag, unit_mm: f64) -> Option<f64> {
    let rational = decoder.get_tag_u32_vec(tag).ok()?;
    match rational.as_slice() {
        [n, d] if *n > 0 && *d > 0 => Some(unit_mm * *d as f64 / *n as f64),
        _ => None,
    }
}

impl<T> TryFrom<&mut Decoder<T>> for Geometry
where
    T: Read + Seek,
{
    type Error = TiffError;

    /// Read the geometry of the current page. Missing tags fall back to the
    /// resolution tags, then to unit spacing at the origin.
    fn try_from(decoder: &mut Decoder<T>) -> Result<Self, Self::Error> {
        let mut geometry = Geometry::default();
        if let Some(spacing) = read_triple(decoder, SPACING_TAG) {
            geometry.spacing = spacing;
        } else {
            let unit_mm = match decoder.get_tag_u32(Tag::ResolutionUnit).ok() {
                Some(3) => MM_PER_CM,
                Some(2) => MM_PER_INCH,
                _ => return Ok(geometry),
            };
            if let Some(x) = read_resolution(decoder, Tag::XResolution, unit_mm) {
                geometry.spacing[0] = x;
            }
            if let Some(y) = read_resolution(decoder, Tag::YResolution, unit_mm) {
                geometry.spacing[1] = y;
            }
        }
        if let Some(origin) = read_triple(decoder, ORIGIN_TAG) {
            geometry.origin = origin;
        }
        Ok(geometry)
    }
}
