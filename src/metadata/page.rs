use std::io::{Read, Seek, Write};
use tiff::decoder::Decoder;
use tiff::encoder::colortype::ColorType;
use tiff::encoder::compression::Compression;
use tiff::encoder::{ImageEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::TiffError;

use crate::metadata::WriteTags;
use crate::volume::Geometry;

const VERSION: &str = concat!("voxel-tools==", env!("CARGO_PKG_VERSION"));

#[derive(Debug, PartialEq)]
pub struct Version(String);

impl Version {
    const TAG: Tag = Tag::Software;
}

impl Default for Version {
    fn default() -> Self {
        Self(VERSION.to_string())
    }
}

impl WriteTags for Version {
    fn write_tags<W, C, K, D>(&self, tiff: &mut ImageEncoder<W, C, K, D>) -> Result<(), TiffError>
    where
        W: Write + Seek,
        C: ColorType,
        K: TiffKind,
        D: Compression,
    {
        tiff.encoder().write_tag(Self::TAG, self.0.as_str())?;
        Ok(())
    }
}

impl<T> TryFrom<&mut Decoder<T>> for Version
where
    T: Read + Seek,
{
    type Error = TiffError;

    fn try_from(decoder: &mut Decoder<T>) -> Result<Self, Self::Error> {
        let software = decoder.get_tag(Self::TAG)?.into_string()?;
        Ok(Version(software))
    }
}

/// Position of a z slice within the page sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageNumber {
    pub page: u16,
    pub total: u16,
}

impl PageNumber {
    // PageNumber
    const TAG: Tag = Tag::Unknown(297);

    /// Page count declared by the PageNumber tag of the current page, if present.
    /// The decoder position is left untouched.
    pub fn count<T: Read + Seek>(decoder: &mut Decoder<T>) -> Option<usize> {
        PageNumber::try_from(decoder).ok().map(|page| page.total as usize)
    }
}

impl WriteTags for PageNumber {
    fn write_tags<W, C, K, D>(&self, tiff: &mut ImageEncoder<W, C, K, D>) -> Result<(), TiffError>
    where
        W: Write + Seek,
        C: ColorType,
        K: TiffKind,
        D: Compression,
    {
        let page_info = [self.page, self.total];
        tiff.encoder().write_tag(Self::TAG, page_info.as_slice())?;
        Ok(())
    }
}

impl<T> TryFrom<&mut Decoder<T>> for PageNumber
where
    T: Read + Seek,
{
    type Error = TiffError;

    fn try_from(decoder: &mut Decoder<T>) -> Result<Self, Self::Error> {
        let page_info = decoder.get_tag(Self::TAG)?.into_u16_vec()?;
        match page_info.as_slice() {
            [page, total] => Ok(PageNumber {
                page: *page,
                total: *total,
            }),
            _ => Err(TiffError::FormatError(
                tiff::TiffFormatError::InvalidTagValueType(Self::TAG),
            )),
        }
    }
}

/// Everything written alongside the pixels of one page
#[derive(Debug, PartialEq)]
pub struct PageMetadata {
    pub geometry: Geometry,
    pub page: PageNumber,
}

impl WriteTags for PageMetadata {
    fn write_tags<W, C, K, D>(&self, tiff: &mut ImageEncoder<W, C, K, D>) -> Result<(), TiffError>
    where
        W: Write + Seek,
        C: ColorType,
        K: TiffKind,
        D: Compression,
    {
        Version::default().write_tags(tiff)?;
        self.page.write_tags(tiff)?;
        self.geometry.write_tags(tiff)?;
        Ok(())
    }
}
