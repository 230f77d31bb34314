use num::{Bounded, NumCast, ToPrimitive, Zero};
use std::fmt;

use crate::volume::{Dimension, Geometry, Volume};

/// Scalar voxel types supported by the readers and writers.
pub trait Pixel:
    Copy + PartialOrd + Zero + Bounded + NumCast + ToPrimitive + Send + Sync + fmt::Debug + 'static
{
    /// Numeric conversion that clamps to the representable range. NaN maps to zero.
    fn saturating_from<S: ToPrimitive>(value: S) -> Self {
        let value = match value.to_f64() {
            Some(v) if !v.is_nan() => v,
            _ => return Self::zero(),
        };
        let min = Self::min_value().to_f64().unwrap_or(f64::MIN);
        let max = Self::max_value().to_f64().unwrap_or(f64::MAX);
        <Self as NumCast>::from(value.clamp(min, max)).unwrap_or_else(Self::zero)
    }
}

impl Pixel for u8 {}
impl Pixel for u16 {}
impl Pixel for i16 {}
impl Pixel for u32 {}
impl Pixel for f32 {}

impl<T: Pixel> Volume<T> {
    pub fn cast<U: Pixel>(&self) -> Volume<U> {
        self.map(U::saturating_from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
    I16,
    U32,
    F32,
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::U8 => "u8",
            PixelType::U16 => "u16",
            PixelType::I16 => "i16",
            PixelType::U32 => "u32",
            PixelType::F32 => "f32",
        };
        write!(f, "{name}")
    }
}

/// A volume whose pixel type is only known at runtime, as produced by the readers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyVolume {
    U8(Volume<u8>),
    U16(Volume<u16>),
    I16(Volume<i16>),
    U32(Volume<u32>),
    F32(Volume<f32>),
}

macro_rules! dispatch {
    ($any:expr, $volume:ident => $body:expr) => {
        match $any {
            AnyVolume::U8($volume) => $body,
            AnyVolume::U16($volume) => $body,
            AnyVolume::I16($volume) => $body,
            AnyVolume::U32($volume) => $body,
            AnyVolume::F32($volume) => $body,
        }
    };
}

impl AnyVolume {
    pub fn pixel_type(&self) -> PixelType {
        match self {
            AnyVolume::U8(_) => PixelType::U8,
            AnyVolume::U16(_) => PixelType::U16,
            AnyVolume::I16(_) => PixelType::I16,
            AnyVolume::U32(_) => PixelType::U32,
            AnyVolume::F32(_) => PixelType::F32,
        }
    }

    pub fn size(&self) -> [usize; 3] {
        dispatch!(self, v => v.size())
    }

    pub fn dimension(&self) -> Dimension {
        dispatch!(self, v => v.dimension())
    }

    pub fn geometry(&self) -> Geometry {
        dispatch!(self, v => v.geometry)
    }

    pub fn with_dimension(self, dimension: Dimension) -> Self {
        dispatch!(self, v => AnyVolume::from(v.with_dimension(dimension)))
    }

    /// Convert to a concrete pixel type, saturating values that do not fit
    pub fn into_volume<T: Pixel>(self) -> Volume<T> {
        dispatch!(self, v => v.cast())
    }
}

macro_rules! impl_from_volume {
    ($pixel:ty, $variant:ident) => {
        impl From<Volume<$pixel>> for AnyVolume {
            fn from(volume: Volume<$pixel>) -> Self {
                AnyVolume::$variant(volume)
            }
        }
    };
}

impl_from_volume!(u8, U8);
impl_from_volume!(u16, U16);
impl_from_volume!(i16, I16);
impl_from_volume!(u32, U32);
impl_from_volume!(f32, F32);
