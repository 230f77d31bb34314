use ndarray::{Array3, ArrayView2, Axis};
use snafu::Snafu;
use std::fmt;

/// Voxel index in (x, y, z) order. The z component is zero for 2D images.
pub type Index = [i64; 3];

#[derive(Debug, Snafu)]
#[snafu(display("unsupported dimension: {} (expected 2 or 3)", dimension))]
pub struct UnsupportedDimension {
    dimension: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimension {
    #[default]
    Two,
    Three,
}

impl Dimension {
    /// Number of spatial axes
    pub fn axes(&self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

impl TryFrom<u8> for Dimension {
    type Error = UnsupportedDimension;

    fn try_from(dimension: u8) -> Result<Self, Self::Error> {
        match dimension {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            dimension => Err(UnsupportedDimension { dimension }),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.axes())
    }
}

/// Physical placement of the voxel grid, axis aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            spacing: [1.0; 3],
            origin: [0.0; 3],
        }
    }
}

impl Geometry {
    pub fn physical_point(&self, index: Index) -> [f64; 3] {
        let mut point = [0.0; 3];
        for d in 0..3 {
            point[d] = self.origin[d] + self.spacing[d] * index[d] as f64;
        }
        point
    }
}

/// A 2D or 3D raster. Voxels are stored (z, y, x); a 2D image has depth 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    data: Array3<T>,
    dimension: Dimension,
    pub geometry: Geometry,
}

impl<T: Copy> Volume<T> {
    /// Wrap a (z, y, x) array. A 2D image must have depth 1.
    pub fn new(data: Array3<T>, dimension: Dimension) -> Self {
        debug_assert!(dimension == Dimension::Three || data.len_of(Axis(0)) <= 1);
        Volume {
            data,
            dimension,
            geometry: Geometry::default(),
        }
    }

    pub fn from_elem(size: [usize; 3], dimension: Dimension, value: T) -> Self {
        let [x, y, z] = size;
        Self::new(Array3::from_elem((z, y, x), value), dimension)
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Reinterpret as a different dimension. A 2D image must have depth 1.
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        debug_assert!(dimension == Dimension::Three || self.data.len_of(Axis(0)) <= 1);
        self.dimension = dimension;
        self
    }

    /// Size in (x, y, z) order
    pub fn size(&self) -> [usize; 3] {
        let (z, y, x) = self.data.dim();
        [x, y, z]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_inside(&self, index: Index) -> bool {
        let size = self.size();
        (0..3).all(|d| index[d] >= 0 && (index[d] as u64) < size[d] as u64)
    }

    pub fn get(&self, index: Index) -> Option<T> {
        if !self.is_inside(index) {
            return None;
        }
        let [x, y, z] = index;
        Some(self.data[[z as usize, y as usize, x as usize]])
    }

    /// Set a voxel. Returns `false` and leaves the volume untouched for indices outside of it.
    pub fn set(&mut self, index: Index, value: T) -> bool {
        if !self.is_inside(index) {
            return false;
        }
        let [x, y, z] = index;
        self.data[[z as usize, y as usize, x as usize]] = value;
        true
    }

    /// Iterate voxels in raster order (x fastest)
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Index, T)> + '_ {
        self.data
            .indexed_iter()
            .map(|((z, y, x), v)| ([x as i64, y as i64, z as i64], *v))
    }

    /// Visit every voxel mutably, in raster order
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(Index, &mut T),
    {
        self.data
            .indexed_iter_mut()
            .for_each(|((z, y, x), v)| f([x as i64, y as i64, z as i64], v));
    }

    pub fn map<U: Copy, F: Fn(T) -> U>(&self, f: F) -> Volume<U> {
        Volume {
            data: self.data.mapv(f),
            dimension: self.dimension,
            geometry: self.geometry,
        }
    }

    /// A single z plane as a (y, x) view
    pub fn slice(&self, z: usize) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(0), z)
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn into_data(self) -> Array3<T> {
        self.data
    }

    /// Contiguous voxel values in raster order
    pub fn to_raw_vec(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }
}

pub fn offset_index(index: Index, offset: Index) -> Index {
    [
        index[0] + offset[0],
        index[1] + offset[1],
        index[2] + offset[2],
    ]
}
