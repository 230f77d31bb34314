use indicatif::{ParallelProgressIterator, ProgressBar};
use ndarray::Array3;
use rayon::prelude::*;
use std::fmt;

use crate::neighborhood::box_offsets;
use crate::pixel::Pixel;
use crate::transform::Transform;
use crate::volume::{offset_index, Dimension, Index, Volume};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ElementShape {
    /// Every offset within the radius along each axis
    Box,
    /// Ellipsoid inscribed in the box
    #[default]
    Ball,
    /// Manhattan ball
    Diamond,
}

impl fmt::Display for ElementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape_str = match self {
            ElementShape::Box => "box",
            ElementShape::Ball => "ball",
            ElementShape::Diamond => "diamond",
        };
        write!(f, "{shape_str}")
    }
}

/// A flat structuring element, stored as the offsets of its active positions
#[derive(Debug, Clone, PartialEq)]
pub struct StructuringElement {
    offsets: Vec<Index>,
}

impl StructuringElement {
    pub fn new(shape: ElementShape, radius: [usize; 3], dimension: Dimension) -> Self {
        let axes = dimension.axes();
        let offsets = box_offsets(radius, dimension)
            .into_iter()
            .filter(|offset| match shape {
                ElementShape::Box => true,
                ElementShape::Ball => {
                    let distance: f64 = (0..axes)
                        .map(|d| (offset[d] as f64 / (radius[d] as f64 + 0.5)).powi(2))
                        .sum();
                    distance <= 1.0
                }
                ElementShape::Diamond => {
                    let distance: f64 = (0..axes)
                        .filter(|&d| radius[d] > 0)
                        .map(|d| offset[d].abs() as f64 / radius[d] as f64)
                        .sum();
                    distance <= 1.0
                }
            })
            .collect();
        StructuringElement { offsets }
    }

    pub fn offsets(&self) -> &[Index] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Grayscale dilation: every voxel takes the maximum of the input under the
/// structuring element centred on it. Positions outside the image are ignored.
#[derive(Debug, Clone)]
pub struct GrayscaleDilate {
    pub element: StructuringElement,
}

impl GrayscaleDilate {
    pub fn new(element: StructuringElement) -> Self {
        GrayscaleDilate { element }
    }

    fn dilate_plane<T: Pixel>(&self, volume: &Volume<T>, z: usize) -> Vec<T> {
        let [width, height, _] = volume.size();
        let mut plane = Vec::with_capacity(width * height);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let index = [x, y, z as i64];
                let value = self
                    .element
                    .offsets()
                    .iter()
                    .filter_map(|&o| volume.get(offset_index(index, o)))
                    .fold(None, |max: Option<T>, v| match max {
                        Some(m) if m >= v => Some(m),
                        _ => Some(v),
                    });
                // An element without the centre can miss the image entirely near its border
                plane.push(value.unwrap_or_else(T::min_value));
            }
        }
        plane
    }

    fn assemble<T: Pixel>(volume: &Volume<T>, planes: &[Vec<T>]) -> Volume<T> {
        let [width, height, depth] = volume.size();
        // Each plane holds one z slice in row-major (y, x) order
        let data = Array3::from_shape_fn((depth, height, width), |(z, y, x)| planes[z][y * width + x]);
        Volume::new(data, volume.dimension()).with_geometry(volume.geometry)
    }

    /// Like `apply`, but reports progress per z plane
    pub fn apply_with_progress<T: Pixel>(&self, volume: &Volume<T>, pb: ProgressBar) -> Volume<T> {
        let [_, _, depth] = volume.size();
        let planes = (0..depth)
            .into_par_iter()
            .progress_with(pb)
            .map(|z| self.dilate_plane(volume, z))
            .collect::<Vec<_>>();
        Self::assemble(volume, &planes)
    }
}

impl<T: Pixel> Transform<Volume<T>> for GrayscaleDilate {
    fn apply(&self, volume: &Volume<T>) -> Volume<T> {
        let [_, _, depth] = volume.size();
        let planes = (0..depth)
            .into_par_iter()
            .map(|z| self.dilate_plane(volume, z))
            .collect::<Vec<_>>();
        Self::assemble(volume, &planes)
    }
}
