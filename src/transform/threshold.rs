use snafu::{ensure, Snafu};
use std::f64::consts::FRAC_PI_2;

use crate::transform::Transform;
use crate::volume::{Dimension, Volume};

#[derive(Debug, Snafu)]
pub enum ThresholdError {
    #[snafu(display("plane normal must be non-zero"))]
    ZeroNormal,
}

/// Clears non-zero voxels lying behind a plane, i.e. whose offset from the plane
/// origin makes an angle greater than pi/2 with the normal. Coordinates are physical.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneThreshold {
    origin: [f64; 3],
    normal: [f64; 3],
    axes: usize,
}

impl PlaneThreshold {
    pub fn new(origin: [f64; 3], normal: [f64; 3], dimension: Dimension) -> Result<Self, ThresholdError> {
        let axes = dimension.axes();
        ensure!(normal[..axes].iter().any(|&c| c != 0.0), ZeroNormalSnafu);
        Ok(PlaneThreshold {
            origin,
            normal,
            axes,
        })
    }

    /// Angle between the normal and the offset of `point` from the plane origin.
    /// Undefined (NaN) at the origin itself.
    pub fn angle(&self, point: [f64; 3]) -> f64 {
        let mut dot = 0.0;
        let mut vector_norm = 0.0;
        let mut normal_norm = 0.0;
        for d in 0..self.axes {
            let v = point[d] - self.origin[d];
            dot += v * self.normal[d];
            vector_norm += v * v;
            normal_norm += self.normal[d] * self.normal[d];
        }
        // Rounding can push the cosine of (anti)parallel vectors outside [-1, 1]
        (dot / (vector_norm.sqrt() * normal_norm.sqrt()))
            .clamp(-1.0, 1.0)
            .acos()
    }

    pub fn is_behind(&self, point: [f64; 3]) -> bool {
        self.angle(point) > FRAC_PI_2
    }

    /// Threshold in place, returning the number of voxels cleared
    pub fn apply_mut(&self, volume: &mut Volume<f32>) -> usize {
        let geometry = volume.geometry;
        let mut cleared = 0;
        volume.for_each_mut(|index, value| {
            if *value == 0.0 {
                return;
            }
            if self.is_behind(geometry.physical_point(index)) {
                *value = 0.0;
                cleared += 1;
            }
        });
        cleared
    }
}

impl Transform<Volume<f32>> for PlaneThreshold {
    fn apply(&self, volume: &Volume<f32>) -> Volume<f32> {
        let mut result = volume.clone();
        self.apply_mut(&mut result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Geometry;
    use rstest::rstest;

    #[rstest]
    #[case([1.0, 0.0, 0.0], false)]
    #[case([-1.0, 0.0, 0.0], true)]
    #[case([0.0, 1.0, 0.0], false)]
    #[case([-1.0, 5.0, 0.0], false)]
    #[case([-5.0, 1.0, 0.0], true)]
    fn test_is_behind(#[case] point: [f64; 3], #[case] expected: bool) {
        let plane = PlaneThreshold::new([0.0; 3], [1.0, 1.0, 0.0], Dimension::Two).unwrap();
        assert_eq!(plane.is_behind(point), expected);
    }

    #[test]
    fn test_origin_is_kept() {
        let plane = PlaneThreshold::new([2.0, 2.0, 0.0], [1.0, 0.0, 0.0], Dimension::Two).unwrap();
        assert!(plane.angle([2.0, 2.0, 0.0]).is_nan());
        assert!(!plane.is_behind([2.0, 2.0, 0.0]));
    }

    #[test]
    fn test_zero_normal_rejected() {
        assert!(PlaneThreshold::new([0.0; 3], [0.0, 0.0, 1.0], Dimension::Two).is_err());
        assert!(PlaneThreshold::new([0.0; 3], [0.0, 0.0, 1.0], Dimension::Three).is_ok());
    }

    #[test]
    fn test_apply_uses_physical_space() {
        // Four columns at x = 10, 12, 14, 16 mm; plane through x = 13 facing +x
        let volume = Volume::from_elem([4, 2, 1], Dimension::Two, 1.0f32).with_geometry(Geometry {
            spacing: [2.0, 1.0, 1.0],
            origin: [10.0, 0.0, 0.0],
        });
        let plane = PlaneThreshold::new([13.0, 0.0, 0.0], [1.0, 0.0, 0.0], Dimension::Two).unwrap();
        let mut result = volume.clone();
        let cleared = plane.apply_mut(&mut result);
        assert_eq!(cleared, 4);
        let row = (0..4).map(|x| result.get([x, 1, 0]).unwrap()).collect::<Vec<_>>();
        assert_eq!(row, vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(plane.apply(&volume), result);
    }

    #[test]
    fn test_zero_voxels_untouched_3d() {
        let mut volume = Volume::from_elem([3, 3, 3], Dimension::Three, 0.0f32);
        volume.set([0, 0, 0], 2.5);
        volume.set([2, 2, 2], 4.0);
        let plane = PlaneThreshold::new([1.0, 1.0, 1.0], [0.0, 0.0, 1.0], Dimension::Three).unwrap();
        let result = plane.apply(&volume);
        assert_eq!(result.get([0, 0, 0]), Some(0.0));
        assert_eq!(result.get([2, 2, 2]), Some(4.0));
        assert_eq!(result.indexed_iter().filter(|&(_, v)| v != 0.0).count(), 1);
    }
}
