//! Bresenham rasterisation of discrete lines in 2D and 3D.
//!
//! Lines are produced as offsets relative to their start. The error accumulation
//! follows the classic integer scheme: the axis with the largest extent advances on
//! every step and every other axis advances whenever its accumulated error crosses
//! the main extent.

use crate::volume::{offset_index, Dimension, Index};

/// Build `length` offsets along `direction`, starting with the zero offset.
///
/// The direction does not need to be normalised. A zero direction yields an empty line.
pub fn offsets(direction: [f64; 3], length: usize, dimension: Dimension) -> Vec<Index> {
    let axes = dimension.axes();
    let norm = direction[..axes].iter().map(|c| c * c).sum::<f64>().sqrt();
    if length == 0 || norm == 0.0 || !norm.is_finite() {
        return Vec::new();
    }

    // End point of the line, truncated towards zero
    let mut last = [0i64; 3];
    for d in 0..axes {
        last[d] = (length as f64 * direction[d] / norm) as i64;
    }

    // The dominant axis advances on every step
    let mut main_axis = 0;
    let mut max_distance = 0;
    let mut increment = [0i64; 3];
    let mut overflow = [0i64; 3];
    for d in 0..axes {
        let distance = last[d].abs();
        if distance > max_distance {
            max_distance = distance;
            main_axis = d;
        }
        increment[d] = 2 * distance;
        overflow[d] = if last[d] < 0 { -1 } else { 1 };
    }

    let mut error = [0i64; 3];
    let mut current = [0i64; 3];
    let mut result = Vec::with_capacity(length);
    result.push(current);
    for _ in 1..length {
        for d in 0..axes {
            if d == main_axis {
                current[d] += overflow[d];
            } else {
                error[d] += increment[d];
                if error[d] >= max_distance {
                    current[d] += overflow[d];
                    error[d] -= 2 * max_distance;
                }
            }
        }
        result.push(current);
    }
    result
}

/// Rasterise the line from `start` to `end`, both included.
pub fn indices(start: Index, end: Index, dimension: Dimension) -> Vec<Index> {
    let axes = dimension.axes();
    let length = (0..axes)
        .map(|d| (start[d] - end[d]).unsigned_abs() as usize + 1)
        .max()
        .unwrap_or(1);
    if start[..axes] == end[..axes] {
        return vec![start];
    }
    let mut direction = [0.0; 3];
    for d in 0..axes {
        direction[d] = (end[d] - start[d]) as f64;
    }
    offsets(direction, length, dimension)
        .into_iter()
        .map(|o| offset_index(start, o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_axis_aligned() {
        let line = offsets([1.0, 0.0, 0.0], 4, Dimension::Two);
        assert_eq!(line, vec![[0, 0, 0], [1, 0, 0], [2, 0, 0], [3, 0, 0]]);
    }

    #[test]
    fn test_negative_direction() {
        let line = offsets([0.0, -2.0, 0.0], 3, Dimension::Two);
        assert_eq!(line, vec![[0, 0, 0], [0, -1, 0], [0, -2, 0]]);
    }

    #[test]
    fn test_diagonal_3d() {
        let line = offsets([1.0, 1.0, 1.0], 3, Dimension::Three);
        assert_eq!(line, vec![[0, 0, 0], [1, 1, 1], [2, 2, 2]]);
    }

    #[test]
    fn test_zero_direction_is_empty() {
        assert!(offsets([0.0, 0.0, 0.0], 10, Dimension::Three).is_empty());
    }

    #[test]
    fn test_2d_ignores_z_component() {
        let line = offsets([1.0, 0.0, 5.0], 3, Dimension::Two);
        assert!(line.iter().all(|o| o[2] == 0));
        assert_eq!(line.last(), Some(&[2, 0, 0]));
    }

    #[rstest]
    #[case([0, 0, 0], [5, 0, 0])]
    #[case([0, 0, 0], [5, 5, 0])]
    #[case([2, 7, 0], [9, 1, 0])]
    #[case([4, 4, 0], [0, 1, 0])]
    fn test_indices_connect_endpoints(#[case] start: Index, #[case] end: Index) {
        let line = indices(start, end, Dimension::Two);
        assert_eq!(line.first(), Some(&start));
        assert_eq!(line.last(), Some(&end));
        // Consecutive voxels are 8-connected
        for pair in line.windows(2) {
            let step = (0..3).map(|d| (pair[1][d] - pair[0][d]).abs()).max().unwrap();
            assert_eq!(step, 1);
        }
    }

    #[test]
    fn test_indices_single_point() {
        assert_eq!(indices([3, 3, 3], [3, 3, 3], Dimension::Three), vec![[3, 3, 3]]);
    }
}
