use itertools::iproduct;

use crate::volume::{Dimension, Index};

/// Which neighbours of a voxel count as adjacent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Neighbours sharing a face (4 in 2D, 6 in 3D)
    Face,
    /// The full 3^D neighbourhood (8 in 2D, 26 in 3D)
    #[default]
    Full,
}

/// Every offset of a box with the given per-axis radius, including the centre.
/// Axes beyond the dimension are fixed at zero. Ordered with x varying fastest.
pub fn box_offsets(radius: [usize; 3], dimension: Dimension) -> Vec<Index> {
    let mut r = [0i64; 3];
    for d in 0..dimension.axes() {
        r[d] = radius[d] as i64;
    }
    iproduct!(-r[2]..=r[2], -r[1]..=r[1], -r[0]..=r[0])
        .map(|(z, y, x)| [x, y, z])
        .collect()
}

/// Unit neighbourhood offsets, excluding the centre
pub fn neighbor_offsets(dimension: Dimension, connectivity: Connectivity) -> Vec<Index> {
    box_offsets([1; 3], dimension)
        .into_iter()
        .filter(|o| {
            let nonzero = o.iter().filter(|&&c| c != 0).count();
            match connectivity {
                Connectivity::Face => nonzero == 1,
                Connectivity::Full => nonzero > 0,
            }
        })
        .collect()
}
