use crate::neighborhood::{neighbor_offsets, Connectivity};
use crate::volume::{offset_index, Volume};

/// Keep only the voxels on the border of each labelled region.
///
/// A non-background voxel lies on the border when one of its in-bounds neighbours
/// carries a different value. Every other voxel is set to `background`.
pub fn label_contour<T>(volume: &Volume<T>, connectivity: Connectivity, background: T) -> Volume<T>
where
    T: Copy + PartialEq,
{
    let neighbors = neighbor_offsets(volume.dimension(), connectivity);
    let mut contour = volume.clone();
    contour.for_each_mut(|index, value| {
        if *value == background {
            return;
        }
        let label = *value;
        let on_border = neighbors.iter().any(|&offset| {
            volume
                .get(offset_index(index, offset))
                .is_some_and(|neighbor| neighbor != label)
        });
        if !on_border {
            *value = background;
        }
    });
    contour
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Dimension;

    fn square(size: usize, fill: std::ops::Range<i64>) -> Volume<u32> {
        let mut volume = Volume::from_elem([size, size, 1], Dimension::Two, 0u32);
        for y in fill.clone() {
            for x in fill.clone() {
                volume.set([x, y, 0], 1);
            }
        }
        volume
    }

    #[test]
    fn test_interior_is_cleared() {
        let volume = square(7, 1..6);
        let contour = label_contour(&volume, Connectivity::Full, 0);
        assert_eq!(contour.get([3, 3, 0]), Some(0));
        assert_eq!(contour.get([2, 2, 0]), Some(0));
        assert_eq!(contour.get([1, 1, 0]), Some(1));
        assert_eq!(contour.get([5, 3, 0]), Some(1));
        assert_eq!(contour.get([0, 0, 0]), Some(0));
    }

    #[test]
    fn test_image_edge_is_not_a_border() {
        let volume = square(3, 0..3);
        let contour = label_contour(&volume, Connectivity::Full, 0);
        assert!(contour.indexed_iter().all(|(_, v)| v == 0));
    }

    #[test]
    fn test_adjacent_labels_are_both_borders() {
        let mut volume = Volume::from_elem([4, 1, 1], Dimension::Two, 1u32);
        volume.set([2, 0, 0], 2);
        volume.set([3, 0, 0], 2);
        let contour = label_contour(&volume, Connectivity::Face, 0);
        let values = contour.indexed_iter().map(|(_, v)| v).collect::<Vec<_>>();
        assert_eq!(values, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_corner_contact_depends_on_connectivity() {
        // A 2x2 block whose only background neighbour touches one corner diagonally
        let mut volume = Volume::from_elem([3, 3, 1], Dimension::Two, 1u32);
        volume.set([2, 2, 0], 0);
        let full = label_contour(&volume, Connectivity::Full, 0);
        let face = label_contour(&volume, Connectivity::Face, 0);
        assert_eq!(full.get([1, 1, 0]), Some(1));
        assert_eq!(face.get([1, 1, 0]), Some(0));
    }
}
