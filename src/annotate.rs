//! # Skull-crossing annotation
//!
//! Marks where discrete lines cast from a target voxel cross a binary mask
//! (label [`MASK_LABEL`]).
//!
//! With a set of sample directions, a ray is cast from the target along each
//! direction and its opposite. Every voxel the ray visits is painted
//! [`LINE_LABEL`], except the first and last mask voxel of every crossing, which
//! receive a label identifying the direction: `d + 3` for the forward ray of
//! direction `d` and `d + 3 + N` for the backward ray, where `N` is the direction
//! count declared by the direction file.
//!
//! Without directions, a line is drawn from every mask voxel to the target,
//! painting background voxels with [`LINE_LABEL`]. Mask voxels on the mask
//! contour that touch a drawn line are then labelled [`CROSSING_LABEL`].
//!
//! In both modes the target itself is finally painted [`TARGET_LABEL`].

use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::contour::label_contour;
use crate::line;
use crate::neighborhood::{neighbor_offsets, Connectivity};
use crate::volume::{offset_index, Index, Volume};

pub const BACKGROUND_LABEL: u32 = 0;
pub const MASK_LABEL: u32 = 1;
pub const LINE_LABEL: u32 = 2;
pub const CROSSING_LABEL: u32 = 3;
pub const TARGET_LABEL: u32 = 4;
const FIRST_DIRECTION_LABEL: u32 = 3;

#[derive(Debug, Snafu)]
pub enum AnnotateError {
    #[snafu(display("mask contains no voxels labelled {}; a target index is required", MASK_LABEL))]
    EmptyMask,

    #[snafu(display("target index {:?} is outside of the image (size {:?})", target, size))]
    TargetOutside { target: Index, size: [usize; 3] },

    #[snafu(display("could not read direction file {}", path.display()))]
    ReadDirections {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("direction file is empty"))]
    MissingDirectionCount,

    #[snafu(display("invalid value '{}' in direction file", value))]
    InvalidDirectionValue { value: String },
}

/// Sample directions in the Camino point-set layout: a count followed by the
/// whitespace separated components of each direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Directions {
    /// Count declared in the header. Used to offset the backward labels.
    pub declared: u32,
    pub vectors: Vec<[f64; 3]>,
}

impl Directions {
    /// Parse directions with `axes` components each. A trailing incomplete
    /// direction is dropped.
    pub fn parse(input: &str, axes: usize) -> Result<Self, AnnotateError> {
        let mut tokens = input.split_whitespace();
        let declared = tokens.next().context(MissingDirectionCountSnafu)?;
        let declared = u32::from_str(declared)
            .ok()
            .context(InvalidDirectionValueSnafu { value: declared })?;

        let components = tokens
            .map(|t| {
                f64::from_str(t)
                    .ok()
                    .context(InvalidDirectionValueSnafu { value: t })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let vectors = components
            .chunks_exact(axes)
            .map(|chunk| {
                let mut direction = [0.0; 3];
                direction[..axes].copy_from_slice(chunk);
                direction
            })
            .collect::<Vec<_>>();

        if vectors.len() != declared as usize {
            tracing::warn!(
                "Direction file declares {} directions but contains {}",
                declared,
                vectors.len()
            );
        }
        Ok(Directions { declared, vectors })
    }

    pub fn open<P: AsRef<Path>>(path: P, axes: usize) -> Result<Self, AnnotateError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).context(ReadDirectionsSnafu { path })?;
        Self::parse(&input, axes)
    }
}

/// Mean index of all mask voxels, each component truncated towards zero
pub fn center_of_mass(mask: &Volume<u32>) -> Option<Index> {
    let (sum, count) = mask
        .indexed_iter()
        .filter(|&(_, v)| v == MASK_LABEL)
        .fold(([0.0f64; 3], 0usize), |(mut sum, count), (index, _)| {
            for d in 0..3 {
                sum[d] += index[d] as f64;
            }
            (sum, count + 1)
        });
    if count == 0 {
        return None;
    }
    Some(sum.map(|s| (s / count as f64) as i64))
}

/// Choose the target: the explicit index if given, otherwise the mask centre of mass.
pub fn resolve_target(mask: &Volume<u32>, explicit: Option<Index>) -> Result<Index, AnnotateError> {
    let target = match explicit {
        Some(target) => target,
        None => center_of_mass(mask).context(EmptyMaskSnafu)?,
    };
    ensure!(
        mask.is_inside(target),
        TargetOutsideSnafu {
            target,
            size: mask.size()
        }
    );
    Ok(target)
}

/// Ray length long enough to leave the image from any voxel
pub fn max_ray_length(size: [usize; 3]) -> usize {
    let squared: usize = size.iter().map(|s| s * s).sum();
    (squared as f64).sqrt() as usize
}

#[derive(Debug, Clone)]
pub struct LineAnnotator {
    pub target: Index,
    pub directions: Option<Directions>,
}

impl LineAnnotator {
    pub fn new(target: Index, directions: Option<Directions>) -> Self {
        LineAnnotator { target, directions }
    }

    /// Annotate the mask in place
    pub fn annotate(&self, mask: &mut Volume<u32>) -> Result<(), AnnotateError> {
        ensure!(
            mask.is_inside(self.target),
            TargetOutsideSnafu {
                target: self.target,
                size: mask.size()
            }
        );
        match &self.directions {
            Some(directions) => self.cast_rays(mask, directions),
            None => self.draw_toward_target(mask),
        }
        mask.set(self.target, TARGET_LABEL);
        Ok(())
    }

    fn cast_rays(&self, mask: &mut Volume<u32>, directions: &Directions) {
        let dimension = mask.dimension();
        let length = max_ray_length(mask.size());
        tracing::debug!(
            "Casting {} rays of length {} from {:?}",
            directions.vectors.len() * 2,
            length,
            self.target
        );

        for (d, direction) in directions.vectors.iter().enumerate() {
            let forward_label = FIRST_DIRECTION_LABEL + d as u32;
            let backward_label = forward_label + directions.declared;

            let offsets = line::offsets(*direction, length, dimension);
            if offsets.is_empty() {
                tracing::warn!("Skipping zero-length direction {}", d);
                continue;
            }
            let hit = trace_ray(mask, self.target, &offsets, forward_label);

            let opposite = direction.map(|c| -c);
            let offsets = line::offsets(opposite, length, dimension);
            let hit_back = trace_ray(mask, self.target, &offsets, backward_label);
            tracing::debug!("Direction {}: forward hit={}, backward hit={}", d, hit, hit_back);
        }
    }

    fn draw_toward_target(&self, mask: &mut Volume<u32>) {
        let dimension = mask.dimension();
        let sources = mask
            .indexed_iter()
            .filter(|&(_, v)| v == MASK_LABEL)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        tracing::debug!("Drawing {} lines toward {:?}", sources.len(), self.target);

        for source in sources {
            for index in line::indices(source, self.target, dimension) {
                if mask.get(index) == Some(BACKGROUND_LABEL) {
                    mask.set(index, LINE_LABEL);
                }
            }
        }

        let contour = label_contour(mask, Connectivity::Full, BACKGROUND_LABEL);
        let neighbors = neighbor_offsets(dimension, Connectivity::Full);
        let crossings = contour
            .indexed_iter()
            .filter(|&(_, v)| v == MASK_LABEL)
            .filter(|&(index, _)| {
                neighbors
                    .iter()
                    .any(|&o| contour.get(offset_index(index, o)) == Some(LINE_LABEL))
            })
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        for index in crossings {
            mask.set(index, CROSSING_LABEL);
        }
    }
}

/// Walk one ray from `target` until it leaves the image, labelling every entry into
/// and exit from the mask. Returns `false` without touching the mask when the ray
/// never meets a mask voxel.
///
/// The walk visits the target, then every offset but the last. The zero offset
/// leads the line, so the target is visited twice. Voxel values are read as they
/// are painted, so a target inside the mask is entered and then left at once.
fn trace_ray(mask: &mut Volume<u32>, target: Index, offsets: &[Index], label: u32) -> bool {
    let steps = offsets.len().saturating_sub(1);
    let ray = std::iter::once(target)
        .chain(offsets[..steps].iter().map(|&o| offset_index(target, o)))
        .take_while(|&index| mask.is_inside(index))
        .collect::<Vec<_>>();
    if !ray.iter().any(|&index| mask.get(index) == Some(MASK_LABEL)) {
        return false;
    }

    let mut inside = false;
    let mut previous: Option<Index> = None;
    for &index in &ray {
        let in_mask = mask.get(index) == Some(MASK_LABEL);
        if in_mask && !inside {
            mask.set(index, label);
            inside = true;
        } else if !in_mask && inside {
            // The exit is recorded on the last mask voxel of the crossing
            if let Some(previous) = previous {
                mask.set(previous, label);
            }
            inside = false;
        } else {
            mask.set(index, LINE_LABEL);
        }
        previous = Some(index);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Dimension;
    use rstest::rstest;

    fn ring_2d(size: usize, inner: i64, outer: i64) -> Volume<u32> {
        let mut mask = Volume::from_elem([size, size, 1], Dimension::Two, 0u32);
        let c = size as i64 / 2;
        for y in 0..size as i64 {
            for x in 0..size as i64 {
                let r = (x - c).abs().max((y - c).abs());
                if r >= inner && r <= outer {
                    mask.set([x, y, 0], MASK_LABEL);
                }
            }
        }
        mask
    }

    #[test]
    fn test_parse_directions() {
        let directions = Directions::parse("2\n1 0 0\n0.0 1.0 0.0\n", 3).unwrap();
        assert_eq!(directions.declared, 2);
        assert_eq!(directions.vectors, vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_parse_directions_drops_partial() {
        let directions = Directions::parse("2 1 0 0 1 0.5", 2).unwrap();
        assert_eq!(directions.vectors, vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn test_parse_directions_count_mismatch() {
        let directions = Directions::parse("3\n0 0\n1 0\n", 2).unwrap();
        assert_eq!(directions.declared, 3);
        assert_eq!(directions.vectors, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    }

    #[rstest]
    #[case("")]
    #[case("two 1 0")]
    #[case("1 1 zero")]
    fn test_parse_directions_invalid(#[case] input: &str) {
        assert!(Directions::parse(input, 2).is_err());
    }

    #[test]
    fn test_center_of_mass_truncates() {
        let mut mask = Volume::from_elem([5, 5, 1], Dimension::Two, 0u32);
        mask.set([1, 1, 0], 1);
        mask.set([2, 1, 0], 1);
        mask.set([4, 4, 0], 2);
        assert_eq!(center_of_mass(&mask), Some([1, 1, 0]));
    }

    #[test]
    fn test_resolve_target_errors() {
        let mask = Volume::from_elem([5, 5, 1], Dimension::Two, 0u32);
        assert!(matches!(resolve_target(&mask, None), Err(AnnotateError::EmptyMask)));
        assert!(matches!(
            resolve_target(&mask, Some([5, 0, 0])),
            Err(AnnotateError::TargetOutside { .. })
        ));
        assert_eq!(resolve_target(&mask, Some([2, 3, 0])).unwrap(), [2, 3, 0]);
    }

    #[test]
    fn test_max_ray_length() {
        assert_eq!(max_ray_length([3, 4, 1]), 5);
        assert_eq!(max_ray_length([10, 10, 10]), 17);
    }

    #[test]
    fn test_rays_label_entry_and_exit() {
        // Ring of thickness 2 between Chebyshev radius 3 and 4 around (5, 5)
        let mut mask = ring_2d(11, 3, 4);
        let directions = Directions {
            declared: 1,
            vectors: vec![[1.0, 0.0, 0.0]],
        };
        let annotator = LineAnnotator::new([5, 5, 0], Some(directions));
        annotator.annotate(&mut mask).unwrap();

        let row = (0..11).map(|x| mask.get([x, 5, 0]).unwrap()).collect::<Vec<_>>();
        // Backward ray is labelled 4, forward ray 3. The voxel after each exit is not painted
        assert_eq!(row, vec![0, 4, 4, 2, 2, TARGET_LABEL, 2, 2, 3, 3, 0]);

        // Voxels off the ray are untouched
        assert_eq!(mask.get([8, 4, 0]), Some(MASK_LABEL));
        assert_eq!(mask.get([5, 4, 0]), Some(BACKGROUND_LABEL));
    }

    #[test]
    fn test_ray_leaving_image_inside_mask() {
        // Mask reaching the image border: entry is labelled, no exit exists.
        // The last offset lands on x = 5 and is never visited
        let mut mask = Volume::from_elem([6, 1, 1], Dimension::Two, 0u32);
        mask.set([4, 0, 0], MASK_LABEL);
        mask.set([5, 0, 0], MASK_LABEL);
        let directions = Directions {
            declared: 1,
            vectors: vec![[1.0, 0.0, 0.0]],
        };
        LineAnnotator::new([0, 0, 0], Some(directions))
            .annotate(&mut mask)
            .unwrap();
        let row = mask.indexed_iter().map(|(_, v)| v).collect::<Vec<_>>();
        assert_eq!(row, vec![TARGET_LABEL, 2, 2, 2, 3, MASK_LABEL]);
    }

    #[test]
    fn test_ray_stops_before_last_offset() {
        // Length 5 reaches x = 4 only with the last offset, so no mask voxel is met
        let mut mask = Volume::from_elem([5, 1, 1], Dimension::Two, 0u32);
        mask.set([4, 0, 0], MASK_LABEL);
        let directions = Directions {
            declared: 1,
            vectors: vec![[1.0, 0.0, 0.0]],
        };
        LineAnnotator::new([0, 0, 0], Some(directions))
            .annotate(&mut mask)
            .unwrap();
        let row = mask.indexed_iter().map(|(_, v)| v).collect::<Vec<_>>();
        assert_eq!(row, vec![TARGET_LABEL, 0, 0, 0, MASK_LABEL]);
    }

    #[test]
    fn test_target_inside_mask_skips_zero_direction() {
        let mut mask = Volume::from_elem([7, 1, 1], Dimension::Two, 0u32);
        for x in 2..5 {
            mask.set([x, 0, 0], MASK_LABEL);
        }
        // Declared count disagrees with the two directions listed
        let directions = Directions {
            declared: 3,
            vectors: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        };
        LineAnnotator::new([3, 0, 0], Some(directions))
            .annotate(&mut mask)
            .unwrap();
        let row = mask.indexed_iter().map(|(_, v)| v).collect::<Vec<_>>();
        // Direction 1 labels forward crossings 4 and backward crossings 1 + 3 + 3.
        // The zero direction would have used 3 and 6
        assert_eq!(row, vec![2, 0, 7, TARGET_LABEL, 4, 0, 2]);
        assert!(!row.contains(&3));
        assert!(!row.contains(&6));
    }

    #[test]
    fn test_ray_missing_mask_is_untouched() {
        let mut mask = Volume::from_elem([6, 3, 1], Dimension::Two, 0u32);
        mask.set([5, 0, 0], MASK_LABEL);
        let directions = Directions {
            declared: 1,
            vectors: vec![[0.0, 1.0, 0.0]],
        };
        LineAnnotator::new([0, 1, 0], Some(directions))
            .annotate(&mut mask)
            .unwrap();
        let nonzero = mask
            .indexed_iter()
            .filter(|&(_, v)| v != 0)
            .collect::<Vec<_>>();
        assert_eq!(nonzero, vec![([5, 0, 0], MASK_LABEL), ([0, 1, 0], TARGET_LABEL)]);
    }

    #[test]
    fn test_draw_toward_target_marks_inner_contour() {
        let mut mask = ring_2d(11, 3, 4);
        let target = resolve_target(&mask, None).unwrap();
        assert_eq!(target, [5, 5, 0]);
        LineAnnotator::new(target, None).annotate(&mut mask).unwrap();

        assert_eq!(mask.get([5, 5, 0]), Some(TARGET_LABEL));
        // The hole inside the ring is fully painted by lines
        assert_eq!(mask.get([4, 4, 0]), Some(LINE_LABEL));
        assert_eq!(mask.get([6, 5, 0]), Some(LINE_LABEL));
        // Inner ring voxels touch the lines, outer ring voxels do not
        assert_eq!(mask.get([8, 5, 0]), Some(CROSSING_LABEL));
        assert_eq!(mask.get([9, 5, 0]), Some(MASK_LABEL));
        // Background outside the ring is never visited
        assert_eq!(mask.get([0, 0, 0]), Some(BACKGROUND_LABEL));
    }

    #[test]
    fn test_annotate_3d() {
        let mut mask = Volume::from_elem([7, 7, 7], Dimension::Three, 0u32);
        for z in 0..7 {
            mask.set([3, 3, z], if z == 0 || z == 6 { MASK_LABEL } else { 0 });
        }
        let directions = Directions {
            declared: 1,
            vectors: vec![[0.0, 0.0, 1.0]],
        };
        LineAnnotator::new([3, 3, 3], Some(directions))
            .annotate(&mut mask)
            .unwrap();
        let column = (0..7).map(|z| mask.get([3, 3, z]).unwrap()).collect::<Vec<_>>();
        assert_eq!(column, vec![4, 2, 2, TARGET_LABEL, 2, 2, 3]);
    }
}
