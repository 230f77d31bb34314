pub mod annotate;
pub mod contour;
pub mod errors;
pub mod file;
pub mod io;
pub mod line;
pub mod metadata;
pub mod neighborhood;
pub mod pixel;
pub mod series;
pub mod transform;
pub mod vector;
pub mod volume;

pub use io::{read_volume, write_volume, SupportedCompressor};
pub use pixel::{AnyVolume, Pixel, PixelType};
pub use transform::*;
pub use volume::{Dimension, Geometry, Index, Volume};
