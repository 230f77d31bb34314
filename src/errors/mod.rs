pub mod series;
pub mod volume;

pub use self::series::DicomError;
pub use self::volume::VolumeError;
