pub mod dilate;
pub mod threshold;

pub use dilate::*;
pub use threshold::*;

pub trait Transform<T> {
    fn apply(&self, target: &T) -> T;
}
