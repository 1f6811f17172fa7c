pub mod geometry;
pub mod range;

pub use geometry::{Point, Rect};
pub use range::{CellAddr, CellRange};
