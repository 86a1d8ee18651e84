//! Geographic primitives used to frame polygon maps

pub mod coordinate;
pub mod bbox;

pub use coordinate::Coordinate;
pub use bbox::BoundingBox;
