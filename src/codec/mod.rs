//! Geometry encodings

pub mod polyline;
