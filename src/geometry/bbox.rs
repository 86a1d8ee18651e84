use crate::error::{Error, Result};
use super::Coordinate;

/// Minimal axis-aligned rectangle containing a coordinate set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Computes the bounding box of a decoded polygon
    ///
    /// Fails with [`Error::EmptyGeometry`] for an empty sequence.
    pub fn from_coordinates(coords: &[Coordinate]) -> Result<Self> {
        let (first, rest) = coords.split_first().ok_or(Error::EmptyGeometry)?;

        let init = BoundingBox {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };

        Ok(rest.iter().fold(init, |bbox, c| BoundingBox {
            min_lat: bbox.min_lat.min(c.lat),
            max_lat: bbox.max_lat.max(c.lat),
            min_lon: bbox.min_lon.min(c.lon),
            max_lon: bbox.max_lon.max(c.lon),
        }))
    }

    /// Midpoint of the box
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// South-west corner
    pub fn south_west(&self) -> Coordinate {
        Coordinate::new(self.min_lat, self.min_lon)
    }

    /// North-east corner
    pub fn north_east(&self) -> Coordinate {
        Coordinate::new(self.max_lat, self.max_lon)
    }

    /// Returns true if every coordinate was identical
    pub fn is_point(&self) -> bool {
        self.min_lat == self.max_lat && self.min_lon == self.max_lon
    }
}
