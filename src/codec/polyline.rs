//! Encoded polyline codec
//!
//! Each coordinate is stored as the delta from the previous one, scaled by
//! `10^precision`, zig-zag folded and split into 5-bit chunks. A chunk is
//! emitted as `chunk + 63`, with `0x20` set on every chunk but the last.

use crate::error::{Error, Result};
use crate::geometry::Coordinate;

/// Precision used by the spreadsheet polygons
pub const DEFAULT_PRECISION: u32 = 5;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const OFFSET: u8 = 63;
const MAX_CHAR: u8 = OFFSET + 0x3f;

/// Decodes an encoded polyline into `(lat, lon)` coordinates
///
/// Fails on characters outside the polyline alphabet, truncated values,
/// a latitude without a matching longitude, and positions outside the
/// WGS84 range. An empty string decodes to an empty sequence.
pub fn decode(encoded: &str, precision: u32) -> Result<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let factor = 10f64.powi(precision as i32);

    let mut coords = Vec::new();
    let mut pos = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while pos < bytes.len() {
        lat += next_value(bytes, &mut pos)?;

        if pos >= bytes.len() {
            return Err(Error::Polyline(format!(
                "latitude at coordinate {} has no longitude",
                coords.len()
            )));
        }
        lon += next_value(bytes, &mut pos)?;

        let coord = Coordinate::new(lat as f64 / factor, lon as f64 / factor);
        if !coord.is_valid() {
            return Err(Error::Polyline(format!(
                "coordinate {} out of range: ({}, {})",
                coords.len(),
                coord.lat,
                coord.lon
            )));
        }
        coords.push(coord);
    }

    Ok(coords)
}

/// Encodes coordinates as a polyline string
pub fn encode(coords: &[Coordinate], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut output = String::with_capacity(coords.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for coord in coords {
        let lat = (coord.lat * factor).round() as i64;
        let lon = (coord.lon * factor).round() as i64;
        encode_value(lat - prev_lat, &mut output);
        encode_value(lon - prev_lon, &mut output);
        prev_lat = lat;
        prev_lon = lon;
    }

    output
}

fn next_value(bytes: &[u8], pos: &mut usize) -> Result<i64> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let byte = *bytes.get(*pos).ok_or_else(|| {
            Error::Polyline(format!("truncated value at offset {}", *pos))
        })?;

        if !(OFFSET..=MAX_CHAR).contains(&byte) {
            return Err(Error::Polyline(format!(
                "invalid character {:?} at offset {}",
                byte as char, *pos
            )));
        }

        if shift > 60 {
            return Err(Error::Polyline(format!("value overflow at offset {}", *pos)));
        }

        let chunk = (byte - OFFSET) as i64;
        *pos += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

fn encode_value(value: i64, output: &mut String) {
    let mut folded = if value < 0 { !(value << 1) } else { value << 1 };

    while folded >= CONTINUATION {
        output.push(((CONTINUATION | (folded & CHUNK_MASK)) as u8 + OFFSET) as char);
        folded >>= CHUNK_BITS;
    }
    output.push((folded as u8 + OFFSET) as char);
}
