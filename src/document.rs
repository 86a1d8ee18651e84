//! Self-contained Leaflet map documents
//!
//! A document frames the polygon's bounding box, overlays the polygon and
//! places the sublocation label at the box center. The label is inserted as
//! markup without sanitization.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::geometry::{BoundingBox, Coordinate};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
const INITIAL_ZOOM: f64 = 13.4;

/// Stroke and fill applied to the polygon overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonStyle {
    pub color: String,
    pub weight: u32,
    pub fill: bool,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            weight: 12,
            fill: true,
            fill_color: "#3AFFE6".to_string(),
            fill_opacity: 0.3,
        }
    }
}

/// Layout of the map view and center label
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    /// Padding around the fitted bounds, in pixels
    pub padding: u32,
    /// Label font size, in pixels
    pub label_font_px: u32,
    /// Label box (width, height), anchored at its middle
    pub label_size: (u32, u32),
    pub polygon: PolygonStyle,
}

impl Default for MapLayout {
    fn default() -> Self {
        Self {
            padding: 50,
            label_font_px: 55,
            label_size: (300, 50),
            polygon: PolygonStyle::default(),
        }
    }
}

/// A rendered, immutable HTML map document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    html: String,
}

impl MapDocument {
    /// Builds the document for a polygon, its bounding box and a label
    pub fn build(
        polygon: &[Coordinate],
        bbox: &BoundingBox,
        label: &str,
        layout: &MapLayout,
    ) -> Result<Self> {
        let center = bbox.center();
        let locations: Vec<[f64; 2]> = polygon.iter().map(Coordinate::as_lat_lon).collect();
        let bounds = [bbox.south_west().as_lat_lon(), bbox.north_east().as_lat_lon()];

        let label_html = format!(
            "<div style=\"font-size: {}px; font-weight: bold; color: black; -webkit-text-stroke: 0.5px white;\">{}</div>",
            layout.label_font_px, label
        );
        let (label_w, label_h) = layout.label_size;

        let mut html = String::with_capacity(2048 + locations.len() * 40);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n");
        writeln!(html, "<link rel=\"stylesheet\" href=\"{}\" />", LEAFLET_CSS)?;
        writeln!(html, "<script src=\"{}\"></script>", LEAFLET_JS)?;
        html.push_str(
            "<style>html, body { width: 100%; height: 100%; margin: 0; padding: 0; } \
             #map { position: absolute; top: 0; bottom: 0; left: 0; right: 0; } \
             .map-label { background: none; border: none; }</style>\n",
        );
        html.push_str("</head>\n<body>\n<div id=\"map\"></div>\n<script>\n");

        writeln!(
            html,
            "var map = L.map(\"map\", {{ center: {}, zoom: {}, zoomSnap: 0.1 }});",
            serde_json::to_string(&center.as_lat_lon())?,
            INITIAL_ZOOM
        )?;
        writeln!(
            html,
            "L.tileLayer({}, {{ maxZoom: 19, attribution: {} }}).addTo(map);",
            serde_json::to_string(TILE_URL)?,
            serde_json::to_string(TILE_ATTRIBUTION)?
        )?;
        html.push_str("L.control.scale().addTo(map);\n");
        // A single-point box has no extent to fit; keep the initial view
        if !bbox.is_point() {
            writeln!(
                html,
                "map.fitBounds({}, {{ padding: [{p}, {p}] }});",
                serde_json::to_string(&bounds)?,
                p = layout.padding
            )?;
        }
        writeln!(
            html,
            "L.polygon({}, {}).addTo(map);",
            serde_json::to_string(&locations)?,
            serde_json::to_string(&layout.polygon)?
        )?;
        writeln!(
            html,
            "L.marker({}, {{ icon: L.divIcon({{ className: \"map-label\", html: {}, iconSize: [{}, {}], iconAnchor: [{}, {}] }}) }}).addTo(map);",
            serde_json::to_string(&center.as_lat_lon())?,
            serde_json::to_string(&label_html)?,
            label_w,
            label_h,
            label_w / 2,
            label_h / 2
        )?;
        html.push_str("</script>\n</body>\n</html>\n");

        Ok(Self { html })
    }

    /// Returns the document markup
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// Writes the document to a new temporary `.html` file in `dir`
    ///
    /// The file is removed when the returned handle is dropped or closed.
    pub fn write_temp(&self, dir: &Path) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("map-")
            .suffix(".html")
            .tempfile_in(dir)?;
        file.write_all(self.html.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}
