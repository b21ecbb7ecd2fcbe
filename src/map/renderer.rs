//! Network Map Renderer Module
//! Renders the canonical table as a self-contained Leaflet HTML page.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::data::{columns, LoaderError, ScanTable};

#[derive(Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Unparseable coordinate '{0}'")]
    Coordinate(String),
    #[error("No rows with usable coordinates to map")]
    NoMappableRows,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One plotted network: position, identity and the marker color derived
/// from its security label.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub bssid: String,
    pub essid: String,
    pub power: String,
    pub security: String,
    pub device_class: String,
    pub color: &'static str,
}

impl NetworkMarker {
    pub fn tooltip(&self) -> &str {
        if self.essid.is_empty() {
            "Unknown Network"
        } else {
            &self.essid
        }
    }
}

/// Generates the interactive network map consumed by operators.
pub struct MapRenderer;

impl MapRenderer {
    /// Marker color for a security label, case-insensitive.
    pub fn marker_color(security: &str) -> &'static str {
        match security.trim().to_ascii_uppercase().as_str() {
            "WPA" => "red",
            "WPA2" => "blue",
            "WPA3" => "green",
            _ => "gray",
        }
    }

    /// Build markers from a canonical table.
    ///
    /// Rows missing any of Latitude, Longitude or Security are skipped;
    /// a present but unparseable coordinate is an error.
    pub fn markers_from_table(table: &ScanTable) -> Result<Vec<NetworkMarker>, MapError> {
        let idx = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| LoaderError::MissingColumn(name.to_string()))
        };
        let lat_idx = idx(columns::LATITUDE)?;
        let lon_idx = idx(columns::LONGITUDE)?;
        let sec_idx = idx(columns::SECURITY)?;
        let bssid_idx = idx(columns::BSSID)?;
        let essid_idx = idx(columns::ESSID)?;
        let power_idx = idx(columns::POWER)?;
        let type_idx = idx(columns::TYPE)?;

        let mut markers = Vec::new();
        for row in &table.rows {
            let cell = |i: usize| row.cells.get(i).and_then(|c| c.as_deref());
            let (Some(lat), Some(lon), Some(security)) =
                (cell(lat_idx), cell(lon_idx), cell(sec_idx))
            else {
                continue;
            };
            let latitude = Self::parse_coordinate(lat)?;
            let longitude = Self::parse_coordinate(lon)?;

            markers.push(NetworkMarker {
                latitude,
                longitude,
                bssid: cell(bssid_idx).unwrap_or_default().to_string(),
                essid: cell(essid_idx).unwrap_or_default().to_string(),
                power: cell(power_idx).unwrap_or_default().to_string(),
                security: security.to_string(),
                device_class: cell(type_idx).unwrap_or_default().to_string(),
                color: Self::marker_color(security),
            });
        }
        Ok(markers)
    }

    /// Render the full HTML page. The map centers on the first marker.
    pub fn render_html(markers: &[NetworkMarker]) -> Result<String, MapError> {
        let center = markers.first().ok_or(MapError::NoMappableRows)?;

        let mut html = String::new();
        html.push_str(concat!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n",
            "<title>Network Map</title>\n",
            "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\"/>\n",
            "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css\"/>\n",
            "<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css\"/>\n",
            "<script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>\n",
            "<script src=\"https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js\"></script>\n",
            "<style>html, body, #map { height: 100%; margin: 0; }</style>\n",
            "</head>\n<body>\n<div id=\"map\"></div>\n<script>\n",
        ));
        let _ = writeln!(
            html,
            "var map = L.map('map').setView([{}, {}], 15);",
            center.latitude, center.longitude
        );
        html.push_str(concat!(
            "L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', ",
            "{ maxZoom: 19, attribution: '&copy; OpenStreetMap contributors' }).addTo(map);\n",
            "var cluster = L.markerClusterGroup();\n",
        ));
        for marker in markers {
            Self::push_marker_js(&mut html, marker);
        }
        html.push_str("map.addLayer(cluster);\n</script>\n</body>\n</html>\n");
        Ok(html)
    }

    /// Build markers from `table`, render and write the page to `path`.
    pub fn render_to_file(table: &ScanTable, path: &Path) -> Result<(), MapError> {
        let markers = Self::markers_from_table(table)?;
        let html = Self::render_html(&markers)?;
        fs::write(path, html)?;
        Ok(())
    }

    fn push_marker_js(html: &mut String, marker: &NetworkMarker) {
        let popup = format!(
            "<b>BSSID:</b> {}<br><b>ESSID:</b> {}<br><b>Power:</b> {}<br>\
             <b>Security:</b> {}<br><b>Type:</b> {}",
            escape_html(&marker.bssid),
            escape_html(&marker.essid),
            escape_html(&marker.power),
            escape_html(&marker.security),
            escape_html(&marker.device_class),
        );
        let _ = writeln!(
            html,
            "L.circleMarker([{lat}, {lon}], {{ radius: 8, color: '{color}', \
             fillColor: '{color}', fillOpacity: 0.8 }})\
             .bindPopup(\"{popup}\").bindTooltip(\"{tooltip}\").addTo(cluster);",
            lat = marker.latitude,
            lon = marker.longitude,
            color = marker.color,
            popup = escape_js(&popup),
            tooltip = escape_js(&escape_html(marker.tooltip())),
        );
    }

    fn parse_coordinate(value: &str) -> Result<f64, MapError> {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| MapError::Coordinate(value.to_string()))
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Escape for embedding in a double-quoted JS string literal.
fn escape_js(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }
    out
}
