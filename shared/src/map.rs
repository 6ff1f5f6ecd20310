//! Renders a [`FleetSnapshot`] as a standalone Leaflet page.
//!
//! Vehicle data is never spliced into markup or script directly: text shown in
//! popups and labels is HTML-escaped, and everything the page script needs is
//! embedded as one JSON object.

use crate::map::error::RenderError;
use crate::positions::{FleetSnapshot, VehicleSnapshot};
use crate::{MapConfig, MarkerStyle, TileLayerConfig};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const AWESOME_MARKERS_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css";
const AWESOME_MARKERS_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js";
const FONT_AWESOME_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css";

pub const PAGE_TITLE: &str = "Vehicle Tracker";
pub const VEHICLES_OVERLAY: &str = "Vehicles";
pub const POPUP_MAX_WIDTH: u16 = 300;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapData<'a> {
    center: [f64; 2],
    zoom: u8,
    base_layers: &'a [TileLayerConfig],
    marker: &'a MarkerStyle,
    overlay_name: &'static str,
    popup_max_width: u16,
    vehicles: Vec<VehicleMarker>,
}

#[derive(Serialize)]
struct VehicleMarker {
    position: [f64; 2],
    tooltip: String,
    popup: String,
    label: String,
}

impl VehicleMarker {
    fn new(vehicle: &VehicleSnapshot) -> Self {
        let latest = &vehicle.latest;
        Self {
            position: [latest.latitude, latest.longitude],
            tooltip: format!("Vehicle {}", escape_html(&vehicle.vehicle_id)),
            popup: popup_html(vehicle),
            label: format!(
                r#"<div class="vehicle-label-box">{}</div>"#,
                escape_html(&vehicle.vehicle_id)
            ),
        }
    }
}

fn popup_html(vehicle: &VehicleSnapshot) -> String {
    let latest = &vehicle.latest;
    let mut html = String::from(r#"<div class="vehicle-popup">"#);
    let _ = write!(html, "<h4>Vehicle {}</h4>", escape_html(&vehicle.vehicle_id));
    let _ = write!(html, "<p><strong>Latitude:</strong> {:.6}</p>", latest.latitude);
    let _ = write!(html, "<p><strong>Longitude:</strong> {:.6}</p>", latest.longitude);
    let _ = write!(html, "<p><strong>Heading:</strong> {}&deg;</p>", latest.heading);
    let _ = write!(html, "<p><strong>Speed:</strong> {} km/h</p>", latest.speed);
    let _ = write!(
        html,
        "<p><strong>GPS time:</strong> {}</p>",
        escape_html(&latest.gps_timestamp)
    );
    let _ = write!(
        html,
        "<p><strong>Received:</strong> {}</p>",
        escape_html(&latest.received_timestamp)
    );
    html.push_str("</div>");
    html
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the map page. With no vehicles the map is centered on `(0, 0)`.
pub fn render_map(fleet: &FleetSnapshot, config: &MapConfig) -> Result<String, RenderError> {
    let center = fleet
        .centroid
        .map_or([0.0, 0.0], |c| [c.latitude, c.longitude]);

    let data = MapData {
        center,
        zoom: config.zoom_start,
        base_layers: &config.base_layers,
        marker: &config.marker,
        overlay_name: VEHICLES_OVERLAY,
        popup_max_width: POPUP_MAX_WIDTH,
        vehicles: fleet.vehicles.iter().map(VehicleMarker::new).collect(),
    };
    // `</` would let a vehicle id close the surrounding script element
    let data_json = serde_json::to_string(&data)?.replace("</", "<\\/");

    debug!(
        name: "map.rendered",
        vehicles = data.vehicles.len(),
        "rendered vehicle map"
    );

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>{PAGE_TITLE}</title>
<link rel="stylesheet" href="{LEAFLET_CSS}" />
<link rel="stylesheet" href="{AWESOME_MARKERS_CSS}" />
<link rel="stylesheet" href="{FONT_AWESOME_CSS}" />
<script src="{LEAFLET_JS}"></script>
<script src="{AWESOME_MARKERS_JS}"></script>
<style>
html, body {{ height: 100%; margin: 0; padding: 0; }}
#map {{ position: absolute; top: 0; bottom: 0; left: 0; right: 0; }}
.vehicle-label {{ background: none; border: none; }}
.vehicle-label-box {{ display: inline-block; background-color: white; border: 2px solid black; padding: 2px 6px; border-radius: 3px; font-weight: bold; font-size: 12px; white-space: nowrap; }}
.vehicle-popup {{ font-family: Arial, sans-serif; min-width: 200px; }}
.mouse-position {{ background: rgba(255, 255, 255, 0.8); padding: 0 5px; font-size: 11px; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {data_json};
const map = L.map("map", {{ center: data.center, zoom: data.zoom }});

const baseLayers = {{}};
data.baseLayers.forEach((layer, index) => {{
  const tiles = L.tileLayer(layer.url, {{ attribution: layer.attribution, maxZoom: layer.max_zoom }});
  if (index === 0) {{
    tiles.addTo(map);
  }}
  baseLayers[layer.name] = tiles;
}});

const vehicles = L.featureGroup().addTo(map);
const vehicleIcon = L.AwesomeMarkers.icon({{
  icon: data.marker.icon,
  markerColor: data.marker.color,
  iconColor: data.marker.icon_color,
  prefix: "fa",
}});
data.vehicles.forEach((vehicle) => {{
  L.marker(vehicle.position, {{ icon: vehicleIcon }})
    .bindPopup(vehicle.popup, {{ maxWidth: data.popupMaxWidth }})
    .bindTooltip(vehicle.tooltip)
    .addTo(vehicles);
  L.marker(vehicle.position, {{
    icon: L.divIcon({{ html: vehicle.label, className: "vehicle-label", iconSize: [100, 20], iconAnchor: [50, 10] }}),
  }}).addTo(vehicles);
}});

L.control.layers(baseLayers, {{ [data.overlayName]: vehicles }}).addTo(map);
L.control.scale().addTo(map);

const MousePosition = L.Control.extend({{
  options: {{ position: "bottomright" }},
  onAdd: function (target) {{
    const container = L.DomUtil.create("div", "mouse-position");
    target.on("mousemove", (event) => {{
      container.textContent = event.latlng.lat.toFixed(5) + " : " + event.latlng.lng.toFixed(5);
    }});
    return container;
  }},
}});
new MousePosition().addTo(map);
</script>
</body>
</html>
"#
    ))
}

/// Page shown instead of the map while the position log has no vehicles.
pub fn empty_page(csv_path: &Path) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8" /><title>{PAGE_TITLE}</title></head>
<body>
<h1>{PAGE_TITLE}</h1>
<p>No vehicle data available.</p>
<p>Check that {} contains position data.</p>
</body>
</html>
"#,
        escape_html(&csv_path.display().to_string())
    )
}

/// Replaces `path` with `html` in one step, so a reader never observes a
/// half-written document.
pub async fn write_document(path: &Path, html: &str) -> Result<(), RenderError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| RenderError::InvalidPath(path.to_path_buf()))?
        .to_string_lossy();
    let staging = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    if let Err(source) = tokio::fs::write(&staging, html).await {
        return Err(RenderError::Write {
            path: staging,
            source,
        });
    }
    if let Err(source) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(RenderError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

pub mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum RenderError {
        #[error("failed to encode map data: {0}")]
        Encode(#[from] serde_json::Error),
        #[error("failed to write map document {path}: {source}")]
        Write {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("map output path {0} has no file name")]
        InvalidPath(PathBuf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::{FleetSnapshot, PositionRecord};

    fn fleet(rows: &[(&str, f64, f64)]) -> FleetSnapshot {
        let records = rows
            .iter()
            .map(|(id, latitude, longitude)| PositionRecord {
                vehicle_id: (*id).to_string(),
                latitude: *latitude,
                longitude: *longitude,
                heading: 45.0,
                speed: 62.5,
                gps_timestamp: "2024-05-01 12:00:00".to_string(),
                received_timestamp: "2024-05-01 12:00:02".to_string(),
            })
            .collect();
        FleetSnapshot::from_records(records, 0)
    }

    /// Pulls the JSON object assigned to `data` back out of a rendered page.
    fn embedded_data(html: &str) -> serde_json::Value {
        let start = html.find("const data = ").unwrap() + "const data = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        serde_json::from_str(&html[start..end].replace("<\\/", "</")).unwrap()
    }

    #[test]
    fn one_marker_and_label_per_vehicle() {
        let html = render_map(
            &fleet(&[("A", 10.0, 20.0), ("B", 30.0, 40.0)]),
            &MapConfig::default(),
        )
        .unwrap();
        let data = embedded_data(&html);

        let vehicles = data["vehicles"].as_array().unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0]["tooltip"], "Vehicle A");
        assert_eq!(vehicles[0]["position"], serde_json::json!([10.0, 20.0]));
        assert_eq!(
            vehicles[1]["label"],
            r#"<div class="vehicle-label-box">B</div>"#
        );
        assert_eq!(data["center"], serde_json::json!([20.0, 30.0]));
        assert_eq!(data["zoom"], 12);
    }

    #[test]
    fn popup_lists_position_details() {
        let html = render_map(&fleet(&[("A", -34.6037, -58.3816)]), &MapConfig::default()).unwrap();
        let data = embedded_data(&html);
        let popup = data["vehicles"][0]["popup"].as_str().unwrap();

        assert!(popup.contains("<h4>Vehicle A</h4>"));
        assert!(popup.contains("-34.603700"));
        assert!(popup.contains("-58.381600"));
        assert!(popup.contains("45&deg;"));
        assert!(popup.contains("62.5 km/h"));
        assert!(popup.contains("2024-05-01 12:00:00"));
        assert!(popup.contains("2024-05-01 12:00:02"));
        assert_eq!(data["popupMaxWidth"], 300);
    }

    #[test]
    fn layer_control_lists_configured_layers() {
        let html = render_map(&fleet(&[("A", 1.0, 1.0)]), &MapConfig::default()).unwrap();
        let data = embedded_data(&html);

        let names = data["baseLayers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "OpenStreetMap",
                "Google Satellite",
                "Google Streets",
                "Google Terrain"
            ]
        );
        assert_eq!(data["overlayName"], "Vehicles");
        assert_eq!(data["marker"]["icon"], "car");
        assert!(html.contains("L.control.layers("));
        assert!(html.contains("L.control.scale()"));
        assert!(html.contains("new MousePosition()"));
    }

    #[test]
    fn vehicle_ids_cannot_inject_markup() {
        let hostile = "</script><script>alert(1)</script>";
        let html = render_map(&fleet(&[(hostile, 1.0, 1.0)]), &MapConfig::default()).unwrap();

        assert!(!html.contains(hostile));
        assert_eq!(html.matches("</script>").count(), 3);
        let data = embedded_data(&html);
        let escaped = "&lt;/script&gt;&lt;script&gt;alert(1)&lt;/script&gt;";
        let vehicle = &data["vehicles"][0];
        assert!(vehicle["label"].as_str().unwrap().contains(escaped));
        assert_eq!(vehicle["tooltip"], format!("Vehicle {escaped}"));
        assert!(vehicle["popup"].as_str().unwrap().contains(escaped));
    }

    #[test]
    fn empty_fleet_centers_on_origin() {
        let html = render_map(&FleetSnapshot::default(), &MapConfig::default()).unwrap();
        let data = embedded_data(&html);
        assert_eq!(data["center"], serde_json::json!([0.0, 0.0]));
        assert!(data["vehicles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn escape_html_covers_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain 123"), "plain 123");
    }

    #[test]
    fn empty_page_names_the_log() {
        let page = empty_page(Path::new("logs/<positions>.csv"));
        assert!(page.contains("No vehicle data available."));
        assert!(page.contains("logs/&lt;positions&gt;.csv"));
    }

    #[tokio::test]
    async fn write_document_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vehicle_map.html");
        tokio::fs::write(&path, "old").await.unwrap();

        write_document(&path, "<html>new</html>").await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "<html>new</html>"
        );
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn write_document_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("vehicle_map.html");
        let err = write_document(&path, "x").await.unwrap_err();
        assert!(matches!(err, RenderError::Write { .. }));
    }
}
