//! GeoJSON emission for a routed path.

use crate::isochrone::IsoPoint;
use ::geojson::{Feature, FeatureCollection, Geometry, Value};
use chrono::{DateTime, Utc};
use serde_json::{json, Map};

/// Formats a timestamp the way Python's `str(datetime)` does: a space
/// separator, no UTC offset suffix.
fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Renders a routed path as a `FeatureCollection`: one `Point` feature per
/// path sample (with timestamp/wind/speed/heading properties) followed by
/// a trailing `LineString` feature spanning the whole track.
pub fn path_as_geojson(path: &[IsoPoint]) -> FeatureCollection {
    let mut features: Vec<Feature> = path
        .iter()
        .map(|p| {
            let geometry = Geometry::new(Value::Point(vec![p.lon, p.lat]));
            let mut properties = Map::new();
            properties.insert("timestamp".to_string(), json!(format_timestamp(p.time)));
            properties.insert("twd".to_string(), json!(p.twd.to_degrees()));
            properties.insert("tws".to_string(), json!(p.tws));
            properties.insert("knots".to_string(), json!(p.speed));
            properties.insert("heading".to_string(), json!(p.brg_deg));
            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    if let (Some(first), Some(last)) = (path.first(), path.last()) {
        let coords: Vec<Vec<f64>> = path.iter().map(|p| vec![p.lon, p.lat]).collect();
        let geometry = Geometry::new(Value::LineString(coords));
        let mut properties = Map::new();
        properties.insert("start-timestamp".to_string(), json!(format_timestamp(first.time)));
        properties.insert("end-timestamp".to_string(), json!(format_timestamp(last.time)));
        features.push(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    FeatureCollection { bbox: None, features, foreign_members: None }
}
