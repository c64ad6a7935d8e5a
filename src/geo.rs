//! Minimal GeoJSON values for post and blog maps.
//!
//! Only the shapes the blog produces or receives are modelled: photo points
//! and GPS track lines, wrapped in features and feature collections. Every
//! coordinate is a `[longitude, latitude]` pair, as GeoJSON requires.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Write};

/// `[longitude, latitude]`
pub type Location = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Location },
    LineString { coordinates: Vec<Location> },
    MultiLineString { coordinates: Vec<Vec<Location>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

impl Feature {
    pub fn point(location: Location, properties: Map<String, Value>) -> Self {
        Self {
            properties,
            geometry: Geometry::Point {
                coordinates: location,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// All line coordinates in the collection, flattened into track segments.
    pub fn track_segments(&self) -> Vec<&[Location]> {
        let mut segments = Vec::new();
        for f in &self.features {
            match &f.geometry {
                Geometry::LineString { coordinates } => segments.push(coordinates.as_slice()),
                Geometry::MultiLineString { coordinates } => {
                    segments.extend(coordinates.iter().map(Vec::as_slice))
                }
                Geometry::Point { .. } => {}
            }
        }
        segments
    }

    /// Write the collection's lines as a GPX 1.1 track named `name`.
    pub fn write_gpx(&self, name: &str, out: &mut (dyn Write + Send)) -> io::Result<()> {
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<gpx version="1.1" creator="photo-blog" xmlns="http://www.topografix.com/GPX/1/1">"#
        )?;
        writeln!(out, "  <trk>")?;
        writeln!(out, "    <name>{}</name>", escape_xml(name))?;
        for segment in self.track_segments() {
            writeln!(out, "    <trkseg>")?;
            for [lon, lat] in segment {
                writeln!(out, r#"      <trkpt lat="{lat}" lon="{lon}"/>"#)?;
            }
            writeln!(out, "    </trkseg>")?;
        }
        writeln!(out, "  </trk>")?;
        writeln!(out, "</gpx>")
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// South-west and north-east corners enclosing a set of locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub sw: Location,
    pub ne: Location,
}

/// Arithmetic centre of a set of locations, `None` when there are none.
pub fn centroid(locations: &[Location]) -> Option<Location> {
    if locations.is_empty() {
        return None;
    }
    let n = locations.len() as f64;
    let (lon, lat) = locations
        .iter()
        .fold((0.0, 0.0), |(lon, lat), l| (lon + l[0], lat + l[1]));
    Some([lon / n, lat / n])
}

/// Round a coordinate to five decimal places (about one metre).
pub fn round_coordinate(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn centroid_of_nothing_is_none() {
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn centroid_averages_points() {
        let c = centroid(&[[10.0, 100.0], [20.0, 120.0], [30.0, 140.0]]).unwrap();
        assert_eq!(c, [20.0, 120.0]);
    }

    #[test]
    fn round_coordinate_to_five_places() {
        assert_eq!(round_coordinate(-116.123456789), -116.12346);
        assert_eq!(round_coordinate(43.5), 43.5);
    }

    #[test]
    fn feature_serializes_with_type_tags() {
        let f = Feature::point([1.0, 2.0], Map::new());
        let value = serde_json::to_value(&f).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            })
        );
    }

    #[test]
    fn collection_parses_track() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "Day 1" },
                    "geometry": { "type": "LineString", "coordinates": [[1.0, 2.0], [3.0, 4.0]] }
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "MultiLineString",
                        "coordinates": [[[5.0, 6.0]], [[7.0, 8.0], [9.0, 10.0]]]
                    }
                }
            ]
        });
        let collection: FeatureCollection = serde_json::from_value(value).unwrap();
        let segments = collection.track_segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], &[[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(segments[2].len(), 2);
    }

    #[test]
    fn writes_gpx_track_segments() {
        let collection = FeatureCollection {
            features: vec![Feature {
                properties: Map::new(),
                geometry: Geometry::MultiLineString {
                    coordinates: vec![vec![[-116.5, 43.25]], vec![[-116.0, 43.0], [-115.5, 42.75]]],
                },
            }],
        };
        let mut out = Vec::new();
        collection.write_gpx("Ride & Camp", &mut out).unwrap();
        let gpx = String::from_utf8(out).unwrap();

        assert!(gpx.contains("<name>Ride &amp; Camp</name>"));
        assert_eq!(gpx.matches("<trkseg>").count(), 2);
        assert!(gpx.contains(r#"<trkpt lat="43.25" lon="-116.5"/>"#));
        assert!(gpx.trim_end().ends_with("</gpx>"));
    }
}
