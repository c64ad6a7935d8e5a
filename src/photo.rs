//! Photos and date outlier detection.
//!
//! A photo belongs to one post (though providers may list it in several) and
//! carries its own location, capture date and size variants. EXIF is fetched
//! lazily from the post provider on first request and kept on the photo.
//!
//! ## Date Outliers
//!
//! A post's "happened on" date comes from the photos' capture dates. Cameras
//! with unset clocks and scanned prints produce dates far from the rest, so
//! [`identify_outliers`] marks photos outside a Tukey fence:
//!
//! ```text
//! sorted times → lower half / upper half → Q1, Q3
//! IQR   = Q3 - Q1
//! fence = [Q1 - 3·IQR, Q3 + 3·IQR]
//! ```
//!
//! Each quartile is the median of its half. For halves with an even number
//! of values the lower of the two middle values is taken, so quartiles are
//! always observed capture times.

use crate::geo::{Feature, Location};
use crate::media::{Exif, PhotoSize};
use crate::provider::{PostProvider, ProviderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Fence width in multiples of the interquartile range.
const OUTLIER_DISTANCE: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub id: String,
    /// Position within the post.
    pub index: usize,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Tag slugs, or full tag names once resolved by the blog.
    pub tags: BTreeSet<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub date_taken: Option<DateTime<Utc>>,
    /// Whether this is the post's cover photo.
    pub primary: bool,
    /// Named size variants (`"thumb"`, `"preview"`, ...).
    pub size: BTreeMap<String, PhotoSize>,
    pub preview: Option<PhotoSize>,
    pub normal: Option<PhotoSize>,
    pub big: Option<PhotoSize>,
    #[serde(skip_deserializing)]
    pub outlier_date: bool,
    /// Memoised result of the `exif()` fetch.
    #[serde(skip)]
    pub exif: Option<Exif>,
}

impl Photo {
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
            ..Default::default()
        }
    }

    /// Comma-separated tags.
    pub fn tag_list(&self) -> String {
        self.tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    pub fn location(&self) -> Location {
        [self.longitude, self.latitude]
    }

    /// URL of the preview rendition, falling back to the named `"preview"` size.
    pub fn preview_url(&self) -> Option<&str> {
        self.preview
            .as_ref()
            .or_else(|| self.size.get("preview"))
            .and_then(|s| s.url.as_deref())
    }

    /// EXIF for the photo, fetched from the provider on first call.
    pub async fn exif(&mut self, provider: &dyn PostProvider) -> Result<&Exif, ProviderError> {
        let exif = match self.exif.take() {
            Some(exif) => exif,
            None => {
                debug!(photo = %self.id, "loading EXIF");
                provider.exif(&self.id).await?
            }
        };
        Ok(&*self.exif.insert(exif))
    }

    /// Map point for the blog-wide photo map.
    pub fn geo_json(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert("url".into(), url_value(self.preview_url()));
        Feature::point(self.location(), properties)
    }

    /// Map point for a single post's map, linking back to the post part.
    pub fn post_geo_json(&self, part_key: Option<&str>) -> Feature {
        let mut properties = Map::new();
        properties.insert("url".into(), url_value(self.preview_url()));
        properties.insert(
            "title".into(),
            self.title.clone().map_or(Value::Null, Value::String),
        );
        properties.insert("partKey".into(), url_value(part_key));
        Feature::point(self.location(), properties)
    }
}

fn url_value(s: Option<&str>) -> Value {
    s.map_or(Value::Null, |s| Value::String(s.to_string()))
}

/// Inclusive range of acceptable values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fence {
    pub min: f64,
    pub max: f64,
}

impl Fence {
    /// Tukey fence `distance` interquartile ranges beyond the quartiles.
    /// `None` when there are no values.
    pub fn from_values(values: &[f64], distance: f64) -> Option<Fence> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let half = sorted.len() / 2;
        let lower = if half == 0 { &sorted[..] } else { &sorted[..half] };
        let upper = &sorted[half..];
        let q1 = low_median(lower);
        let q3 = low_median(upper);
        let iqr = q3 - q1;

        Some(Fence {
            min: q1 - distance * iqr,
            max: q3 + distance * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn low_median(sorted: &[f64]) -> f64 {
    sorted[(sorted.len() - 1) / 2]
}

/// Set `outlier_date` on photos whose capture time falls outside the fence.
/// Photos without a capture date are never outliers.
pub fn identify_outliers(photos: &mut [Photo]) {
    let times: Vec<f64> = photos
        .iter()
        .filter_map(|p| p.date_taken)
        .map(|d| d.timestamp_millis() as f64)
        .collect();

    let Some(fence) = Fence::from_values(&times, OUTLIER_DISTANCE) else {
        return;
    };

    for photo in photos.iter_mut() {
        photo.outlier_date = photo
            .date_taken
            .is_some_and(|d| !fence.contains(d.timestamp_millis() as f64));
    }
}
