//! Small value types attached to photos and posts.

use serde::{Deserialize, Serialize};

/// URL and dimensions of one rendition of a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoSize {
    pub url: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl PhotoSize {
    pub fn new(width: u32, height: u32, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.width == 0
    }
}

/// Embedded video shown with a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    /// A video without both dimensions can't be embedded.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Camera details for a single photo, as supplied by the post provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exif {
    pub artist: String,
    pub compensation: String,
    pub time: String,
    pub f_number: f64,
    pub focal_length: f64,
    pub iso: u32,
    pub lens: String,
    pub model: String,
    pub software: String,
    /// Whether raw values have been formatted for display.
    pub sanitized: bool,
}
