//! Data provider contracts.
//!
//! The blog never talks to a photo service itself. Everything it knows comes
//! from providers bound once at startup:
//!
//! | Capability | Trait | Supplies |
//! |---|---|---|
//! | `post` | [`PostProvider`] | the post list, post details, photos, EXIF |
//! | `map` | [`MapProvider`] | GPS tracks per post, GPX export |
//! | `video` | [`VideoProvider`] | embedded video details |
//!
//! A [`PostProvider`] populates the blog by driving one load cycle:
//!
//! ```text
//! blog.begin_load()
//! blog.add_post(..)      // once per post, in the provider's own order
//! blog.finish_load()     // correlation + change detection
//! ```
//!
//! Asking for a capability that was never bound is a wiring mistake, not a
//! data condition: [`Providers`] reports it immediately as
//! [`BlogError::MissingProvider`]. Failures inside a provider are returned as
//! [`ProviderError`] and passed through unchanged.

use crate::blog::{BlogError, PhotoBlog};
use crate::geo::FeatureCollection;
use crate::media::{Exif, VideoInfo};
use crate::photo::Photo;
use crate::post::{Post, PostInfo};
use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Provider request failed: {0}")]
    Request(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether the message reports a missing item rather than a failed request.
    ///
    /// Checked on the message so that providers surfacing "not found" through
    /// [`ProviderError::Request`] are recognised too.
    pub fn is_not_found(&self) -> bool {
        self.to_string().contains("not found")
    }
}

/// Provider capability a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Post,
    Map,
    Video,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Post => "post",
            Capability::Map => "map",
            Capability::Video => "video",
        };
        f.write_str(name)
    }
}

/// Loads posts, photos and their details.
#[async_trait]
pub trait PostProvider: Send + Sync {
    /// Populate the blog by running one `begin_load` → `add_post`* →
    /// `finish_load` cycle.
    async fn photo_blog(&self, blog: &mut PhotoBlog) -> Result<(), ProviderError>;

    async fn exif(&self, photo_id: &str) -> Result<Exif, ProviderError>;

    /// ID of the first post containing the photo, if any.
    async fn post_id_with_photo_id(&self, photo_id: &str) -> Result<Option<String>, ProviderError>;

    async fn photos_with_tags(&self, tags: &[String]) -> Result<Vec<Photo>, ProviderError>;

    /// Details not included in the post list (description, dates, cover photo).
    async fn post_info(&self, post: &Post) -> Result<PostInfo, ProviderError>;

    async fn post_photos(&self, post: &Post) -> Result<Vec<Photo>, ProviderError>;
}

/// Loads map data for posts.
#[async_trait]
pub trait MapProvider: Send + Sync {
    /// GPS track for the post, `None` when the post has none.
    async fn track(&self, post_key: &str) -> Result<Option<FeatureCollection>, ProviderError>;

    /// Write the post's track as GPX. Fails with a "not found" error when the
    /// post has no track.
    async fn gpx(&self, post_key: &str, out: &mut (dyn Write + Send)) -> Result<(), ProviderError>;
}

/// Loads videos associated with a post.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn video_info(&self, post: &Post) -> Result<Option<VideoInfo>, ProviderError>;
}

/// Providers bound to the blog at startup.
#[derive(Clone, Default)]
pub struct Providers {
    post: Option<Arc<dyn PostProvider>>,
    map: Option<Arc<dyn MapProvider>>,
    video: Option<Arc<dyn VideoProvider>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one provider to every capability it implements.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: PostProvider + MapProvider + VideoProvider + 'static,
    {
        Self {
            post: Some(provider.clone() as Arc<dyn PostProvider>),
            map: Some(provider.clone() as Arc<dyn MapProvider>),
            video: Some(provider as Arc<dyn VideoProvider>),
        }
    }

    pub fn with_post(mut self, provider: Arc<dyn PostProvider>) -> Self {
        self.post = Some(provider);
        self
    }

    pub fn with_map(mut self, provider: Arc<dyn MapProvider>) -> Self {
        self.map = Some(provider);
        self
    }

    pub fn with_video(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.video = Some(provider);
        self
    }

    pub fn post(&self) -> Result<Arc<dyn PostProvider>, BlogError> {
        self.post
            .clone()
            .ok_or(BlogError::MissingProvider(Capability::Post))
    }

    pub fn map(&self) -> Result<Arc<dyn MapProvider>, BlogError> {
        self.map
            .clone()
            .ok_or(BlogError::MissingProvider(Capability::Map))
    }

    pub fn video(&self) -> Result<Arc<dyn VideoProvider>, BlogError> {
        self.video
            .clone()
            .ok_or(BlogError::MissingProvider(Capability::Video))
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("post", &self.post.is_some())
            .field("map", &self.map.is_some())
            .field("video", &self.video.is_some())
            .finish()
    }
}
