//! JSON snapshot provider.
//!
//! A snapshot is a complete export of a photo service account: the post list
//! with photos and details, nested categories, tag names, GPS tracks and
//! EXIF. [`SnapshotProvider`] serves one snapshot through all three provider
//! traits, so the blog can be loaded and inspected without a network service.
//!
//! ```json
//! {
//!   "tags": { "bike": "Bicycle" },
//!   "categories": [
//!     { "title": "When", "subcategories": [ { "title": "2016", "posts": ["72157"] } ] }
//!   ],
//!   "posts": [
//!     { "id": "72157", "title": "Brother Ride: Day 1", "photos": [ ... ] }
//!   ],
//!   "tracks": { "brother-ride": { "type": "FeatureCollection", "features": [] } },
//!   "exif": { "photo-id": { "artist": "Jane Doe", "iso": 200 } }
//! }
//! ```
//!
//! Posts are listed in the order the configured `provider_post_sort` says.
//! Tracks are keyed by post key. Replacing the snapshot and loading again
//! behaves like the photo service gaining or losing albums.

use crate::blog::PhotoBlog;
use crate::category::Category;
use crate::geo::FeatureCollection;
use crate::media::{Exif, VideoInfo};
use crate::photo::Photo;
use crate::post::{Post, PostInfo};
use crate::provider::{MapProvider, PostProvider, ProviderError, VideoProvider};
use crate::slug::slug;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Snapshot {
    /// Tag slug → full tag name.
    pub tags: BTreeMap<String, String>,
    pub categories: Vec<CategoryRecord>,
    pub posts: Vec<PostRecord>,
    /// GPS tracks by post key.
    pub tracks: BTreeMap<String, FeatureCollection>,
    /// EXIF by photo ID.
    pub exif: BTreeMap<String, Exif>,
}

impl Snapshot {
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    fn record(&self, post_id: &str) -> Option<&PostRecord> {
        self.posts.iter().find(|r| r.id == post_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryRecord {
    pub title: String,
    /// Defaults to the slug of the title.
    pub key: Option<String>,
    /// IDs of posts in the category.
    pub posts: Vec<String>,
    pub subcategories: Vec<CategoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub chronological: bool,
    pub feature: bool,
    pub description: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub big_thumb_url: Option<String>,
    pub small_thumb_url: Option<String>,
    /// ID of the cover photo. Defaults to the photo marked primary.
    pub cover_photo: Option<String>,
    pub video: Option<VideoInfo>,
    pub photos: Vec<Photo>,
}

impl Default for PostRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            chronological: true,
            feature: false,
            description: None,
            created_on: None,
            updated_on: None,
            big_thumb_url: None,
            small_thumb_url: None,
            cover_photo: None,
            video: None,
            photos: Vec::new(),
        }
    }
}

impl PostRecord {
    fn to_post(&self, separator: &str) -> Post {
        let mut post = Post::new(self.id.clone(), &self.title, separator);
        post.chronological = self.chronological;
        post.feature = self.feature;
        post.big_thumb_url = self.big_thumb_url.clone();
        post.small_thumb_url = self.small_thumb_url.clone();
        post
    }

    /// Photos numbered by their position in the post.
    fn indexed_photos(&self) -> Vec<Photo> {
        self.photos
            .iter()
            .enumerate()
            .map(|(i, p)| Photo {
                index: i,
                ..p.clone()
            })
            .collect()
    }

    fn cover_photo(&self) -> Option<Photo> {
        let photos = self.indexed_photos();
        let cover = match &self.cover_photo {
            Some(id) => photos.into_iter().find(|p| &p.id == id),
            None => photos.into_iter().find(|p| p.primary),
        };
        cover.map(|p| Photo { primary: true, ..p })
    }

    fn info(&self) -> PostInfo {
        PostInfo {
            description: self.description.clone(),
            created_on: self.created_on,
            updated_on: self.updated_on,
            photo_count: self.photos.len(),
            cover_photo: self.cover_photo(),
            video: self.video.clone(),
            feature: self.feature,
            big_thumb_url: self.big_thumb_url.clone(),
            small_thumb_url: self.small_thumb_url.clone(),
        }
    }
}

/// Serves a [`Snapshot`] as post, map and video provider.
#[derive(Debug, Default)]
pub struct SnapshotProvider {
    snapshot: RwLock<Snapshot>,
}

impl SnapshotProvider {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        Ok(Self::new(Snapshot::from_file(path)?))
    }

    /// Serve a different snapshot from now on. The blog picks it up on its
    /// next load.
    pub fn replace(&self, snapshot: Snapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, post_id: &str) -> Result<PostRecord, ProviderError> {
        self.read()
            .record(post_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("post {post_id}")))
    }
}

/// Run one load cycle over the snapshot. Posts already in the blog are
/// reused so loaded details survive a reload.
fn populate(blog: &mut PhotoBlog, snapshot: &Snapshot) {
    let separator = blog.config().subtitle_separator.clone();

    blog.begin_load();
    for record in &snapshot.posts {
        let post = match blog.post_with_id(&record.id) {
            Some(cached) => {
                let mut post = cached.clone();
                if post.original_title != record.title {
                    post.infer_title_and_key(&record.title, &separator);
                }
                post.chronological = record.chronological;
                post.categories.clear();
                post
            }
            None => record.to_post(&separator),
        };
        blog.add_post(post);
    }

    blog.clear_categories();
    for record in &snapshot.categories {
        let category = build_category(blog, record);
        blog.add_category(category);
    }
    blog.set_tags(snapshot.tags.clone());
    blog.finish_load();
}

fn build_category(blog: &mut PhotoBlog, record: &CategoryRecord) -> Category {
    let key = record.key.clone().unwrap_or_else(|| slug(&record.title));
    let mut category = Category::new(key, record.title.clone());
    for id in &record.posts {
        if !blog.categorize(&mut category, id) {
            debug!(category = %category.key, post = %id, "category lists unknown post");
        }
    }
    for sub in &record.subcategories {
        let child = build_category(blog, sub);
        blog.nest_category(&mut category, child);
    }
    category
}

#[async_trait]
impl PostProvider for SnapshotProvider {
    async fn photo_blog(&self, blog: &mut PhotoBlog) -> Result<(), ProviderError> {
        let snapshot = self.read().clone();
        debug!(posts = snapshot.posts.len(), "loading snapshot");
        populate(blog, &snapshot);
        Ok(())
    }

    async fn exif(&self, photo_id: &str) -> Result<Exif, ProviderError> {
        self.read()
            .exif
            .get(photo_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("EXIF for photo {photo_id}")))
    }

    async fn post_id_with_photo_id(&self, photo_id: &str) -> Result<Option<String>, ProviderError> {
        Ok(self
            .read()
            .posts
            .iter()
            .find(|r| r.photos.iter().any(|p| p.id == photo_id))
            .map(|r| r.id.clone()))
    }

    async fn photos_with_tags(&self, tags: &[String]) -> Result<Vec<Photo>, ProviderError> {
        let snapshot = self.read();
        let mut seen = HashSet::new();
        let mut photos = Vec::new();
        for record in &snapshot.posts {
            for photo in record.indexed_photos() {
                if tags.iter().any(|t| photo.tags.contains(t)) && seen.insert(photo.id.clone()) {
                    photos.push(photo);
                }
            }
        }
        Ok(photos)
    }

    async fn post_info(&self, post: &Post) -> Result<PostInfo, ProviderError> {
        Ok(self.record(&post.id)?.info())
    }

    async fn post_photos(&self, post: &Post) -> Result<Vec<Photo>, ProviderError> {
        Ok(self.record(&post.id)?.indexed_photos())
    }
}

#[async_trait]
impl MapProvider for SnapshotProvider {
    async fn track(&self, post_key: &str) -> Result<Option<FeatureCollection>, ProviderError> {
        Ok(self.read().tracks.get(post_key).cloned())
    }

    async fn gpx(&self, post_key: &str, out: &mut (dyn Write + Send)) -> Result<(), ProviderError> {
        let track = self
            .read()
            .tracks
            .get(post_key)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("track for {post_key}")))?;
        track.write_gpx(post_key, out)?;
        Ok(())
    }
}

#[async_trait]
impl VideoProvider for SnapshotProvider {
    async fn video_info(&self, post: &Post) -> Result<Option<VideoInfo>, ProviderError> {
        Ok(self.record(&post.id)?.video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlogConfig, PostSort};
    use crate::provider::Providers;
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "tags": { "bike": "Bicycle" },
        "categories": [
            {
                "title": "When",
                "subcategories": [
                    { "title": "2016", "posts": ["3", "2", "1"] },
                    { "title": "2015", "posts": ["4"] }
                ]
            },
            { "title": "What", "key": "what", "posts": ["1", "99"] }
        ],
        "posts": [
            { "id": "4", "title": "Spring Ride" },
            {
                "id": "3",
                "title": "Brother Ride: Day 2",
                "description": "Into the hills",
                "cover_photo": "p3b",
                "photos": [
                    { "id": "p3a", "tags": ["bike"], "latitude": 43.5, "longitude": -116.2 },
                    { "id": "p3b" }
                ]
            },
            {
                "id": "2",
                "title": "Brother Ride: Day 1",
                "video": { "id": "v2", "width": 640, "height": 360 },
                "photos": [ { "id": "p2a", "primary": true, "tags": ["bike", "camp"] } ]
            },
            { "id": "1", "title": "Highlights", "chronological": false }
        ],
        "tracks": {
            "brother-ride": {
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": { "type": "LineString", "coordinates": [[-116.0, 43.0], [-116.1, 43.1]] }
                    }
                ]
            }
        },
        "exif": { "p3a": { "artist": "Jane Doe", "iso": 200 } }
    }"#;

    fn snapshot() -> Snapshot {
        Snapshot::from_json(SNAPSHOT).unwrap()
    }

    fn loaded(provider: Arc<SnapshotProvider>) -> PhotoBlog {
        let config = BlogConfig {
            provider_post_sort: PostSort::NewestFirst,
            ..Default::default()
        };
        let mut blog = PhotoBlog::new(config, Providers::from_provider(provider.clone()));
        populate(&mut blog, &provider.read());
        blog
    }

    #[test]
    fn parses_snapshot_with_defaults() {
        let snapshot = snapshot();
        assert_eq!(snapshot.posts.len(), 4);
        assert!(snapshot.posts[0].chronological);
        assert!(!snapshot.posts[3].chronological);
        assert_eq!(snapshot.categories[0].key, None);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Snapshot::from_json(r#"{ "postz": [] }"#).unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }

    #[test]
    fn loads_posts_series_and_categories() {
        let blog = loaded(Arc::new(SnapshotProvider::new(snapshot())));

        assert_eq!(
            blog.post_keys(),
            ["spring-ride", "brother-ride/day-2", "brother-ride", "highlights"]
        );
        let year = blog.category_with_key("when/2016").unwrap();
        assert_eq!(year.posts.len(), 3);
        assert!(blog.category_with_key("when/2015").unwrap().posts.contains("4"));
        assert!(blog.category_with_key("what").unwrap().posts.contains("1"));

        let day_one = blog.post_with_id("2").unwrap();
        assert_eq!(
            day_one.categories.keys().collect::<Vec<_>>(),
            ["when/2016"]
        );
        assert_eq!(blog.tags().get("bike").map(String::as_str), Some("Bicycle"));
    }

    #[tokio::test]
    async fn serves_post_details() {
        let provider = Arc::new(SnapshotProvider::new(snapshot()));
        let mut blog = loaded(provider);

        let post = blog.post_info("3").await.unwrap().unwrap();
        assert_eq!(post.description.as_deref(), Some("Into the hills"));
        assert_eq!(post.photo_count, 2);
        assert_eq!(post.cover_photo.as_ref().unwrap().id, "p3b");

        let photos = blog.post_photos("2").await.unwrap().unwrap();
        assert_eq!(photos[0].tag_list(), "Bicycle");
        let post = blog.post_with_id("2").unwrap();
        assert_eq!(post.photo_tag_list.as_deref(), Some("Bicycle"));
    }

    #[tokio::test]
    async fn cover_defaults_to_primary_photo() {
        let provider = SnapshotProvider::new(snapshot());
        let post = Post::new("2", "Brother Ride: Day 1", ":");
        let info = provider.post_info(&post).await.unwrap();
        assert_eq!(info.cover_photo.unwrap().id, "p2a");
        assert_eq!(info.video, Some(VideoInfo::new("v2", 640, 360)));
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let provider = SnapshotProvider::new(snapshot());
        let post = Post::new("404", "Missing", ":");
        let err = provider.post_info(&post).await.unwrap_err();
        assert_eq!(err.to_string(), "post 404 not found");
    }

    #[tokio::test]
    async fn finds_photos_by_id_and_tag() {
        let provider = SnapshotProvider::new(snapshot());
        assert_eq!(
            provider.post_id_with_photo_id("p3b").await.unwrap().as_deref(),
            Some("3")
        );
        assert_eq!(provider.post_id_with_photo_id("nope").await.unwrap(), None);

        let photos = provider.photos_with_tags(&["bike".to_string()]).await.unwrap();
        let ids: Vec<_> = photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["p3a", "p2a"]);
    }

    #[tokio::test]
    async fn serves_exif() {
        let provider = SnapshotProvider::new(snapshot());
        assert_eq!(provider.exif("p3a").await.unwrap().iso, 200);
        assert!(provider.exif("p3b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn series_start_gets_series_track() {
        let provider = Arc::new(SnapshotProvider::new(snapshot()));
        let mut blog = loaded(provider);

        let start = blog.post_geo_json("2").await.unwrap().unwrap();
        assert_eq!(start.features.len(), 1);
        assert!(blog.post_with_id("2").unwrap().has_track);

        let mut out = Vec::new();
        blog.post_gpx("3", &mut out).await.unwrap();
        assert!(out.is_empty());
        assert!(!blog.post_with_id("3").unwrap().has_track);

        blog.post_gpx("2", &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("<name>brother-ride</name>"));
    }

    #[test]
    fn reload_reports_new_posts() {
        let provider = Arc::new(SnapshotProvider::new(snapshot()));
        let mut blog = loaded(provider.clone());

        let mut next = snapshot();
        // older than "Spring Ride", continuing the series
        next.posts.insert(
            1,
            PostRecord {
                id: "5".into(),
                title: "Brother Ride: Day 3".into(),
                ..Default::default()
            },
        );
        provider.replace(next);
        populate(&mut blog, &provider.read());

        assert_eq!(blog.post_count(), 5);
        assert_eq!(
            blog.changed_keys(),
            ["brother-ride/day-3", "spring-ride", "brother-ride/day-2"]
        );
        assert_eq!(blog.post_with_id("3").unwrap().total_parts, 3);
    }

    #[test]
    fn reload_keeps_loaded_details() {
        let provider = Arc::new(SnapshotProvider::new(snapshot()));
        let mut blog = loaded(provider.clone());
        if let Some(post) = blog.post_with_id_mut("4") {
            post.description = Some("kept".into());
            post.info_loaded = true;
        }
        populate(&mut blog, &provider.read());

        let post = blog.post_with_id("4").unwrap();
        assert_eq!(post.description.as_deref(), Some("kept"));
        assert!(blog.category_with_key("when/2015").unwrap().posts.contains("4"));
        assert_eq!(
            post.categories.keys().collect::<Vec<_>>(),
            ["when/2015"]
        );
    }
}
