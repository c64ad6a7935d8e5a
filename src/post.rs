//! Blog posts.
//!
//! A post is usually a photo album. Its raw title can name a series part,
//! `"Series Name: Part Name"`, in which case the post carries both a series
//! key and a part key:
//!
//! ```text
//! original_title  "Brother Ride 2015: Day 1"
//! title           "Brother Ride 2015"
//! sub_title       "Day 1"
//! key             "brother-ride-2015/day-1"
//! ```
//!
//! Whether it really *is* a series part is decided later by the blog, which
//! groups adjacent posts sharing a title (see
//! [`PhotoBlog::correlate_posts`](crate::blog::PhotoBlog::correlate_posts)).
//! The first part of a series is keyed by the series alone so that the series
//! URL lands on it.
//!
//! Neighbours are held as post IDs: `next` is the newer post and `previous`
//! the older one. The blog owns all posts; see [`PostMap`].
//!
//! Details beyond the post list (description, photos, dates) come from the
//! post provider on first request and are kept until [`Post::empty`] or a
//! blog reload.

use crate::config::SERIES_KEY_SEPARATOR;
use crate::geo::{self, Bounds, FeatureCollection, Location};
use crate::media::VideoInfo;
use crate::photo::{Photo, identify_outliers};
use crate::provider::{MapProvider, PostProvider, ProviderError, VideoProvider};
use crate::slug::slug;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use tracing::{debug, warn};

/// Post store keyed by post ID.
pub type PostMap = HashMap<String, Post>;

/// Photos skipped at the start of a long post's map summary. Leading photos
/// are usually scenery shots taken before the trip proper.
const SKIPPED_LEADING_PHOTOS: usize = 5;

/// Post details the post list doesn't carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostInfo {
    pub description: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub photo_count: usize,
    pub cover_photo: Option<Photo>,
    pub video: Option<VideoInfo>,
    pub feature: bool,
    pub big_thumb_url: Option<String>,
    pub small_thumb_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub key: String,
    pub title: String,
    pub sub_title: Option<String>,
    /// Title as supplied by the provider, before any series split.
    pub original_title: String,
    pub description: Option<String>,
    /// Description with photo and video counts appended.
    pub long_description: Option<String>,

    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    /// Earliest photo date, ignoring outliers.
    pub happened_on: Option<DateTime<Utc>>,
    /// Whether the post takes part in the newer/older chain. Highlight albums
    /// and similar collections don't.
    pub chronological: bool,
    pub feature: bool,

    pub series_key: Option<String>,
    pub part_key: Option<String>,
    /// 1-based position in the series, 0 when not in one.
    pub part: usize,
    pub total_parts: usize,
    pub is_partial: bool,
    pub is_series_start: bool,
    pub previous_is_part: bool,
    pub next_is_part: bool,

    /// ID of the next newer post.
    pub next: Option<String>,
    /// ID of the next older post.
    pub previous: Option<String>,

    /// Category key → category title.
    pub categories: BTreeMap<String, String>,

    pub big_thumb_url: Option<String>,
    pub small_thumb_url: Option<String>,
    pub photos: Vec<Photo>,
    pub photo_count: usize,
    pub cover_photo: Option<Photo>,
    /// Full tag names of all photos, comma-separated.
    pub photo_tag_list: Option<String>,
    pub photo_locations: Option<Vec<Location>>,
    pub bounds: Option<Bounds>,
    pub centroid: Option<Location>,
    pub video: Option<VideoInfo>,

    pub info_loaded: bool,
    pub photos_loaded: bool,
    pub tried_track: bool,
    pub has_track: bool,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            key: String::new(),
            title: String::new(),
            sub_title: None,
            original_title: String::new(),
            description: None,
            long_description: None,
            created_on: None,
            updated_on: None,
            happened_on: None,
            chronological: true,
            feature: false,
            series_key: None,
            part_key: None,
            part: 0,
            total_parts: 0,
            is_partial: false,
            is_series_start: false,
            previous_is_part: false,
            next_is_part: false,
            next: None,
            previous: None,
            categories: BTreeMap::new(),
            big_thumb_url: None,
            small_thumb_url: None,
            photos: Vec::new(),
            photo_count: 0,
            cover_photo: None,
            photo_tag_list: None,
            photo_locations: None,
            bounds: None,
            centroid: None,
            video: None,
            info_loaded: false,
            photos_loaded: false,
            tried_track: false,
            has_track: false,
        }
    }
}

impl Post {
    pub fn new(id: impl Into<String>, title: &str, separator: &str) -> Self {
        let mut post = Post {
            id: id.into(),
            ..Default::default()
        };
        post.infer_title_and_key(title, separator);
        post
    }

    /// Split `title` into title and subtitle at `separator` and derive the keys.
    pub fn infer_title_and_key(&mut self, title: &str, separator: &str) -> &mut Self {
        self.original_title = title.to_string();

        let split = title
            .split_once(separator)
            .map(|(head, rest)| (head.trim_end(), rest.trim()))
            .filter(|(_, sub)| !sub.is_empty());

        match split {
            Some((head, sub)) => {
                let series_key = slug(head);
                let part_key = slug(sub);
                self.title = head.to_string();
                self.sub_title = Some(sub.to_string());
                self.key = compound_key(&series_key, &part_key);
                self.series_key = Some(series_key);
                self.part_key = Some(part_key);
            }
            None => {
                self.title = title.to_string();
                self.sub_title = None;
                self.series_key = None;
                self.part_key = None;
                self.key = slug(title);
            }
        }
        self
    }

    /// Whether the post matches the key, either exactly or by its compound
    /// `series/part` key (series starts are keyed by the series alone).
    pub fn has_key(&self, key: &str) -> bool {
        if self.key == key {
            return true;
        }
        match (&self.series_key, &self.part_key) {
            (Some(series), Some(part)) => compound_key(series, part) == key,
            _ => false,
        }
    }

    /// First post in a series: keyed by the series so the series URL finds it.
    pub fn make_series_start(&mut self) -> &mut Self {
        self.is_series_start = true;
        if let Some(series_key) = &self.series_key {
            self.key = series_key.clone();
        }
        self
    }

    /// Set position within a series of `total` posts.
    pub fn assign_part(&mut self, part: usize, total: usize) -> &mut Self {
        self.part = part;
        self.total_parts = total;
        self.is_partial = true;
        self.previous_is_part = part > 1;
        self.next_is_part = part < total;
        self
    }

    /// Undo a series split: the post turned out not to be part of a series.
    pub fn ungroup(&mut self) -> &mut Self {
        self.title = self.original_title.clone();
        self.sub_title = None;
        self.series_key = None;
        self.part_key = None;
        self.key = slug(&self.original_title);
        self.clear_series();
        self
    }

    /// Return to the state right after construction, ready for relinking and
    /// correlation on a new load.
    pub fn reset(&mut self, separator: &str) -> &mut Self {
        let title = self.original_title.clone();
        self.infer_title_and_key(&title, separator);
        self.next = None;
        self.previous = None;
        self.clear_series();
        self
    }

    fn clear_series(&mut self) {
        self.part = 0;
        self.total_parts = 0;
        self.is_partial = false;
        self.is_series_start = false;
        self.previous_is_part = false;
        self.next_is_part = false;
    }

    /// Drop loaded details so the next request reloads them.
    pub fn empty(&mut self) -> &mut Self {
        self.description = None;
        self.long_description = None;
        self.created_on = None;
        self.updated_on = None;
        self.happened_on = None;
        self.photos.clear();
        self.photo_count = 0;
        self.cover_photo = None;
        self.photo_tag_list = None;
        self.photo_locations = None;
        self.bounds = None;
        self.centroid = None;
        self.video = None;
        self.info_loaded = false;
        self.photos_loaded = false;
        self.tried_track = false;
        self.has_track = false;
        self
    }

    /// Display title, including the part name for series members.
    pub fn name(&self, separator: &str) -> String {
        match (&self.sub_title, self.is_partial) {
            (Some(sub), true) => format!("{}{} {}", self.title, separator, sub),
            _ => self.title.clone(),
        }
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn apply_info(&mut self, info: PostInfo) -> &mut Self {
        self.description = info.description;
        self.created_on = info.created_on;
        self.updated_on = info.updated_on;
        if !self.photos_loaded {
            self.photo_count = info.photo_count;
        }
        self.cover_photo = info.cover_photo;
        if info.video.is_some() {
            self.video = info.video;
        }
        self.feature = info.feature;
        if info.big_thumb_url.is_some() {
            self.big_thumb_url = info.big_thumb_url;
        }
        if info.small_thumb_url.is_some() {
            self.small_thumb_url = info.small_thumb_url;
        }
        self.info_loaded = true;
        self.update_long_description();
        self
    }

    /// Take photos from the provider: flag date outliers, derive the
    /// happened-on date and the map summary.
    pub fn apply_photos(&mut self, mut photos: Vec<Photo>, max_markers: usize) -> &mut Self {
        identify_outliers(&mut photos);
        self.happened_on = photos
            .iter()
            .filter(|p| !p.outlier_date)
            .filter_map(|p| p.date_taken)
            .min();
        self.photo_count = photos.len();
        self.photos = photos;
        self.photos_loaded = true;
        self.update_photo_locations(max_markers);
        self.update_long_description();
        self
    }

    fn update_long_description(&mut self) {
        self.long_description = self.description.as_ref().map(|d| {
            let video = match &self.video {
                Some(v) if !v.is_empty() => " and video",
                _ => "",
            };
            format!("{d} ({} photos{video})", self.photo_count)
        });
    }

    /// Record the photo coordinates for the post's map, with their bounds and
    /// centroid. Photos without a positive latitude are left off.
    pub fn update_photo_locations(&mut self, max_markers: usize) -> &mut Self {
        let mut start = 1;
        let mut total = self.photos.len();
        if total > max_markers {
            start = SKIPPED_LEADING_PHOTOS;
            total = (max_markers + SKIPPED_LEADING_PHOTOS).min(total);
        }

        let mut locations: Vec<Location> = Vec::new();
        let mut bounds = Bounds::default();

        for photo in self.photos.iter().take(total).skip(start) {
            if photo.latitude <= 0.0 {
                continue;
            }
            let lon = geo::round_coordinate(photo.longitude);
            let lat = geo::round_coordinate(photo.latitude);
            locations.push([lon, lat]);

            // zero marks an unset bound
            if bounds.sw[1] == 0.0 || lat < bounds.sw[1] {
                bounds.sw[1] = lat;
            }
            if bounds.sw[0] == 0.0 || lon < bounds.sw[0] {
                bounds.sw[0] = lon;
            }
            if bounds.ne[1] == 0.0 || lat > bounds.ne[1] {
                bounds.ne[1] = lat;
            }
            if bounds.ne[0] == 0.0 || lon > bounds.ne[0] {
                bounds.ne[0] = lon;
            }
        }

        self.centroid = geo::centroid(&locations);
        if locations.is_empty() {
            self.photo_locations = None;
            self.bounds = None;
        } else {
            self.photo_locations = Some(locations);
            self.bounds = Some(bounds);
        }
        self
    }

    /// Post details, fetched from the provider on first call.
    pub async fn get_info(&mut self, provider: &dyn PostProvider) -> Result<&Post, ProviderError> {
        if !self.info_loaded {
            debug!(key = %self.key, "loading post info");
            let info = provider.post_info(self).await?;
            self.apply_info(info);
        }
        Ok(&*self)
    }

    /// Post photos, fetched from the provider on first call.
    pub async fn get_photos(
        &mut self,
        provider: &dyn PostProvider,
        max_markers: usize,
    ) -> Result<&[Photo], ProviderError> {
        if !self.photos_loaded {
            debug!(key = %self.key, "loading post photos");
            let photos = provider.post_photos(self).await?;
            self.apply_photos(photos, max_markers);
        }
        Ok(self.photos.as_slice())
    }

    /// Embedded video, fetched from the provider when the post info didn't
    /// include one.
    pub async fn get_video(
        &mut self,
        provider: &dyn VideoProvider,
    ) -> Result<Option<&VideoInfo>, ProviderError> {
        if self.video.is_none() {
            debug!(key = %self.key, "loading post video");
            self.video = provider.video_info(self).await?;
            self.update_long_description();
        }
        Ok(self.video.as_ref())
    }

    /// GPS track plus photo points. The track is only requested until the
    /// map provider reports that the post has none.
    pub async fn geo_json(
        &mut self,
        map: &dyn MapProvider,
    ) -> Result<FeatureCollection, ProviderError> {
        let mut collection = None;

        if !self.tried_track || self.has_track {
            match map.track(&self.key).await {
                Ok(track) => collection = track,
                Err(e) if e.is_not_found() => {
                    warn!(key = %self.key, "no track: {e}");
                }
                Err(e) => return Err(e),
            }
            self.tried_track = true;
            self.has_track = collection.is_some();
        }

        let mut collection = collection.unwrap_or_default();
        let part_key = self.part_key.as_deref();
        collection
            .features
            .extend(self.photos.iter().map(|p| p.post_geo_json(part_key)));
        Ok(collection)
    }

    /// Write the post's GPS track as GPX. A post without a track writes
    /// nothing.
    pub async fn gpx(
        &mut self,
        map: &dyn MapProvider,
        out: &mut (dyn Write + Send),
    ) -> Result<(), ProviderError> {
        if self.tried_track && !self.has_track {
            return Ok(());
        }
        match map.gpx(&self.key, out).await {
            Ok(()) => {
                self.tried_track = true;
                self.has_track = true;
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(key = %self.key, "no track: {e}");
                self.tried_track = true;
                self.has_track = false;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn compound_key(series: &str, part: &str) -> String {
    format!("{series}{SERIES_KEY_SEPARATOR}{part}")
}
