//! Shared test utilities for the photo-blog test suite.
//!
//! Provides the standard mock posts, a blog loaded with them and a mock
//! provider that counts its calls.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let blog = mock_blog(PostSort::OldestFirst);
//! assert_eq!(blog.post_with_key("series-1", None).unwrap().id, "1");
//!
//! let provider = MockProvider::default();
//! post.get_info(&provider).await.unwrap();
//! assert_eq!(provider.post_info_calls.load(Ordering::SeqCst), 1);
//! ```
//!
//! The mock posts, oldest first:
//!
//! | ID | Title | Notes |
//! |---|---|---|
//! | 1 | Series 1: Part 1 | |
//! | 2 | Series 1: Part 2 | |
//! | 3 | Series 1: Part 3 | |
//! | 4 | Title 4 | no categories |
//! | 5 | Not a Series: Subtitle | |
//! | 6 | Highlights | not chronological |

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::blog::PhotoBlog;
use crate::category::Category;
use crate::config::{BlogConfig, PostSort};
use crate::geo::FeatureCollection;
use crate::media::{Exif, PhotoSize, VideoInfo};
use crate::photo::Photo;
use crate::post::{Post, PostInfo};
use crate::provider::{MapProvider, PostProvider, ProviderError, Providers, VideoProvider};

// =========================================================================
// Fixtures
// =========================================================================

pub fn mock_posts() -> Vec<Post> {
    let mut posts: Vec<Post> = [
        "Series 1: Part 1",
        "Series 1: Part 2",
        "Series 1: Part 3",
        "Title 4",
        "Not a Series: Subtitle",
        "Highlights",
    ]
    .iter()
    .enumerate()
    .map(|(i, title)| Post::new((i + 1).to_string(), title, ":"))
    .collect();
    posts[5].chronological = false;
    posts
}

fn tags(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Three photos an hour apart. The last has no location.
pub fn mock_photos() -> Vec<Photo> {
    let start = Utc.with_ymd_and_hms(2016, 5, 1, 12, 0, 0).unwrap();
    vec![
        Photo {
            title: Some("Photo 1".into()),
            tags: tags(&["tag1", "tag2", "tag3"]),
            latitude: 43.0,
            longitude: -116.0,
            date_taken: Some(start),
            primary: true,
            preview: Some(PhotoSize::new(320, 240, "url1")),
            ..Photo::new("photo-1", 0)
        },
        Photo {
            title: Some("Photo 2".into()),
            tags: tags(&["tag2", "tag4"]),
            latitude: 44.0,
            longitude: -115.0,
            date_taken: Some(start + Duration::hours(1)),
            preview: Some(PhotoSize::new(320, 240, "url2")),
            ..Photo::new("photo-2", 1)
        },
        Photo {
            title: Some("Photo 3".into()),
            date_taken: Some(start + Duration::hours(2)),
            ..Photo::new("photo-3", 2)
        },
    ]
}

/// Blog with a completed load of `posts`, in the given provider order.
pub fn blog_with(sort: PostSort, posts: Vec<Post>) -> PhotoBlog {
    let config = BlogConfig {
        provider_post_sort: sort,
        ..Default::default()
    };
    blog_with_config(config, posts)
}

pub fn blog_with_config(config: BlogConfig, posts: Vec<Post>) -> PhotoBlog {
    let mut blog = PhotoBlog::new(config, Providers::new());
    blog.add_all(posts);
    blog
}

/// Blog loaded with [`mock_posts`] (supplied oldest first when `sort` says
/// so) and categorised:
///
/// ```text
/// what
/// └── what/bicycle   1, 2, 3, 5
/// when
/// ├── when/2015      5
/// └── when/2016      1, 2, 3
/// ```
pub fn mock_blog(sort: PostSort) -> PhotoBlog {
    let mut posts = mock_posts();
    if sort == PostSort::NewestFirst {
        posts.reverse();
    }
    let mut blog = blog_with(sort, posts);

    let mut y2015 = Category::new("2015", "2015");
    blog.categorize(&mut y2015, "5");
    let mut y2016 = Category::new("2016", "2016");
    for id in ["1", "2", "3"] {
        blog.categorize(&mut y2016, id);
    }
    let mut when = Category::new("when", "When");
    blog.nest_category(&mut when, y2015);
    blog.nest_category(&mut when, y2016);

    let mut bicycle = Category::new("bicycle", "Bicycle");
    for id in ["1", "2", "3", "5"] {
        blog.categorize(&mut bicycle, id);
    }
    let mut what = Category::new("what", "What");
    blog.nest_category(&mut what, bicycle);

    blog.add_category(when);
    blog.add_category(what);
    blog
}

// =========================================================================
// Mock provider
// =========================================================================

/// Provider serving the mock posts and photos, counting every request.
#[derive(Default)]
pub struct MockProvider {
    pub load_calls: AtomicUsize,
    pub post_info_calls: AtomicUsize,
    pub post_photos_calls: AtomicUsize,
    pub exif_calls: AtomicUsize,
    /// Calls to `track` and `gpx`.
    pub track_calls: AtomicUsize,
    /// Track served for every post.
    pub track: Option<FeatureCollection>,
    pub track_not_found: bool,
    pub fail_exif: bool,
    /// Fail info, photo and track requests.
    pub fail_requests: bool,
}

impl MockProvider {
    fn check(&self) -> Result<(), ProviderError> {
        if self.fail_requests {
            Err(ProviderError::Request("service unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PostProvider for MockProvider {
    async fn photo_blog(&self, blog: &mut PhotoBlog) -> Result<(), ProviderError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        blog.add_all(mock_posts());
        Ok(())
    }

    async fn exif(&self, photo_id: &str) -> Result<Exif, ProviderError> {
        self.exif_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exif {
            return Err(ProviderError::NotFound(format!("EXIF for photo {photo_id}")));
        }
        Ok(Exif {
            artist: format!("Artist for {photo_id}"),
            iso: 400,
            ..Default::default()
        })
    }

    async fn post_id_with_photo_id(&self, photo_id: &str) -> Result<Option<String>, ProviderError> {
        let found = mock_photos().iter().any(|p| p.id == photo_id);
        Ok(found.then(|| "1".to_string()))
    }

    async fn photos_with_tags(&self, tags: &[String]) -> Result<Vec<Photo>, ProviderError> {
        Ok(mock_photos()
            .into_iter()
            .filter(|p| tags.iter().any(|t| p.tags.contains(t)))
            .collect())
    }

    async fn post_info(&self, post: &Post) -> Result<PostInfo, ProviderError> {
        self.post_info_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(PostInfo {
            description: Some(format!("Description of {}", post.original_title)),
            created_on: Utc.with_ymd_and_hms(2016, 5, 2, 8, 0, 0).single(),
            updated_on: Utc.with_ymd_and_hms(2016, 5, 3, 8, 0, 0).single(),
            photo_count: 3,
            cover_photo: mock_photos().into_iter().next(),
            ..Default::default()
        })
    }

    async fn post_photos(&self, _post: &Post) -> Result<Vec<Photo>, ProviderError> {
        self.post_photos_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(mock_photos())
    }
}

#[async_trait]
impl MapProvider for MockProvider {
    async fn track(&self, post_key: &str) -> Result<Option<FeatureCollection>, ProviderError> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if self.track_not_found {
            return Err(ProviderError::NotFound(format!("track for {post_key}")));
        }
        Ok(self.track.clone())
    }

    async fn gpx(&self, post_key: &str, out: &mut (dyn Write + Send)) -> Result<(), ProviderError> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        match &self.track {
            Some(track) if !self.track_not_found => Ok(track.write_gpx(post_key, out)?),
            _ => Err(ProviderError::NotFound(format!("track for {post_key}"))),
        }
    }
}

#[async_trait]
impl VideoProvider for MockProvider {
    async fn video_info(&self, _post: &Post) -> Result<Option<VideoInfo>, ProviderError> {
        Ok(Some(VideoInfo::new("video-1", 640, 480)))
    }
}
