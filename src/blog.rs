//! The photo blog: post store, load lifecycle and series correlation.
//!
//! ## Load Lifecycle
//!
//! The post provider fills the blog in one cycle. The blog may be reloaded
//! at any time, so a load starts from whatever the previous load left:
//!
//! ```text
//!            begin_load                 add_post* / finish_load
//! Empty ───────────────▶ Loading ───────────────────────────────▶ Loaded
//!                          ▲                                        │
//!                          └──────────────── begin_load ────────────┘
//! ```
//!
//! - `begin_load` remembers the current post keys, resets every post and
//!   parks their IDs in a cache so lookups still work while loading.
//! - `add_post` places each post at the head or tail of the sequence,
//!   depending on the provider's sort order, and links it to its neighbour.
//! - `finish_load` groups series parts, records which keys are new since the
//!   last load and drops posts the provider no longer lists.
//!
//! Posts are always stored newest-first. `next` on a post is the newer
//! neighbour, `previous` the older one.
//!
//! ## Series
//!
//! A run of adjacent posts sharing a title (`"Brother Ride: Day 1"`,
//! `"Brother Ride: Day 2"`, ...) is a series. See [`PhotoBlog::correlate_posts`].
//!
//! ## Instance
//!
//! One blog exists per process. [`init`] creates it behind a
//! [`tokio::sync::Mutex`]; holding the lock serialises load steps.

use crate::category::Category;
use crate::config::{BlogConfig, ConfigError, PostSort, SERIES_KEY_SEPARATOR};
use crate::geo::FeatureCollection;
use crate::media::{Exif, VideoInfo};
use crate::photo::Photo;
use crate::post::{Post, PostMap};
use crate::provider::{Capability, ProviderError, Providers};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("photo blog instance already exists")]
    AlreadyExists,
    #[error("{0} provider is not configured")]
    MissingProvider(Capability),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

static BLOG: OnceLock<Mutex<PhotoBlog>> = OnceLock::new();

/// Create the process-wide blog. Fails if it already exists.
pub fn init(config: BlogConfig, providers: Providers) -> Result<&'static Mutex<PhotoBlog>, BlogError> {
    config.validate()?;
    let mut created = false;
    let blog = BLOG.get_or_init(|| {
        created = true;
        Mutex::new(PhotoBlog::new(config, providers))
    });
    if created {
        Ok(blog)
    } else {
        Err(BlogError::AlreadyExists)
    }
}

/// The process-wide blog, if [`init`] has run.
pub fn instance() -> Option<&'static Mutex<PhotoBlog>> {
    BLOG.get()
}

#[derive(Debug)]
pub struct PhotoBlog {
    config: BlogConfig,
    providers: Providers,
    /// Root categories by key.
    categories: BTreeMap<String, Category>,
    /// Post IDs, newest first.
    posts: Vec<String>,
    store: PostMap,
    /// Tag slug → full tag name.
    tags: BTreeMap<String, String>,
    loaded: bool,
    is_loading: bool,
    post_info_loaded: bool,
    /// Keys affected by posts that are new since the previous load.
    changed_keys: Vec<String>,
    /// Post IDs from the previous load, usable for lookups while loading.
    post_cache: Vec<String>,
    had_post_keys: Vec<String>,
    /// Oldest-first provider: insert posts at the head.
    insert_at_head: bool,
}

impl PhotoBlog {
    pub(crate) fn new(config: BlogConfig, providers: Providers) -> Self {
        Self {
            config,
            providers,
            categories: BTreeMap::new(),
            posts: Vec::new(),
            store: PostMap::new(),
            tags: BTreeMap::new(),
            loaded: false,
            is_loading: false,
            post_info_loaded: false,
            changed_keys: Vec::new(),
            post_cache: Vec::new(),
            had_post_keys: Vec::new(),
            insert_at_head: false,
        }
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn post_info_loaded(&self) -> bool {
        self.post_info_loaded
    }

    /// Keys of posts new in the last load, their categories and neighbours.
    pub fn changed_keys(&self) -> &[String] {
        &self.changed_keys
    }

    /// Posts, newest first.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.posts.iter().filter_map(|id| self.store.get(id))
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn post_keys(&self) -> Vec<String> {
        self.posts().map(|p| p.key.clone()).collect()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: BTreeMap<String, String>) -> &mut Self {
        self.tags = tags;
        self
    }

    // ---- loading ---------------------------------------------------------

    /// Load posts from the post provider. Does nothing if already loaded,
    /// unless `empty_if_loaded` asks for a fresh start.
    pub async fn load(&mut self, empty_if_loaded: bool) -> Result<&mut Self, BlogError> {
        let provider = self.providers.post()?;
        if self.loaded {
            if !empty_if_loaded {
                return Ok(self);
            }
            self.empty();
        }
        provider.photo_blog(self).await?;
        Ok(self)
    }

    /// Remove all posts, categories and tags.
    pub fn empty(&mut self) -> &mut Self {
        self.categories.clear();
        self.posts.clear();
        self.store.clear();
        self.tags.clear();
        self.loaded = false;
        self.post_info_loaded = false;
        self
    }

    /// Start a load cycle. Existing posts stay reachable by ID and key until
    /// [`finish_load`](Self::finish_load).
    pub fn begin_load(&mut self) -> &mut Self {
        self.is_loading = true;
        self.had_post_keys = self.post_keys();
        for id in &self.posts {
            if let Some(post) = self.store.get_mut(id) {
                post.reset(&self.config.subtitle_separator);
            }
        }
        self.post_cache = std::mem::take(&mut self.posts);
        self.insert_at_head = self.config.provider_post_sort == PostSort::OldestFirst;
        debug!(cached = self.post_cache.len(), "load started");
        self
    }

    /// Add a post in provider order and link it to its chronological
    /// neighbour. A post already in the sequence is ignored.
    pub fn add_post(&mut self, mut post: Post) -> &mut Self {
        if self.posts.contains(&post.id) {
            return self;
        }
        let id = post.id.clone();
        post.next = None;
        post.previous = None;

        let neighbour = if self.insert_at_head {
            self.posts.first()
        } else {
            self.posts.last()
        };
        let neighbour = neighbour
            .and_then(|n| self.store.get_mut(n))
            .filter(|n| n.chronological && post.chronological);
        if let Some(neighbour) = neighbour {
            if self.insert_at_head {
                // each new post is newer than the ones already added
                post.previous = Some(neighbour.id.clone());
                neighbour.next = Some(id.clone());
            } else {
                post.next = Some(neighbour.id.clone());
                neighbour.previous = Some(id.clone());
            }
        }

        let cache = self.is_loading && !self.post_cache.contains(&id);
        if self.insert_at_head {
            self.posts.insert(0, id.clone());
            if cache {
                self.post_cache.insert(0, id.clone());
            }
        } else {
            self.posts.push(id.clone());
            if cache {
                self.post_cache.push(id.clone());
            }
        }
        self.store.insert(id, post);
        self
    }

    /// Run a complete load cycle with the given posts.
    pub fn add_all(&mut self, posts: impl IntoIterator<Item = Post>) -> &mut Self {
        self.begin_load();
        for post in posts {
            self.add_post(post);
        }
        self.finish_load()
    }

    /// Complete a load cycle: group series, record changed keys and drop posts
    /// that weren't added again.
    pub fn finish_load(&mut self) -> &mut Self {
        self.correlate_posts();

        let mut changed: Vec<String> = Vec::new();
        if !self.had_post_keys.is_empty() {
            for post in self.posts() {
                if self.had_post_keys.contains(&post.key) {
                    continue;
                }
                info!(key = %post.key, "found new post \"{}\"", post.title);
                push_unique(&mut changed, &post.key);
                for key in post.categories.keys() {
                    push_unique(&mut changed, key);
                }
                for neighbour in [&post.next, &post.previous].into_iter().flatten() {
                    if let Some(n) = self.store.get(neighbour) {
                        push_unique(&mut changed, &n.key);
                    }
                }
            }
        }
        self.changed_keys = changed;
        self.had_post_keys.clear();

        let live: HashSet<&String> = self.posts.iter().collect();
        let dropped: Vec<String> = self
            .store
            .keys()
            .filter(|id| !live.contains(id))
            .cloned()
            .collect();
        for id in &dropped {
            self.store.remove(id);
            for category in self.categories.values_mut() {
                category.remove_post(id);
            }
        }
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "dropped posts not added again");
        }
        self.post_cache.clear();

        self.is_loading = false;
        self.loaded = true;
        info!(
            posts = self.posts.len(),
            changed = self.changed_keys.len(),
            "blog loaded"
        );
        self
    }

    /// Group adjacent posts sharing a title into series.
    ///
    /// Walks from the oldest post toward the newest. Each post with a
    /// subtitle starts a run that continues through newer posts with the same
    /// title. Runs of two or more become a series. A lone post keeps its full
    /// title. Titles are compared exactly, so unrelated neighbours with the
    /// same title are grouped too.
    pub fn correlate_posts(&mut self) -> &mut Self {
        let mut run: Vec<String> = Vec::new();
        let mut i = self.posts.len();

        while i > 0 {
            i -= 1;
            let Some(post) = self.store.get(&self.posts[i]) else {
                continue;
            };
            if post.sub_title.is_none() {
                continue;
            }

            run.push(post.id.clone());
            let title = post.title.clone();
            let mut next = post.next.clone();
            while let Some(next_id) = next {
                match self.store.get(&next_id) {
                    Some(n) if n.title == title => {
                        next = n.next.clone();
                        run.push(next_id);
                        i = i.saturating_sub(1);
                    }
                    _ => break,
                }
            }

            if run.len() > 1 {
                let total = run.len();
                for (part, id) in run.iter().enumerate() {
                    if let Some(p) = self.store.get_mut(id) {
                        if part == 0 {
                            p.make_series_start();
                        }
                        p.assign_part(part + 1, total);
                    }
                }
            } else if let Some(p) = self.store.get_mut(&run[0]) {
                p.ungroup();
            }
            run.clear();
        }
        self
    }

    // ---- lookup ----------------------------------------------------------

    /// IDs lookups search: the cache while loading, the posts otherwise.
    fn lookup_ids(&self) -> &[String] {
        if self.is_loading {
            &self.post_cache
        } else {
            &self.posts
        }
    }

    pub fn post_with_id(&self, id: &str) -> Option<&Post> {
        if self.lookup_ids().iter().any(|i| i == id) {
            self.store.get(id)
        } else {
            None
        }
    }

    pub fn post_with_id_mut(&mut self, id: &str) -> Option<&mut Post> {
        if self.lookup_ids().iter().any(|i| i == id) {
            self.store.get_mut(id)
        } else {
            None
        }
    }

    fn id_with_key(&self, key: &str, part_key: Option<&str>) -> Option<String> {
        let key = match part_key {
            Some(part) => format!("{key}{SERIES_KEY_SEPARATOR}{part}"),
            None => key.to_string(),
        };
        self.lookup_ids()
            .iter()
            .find(|id| self.store.get(*id).is_some_and(|p| p.has_key(&key)))
            .cloned()
    }

    /// Post with the key, or with the series and part keys combined.
    pub fn post_with_key(&self, key: &str, part_key: Option<&str>) -> Option<&Post> {
        let id = self.id_with_key(key, part_key)?;
        self.store.get(&id)
    }

    pub fn post_with_key_mut(&mut self, key: &str, part_key: Option<&str>) -> Option<&mut Post> {
        let id = self.id_with_key(key, part_key)?;
        self.store.get_mut(&id)
    }

    // ---- categories ------------------------------------------------------

    /// Root categories, ordered by key.
    pub fn categories(&self) -> impl Iterator<Item = &Category> + '_ {
        self.categories.values()
    }

    pub fn add_category(&mut self, category: Category) -> &mut Self {
        self.categories.insert(category.key.clone(), category);
        self
    }

    /// Remove all categories and the category entries of every post.
    pub fn clear_categories(&mut self) -> &mut Self {
        self.categories.clear();
        for post in self.store.values_mut() {
            post.categories.clear();
        }
        self
    }

    /// Add a loaded post to the category. Returns false when no such post
    /// has been added.
    pub fn categorize(&mut self, category: &mut Category, post_id: &str) -> bool {
        if !self.posts.iter().any(|id| id == post_id) {
            return false;
        }
        match self.store.get_mut(post_id) {
            Some(post) => {
                category.add_post(post);
                true
            }
            None => false,
        }
    }

    /// Nest `child` under `parent`, re-keying the posts it lists.
    pub fn nest_category(&mut self, parent: &mut Category, child: Category) -> &mut Self {
        parent.add(child, &mut self.store);
        self
    }

    /// Category by key. Subcategory keys include their parents' keys.
    pub fn category_with_key(&self, key: &str) -> Option<&Category> {
        let root_key = key.split(SERIES_KEY_SEPARATOR).next()?;
        let root = self.categories.get(root_key)?;
        if root_key == key {
            Some(root)
        } else {
            root.get_subcategory(key)
        }
    }

    /// Keys of the named categories, or of every root category and its
    /// direct subcategories when `with_names` is empty.
    ///
    /// A name matching a root title yields only the root key. Otherwise the
    /// root's subcategories are searched by title or key.
    pub fn category_keys(&self, with_names: &[&str]) -> Vec<String> {
        let mut keys = Vec::new();
        if with_names.is_empty() {
            for category in self.categories.values() {
                keys.push(category.key.clone());
                keys.extend(category.subcategories.iter().map(|c| c.key.clone()));
            }
            return keys;
        }
        for name in with_names {
            for category in self.categories.values() {
                if category.title == *name {
                    keys.push(category.key.clone());
                } else if let Some(sub) = category.get_subcategory(name) {
                    keys.push(sub.key.clone());
                }
            }
        }
        keys
    }

    // ---- removal ---------------------------------------------------------

    /// Empty the posts with the given keys so their details reload on next
    /// access.
    pub fn unload(&mut self, keys: &[&str]) -> &mut Self {
        for key in keys {
            if let Some(post) = self.post_with_key_mut(key, None) {
                debug!(key = %post.key, "unloading post");
                post.empty();
            }
        }
        self
    }

    /// Remove posts by key and return them.
    ///
    /// Neighbours lose their link to a removed post, but the removed post
    /// keeps its own links.
    pub fn remove(&mut self, keys: &[&str]) -> Vec<Post> {
        let mut removed = Vec::new();
        for key in keys {
            let Some(id) = self.id_with_key(key, None) else {
                continue;
            };
            let Some(index) = self.posts.iter().position(|p| *p == id) else {
                continue;
            };
            self.posts.remove(index);
            self.post_cache.retain(|p| *p != id);
            let Some(post) = self.store.remove(&id) else {
                continue;
            };

            if let Some(newer) = post.next.as_ref().and_then(|n| self.store.get_mut(n)) {
                newer.previous = None;
            }
            if let Some(older) = post.previous.as_ref().and_then(|p| self.store.get_mut(p)) {
                older.next = None;
            }
            for category in self.categories.values_mut() {
                category.remove_post(&id);
            }
            debug!(key = %post.key, "removed post");
            removed.push(post);
        }
        removed
    }

    // ---- provider-backed details -----------------------------------------

    /// Replace tag slugs on the photos with full tag names and return all of
    /// them, comma-separated. Slugs the blog has no name for are dropped.
    pub fn photo_tag_list(&self, photos: &mut [Photo]) -> Option<String> {
        resolve_tags(&self.tags, photos)
    }

    /// Post details, loaded from the provider on first request.
    pub async fn post_info(&mut self, id: &str) -> Result<Option<&Post>, BlogError> {
        let Some(post) = self.store.get_mut(id) else {
            return Ok(None);
        };
        if !post.info_loaded {
            let provider = self.providers.post()?;
            post.get_info(provider.as_ref()).await?;
        }
        Ok(Some(&*post))
    }

    /// Post photos, loaded from the provider on first request. Photo tags
    /// are resolved to full names.
    pub async fn post_photos(&mut self, id: &str) -> Result<Option<&[Photo]>, BlogError> {
        let Some(post) = self.store.get_mut(id) else {
            return Ok(None);
        };
        if !post.photos_loaded {
            let provider = self.providers.post()?;
            post.get_photos(provider.as_ref(), self.config.max_photo_markers_on_map)
                .await?;
            post.photo_tag_list = resolve_tags(&self.tags, &mut post.photos);
        }
        Ok(Some(post.photos.as_slice()))
    }

    /// Load details of every post.
    pub async fn load_post_info(&mut self) -> Result<&mut Self, BlogError> {
        if self.post_info_loaded {
            return Ok(self);
        }
        let ids = self.posts.clone();
        for id in &ids {
            self.post_info(id).await?;
        }
        self.post_info_loaded = true;
        Ok(self)
    }

    /// Unique photos of all posts, newest post first.
    pub async fn photos(&mut self) -> Result<Vec<Photo>, BlogError> {
        let ids = self.posts.clone();
        let mut seen = HashSet::new();
        let mut photos = Vec::new();
        for id in &ids {
            if let Some(post_photos) = self.post_photos(id).await? {
                for photo in post_photos {
                    if seen.insert(photo.id.clone()) {
                        photos.push(photo.clone());
                    }
                }
            }
        }
        Ok(photos)
    }

    /// Map points for every located photo in the blog.
    pub async fn geo_json(&mut self) -> Result<FeatureCollection, BlogError> {
        let photos = self.photos().await?;
        let mut collection = FeatureCollection::new();
        collection.features = photos
            .iter()
            .filter(|p| p.latitude > 0.0)
            .map(Photo::geo_json)
            .collect();
        Ok(collection)
    }

    /// Track and photo points for one post.
    pub async fn post_geo_json(&mut self, id: &str) -> Result<Option<FeatureCollection>, BlogError> {
        let map = self.providers.map()?;
        match self.store.get_mut(id) {
            Some(post) => Ok(Some(post.geo_json(map.as_ref()).await?)),
            None => Ok(None),
        }
    }

    /// Write one post's track as GPX. Returns false when there is no such
    /// post.
    pub async fn post_gpx(&mut self, id: &str, out: &mut (dyn Write + Send)) -> Result<bool, BlogError> {
        let map = self.providers.map()?;
        match self.store.get_mut(id) {
            Some(post) => {
                post.gpx(map.as_ref(), out).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Video embedded in a post, fetched from the video provider when the
    /// post details didn't include one.
    pub async fn post_video(&mut self, id: &str) -> Result<Option<&VideoInfo>, BlogError> {
        let video = self.providers.video()?;
        match self.store.get_mut(id) {
            Some(post) => Ok(post.get_video(video.as_ref()).await?),
            None => Ok(None),
        }
    }

    pub async fn exif(&self, photo_id: &str) -> Result<Exif, BlogError> {
        let provider = self.providers.post()?;
        Ok(provider.exif(photo_id).await?)
    }

    /// The post containing the photo.
    pub async fn post_with_photo(&self, photo_id: &str) -> Result<Option<&Post>, BlogError> {
        let provider = self.providers.post()?;
        let id = provider.post_id_with_photo_id(photo_id).await?;
        Ok(id.and_then(|id| self.post_with_id(&id)))
    }

    /// Photos having any of the tags, with tag names resolved.
    pub async fn photos_with_tags(&self, tags: &[String]) -> Result<Vec<Photo>, BlogError> {
        let provider = self.providers.post()?;
        let mut photos = provider.photos_with_tags(tags).await?;
        resolve_tags(&self.tags, &mut photos);
        Ok(photos)
    }
}

fn push_unique(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}

fn resolve_tags(names: &BTreeMap<String, String>, photos: &mut [Photo]) -> Option<String> {
    let mut all: Vec<String> = Vec::new();
    for photo in photos.iter_mut() {
        // slugs without a name are tags kept out of the blog
        photo.tags = photo
            .tags
            .iter()
            .filter_map(|slug| names.get(slug).cloned())
            .collect();
        for tag in &photo.tags {
            push_unique(&mut all, tag);
        }
    }
    if all.is_empty() {
        None
    } else {
        Some(all.join(", "))
    }
}
