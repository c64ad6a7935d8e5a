//! Post categories.
//!
//! Categories form a tree (`When → 2016`, `Where → Idaho`). A subcategory's
//! key is the full path from its root:
//!
//! ```text
//! when
//! ├── when/2015
//! └── when/2016
//! ```
//!
//! Categories list the IDs of their posts, and each post records the keys and
//! titles of its categories. Both sides are kept in step: nesting a category
//! under another rewrites its key and updates the posts that referenced the
//! old key.

use crate::config::SERIES_KEY_SEPARATOR;
use crate::post::{Post, PostMap};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub key: String,
    pub title: String,
    pub subcategories: Vec<Category>,
    /// IDs of posts in this category.
    pub posts: BTreeSet<String>,
}

impl Category {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            subcategories: Vec::new(),
            posts: BTreeSet::new(),
        }
    }

    /// Nest `subcat` under this category.
    ///
    /// The subcategory and all its descendants are re-keyed under this
    /// category's key, and every post they list in `posts` has its category
    /// entry moved to the new key. A subcategory already nested with the same
    /// key is replaced.
    pub fn add(&mut self, mut subcat: Category, posts: &mut PostMap) -> &mut Self {
        subcat.prefix_keys(&self.key, posts);
        self.subcategories.retain(|c| c.key != subcat.key);
        self.subcategories.push(subcat);
        self
    }

    fn prefix_keys(&mut self, prefix: &str, posts: &mut PostMap) {
        let old_key = std::mem::take(&mut self.key);
        self.key = format!("{prefix}{SERIES_KEY_SEPARATOR}{old_key}");

        for id in &self.posts {
            if let Some(post) = posts.get_mut(id) {
                post.categories.remove(&old_key);
                post.categories.insert(self.key.clone(), self.title.clone());
            }
        }
        for sub in &mut self.subcategories {
            sub.prefix_keys(prefix, posts);
        }
    }

    /// Add the post to this category, recording the category on the post too.
    pub fn add_post(&mut self, post: &mut Post) -> &mut Self {
        self.posts.insert(post.id.clone());
        post.categories.insert(self.key.clone(), self.title.clone());
        self
    }

    /// Remove the post from this category and all subcategories.
    pub fn remove_post(&mut self, post_id: &str) -> &mut Self {
        self.posts.remove(post_id);
        for sub in &mut self.subcategories {
            sub.remove_post(post_id);
        }
        self
    }

    /// Find a descendant by key or title, searching depth-first.
    pub fn get_subcategory(&self, key_or_title: &str) -> Option<&Category> {
        for sub in &self.subcategories {
            if sub.title == key_or_title || sub.key == key_or_title {
                return Some(sub);
            }
            if let Some(found) = sub.get_subcategory(key_or_title) {
                return Some(found);
            }
        }
        None
    }

    /// Whether a descendant has this key or title.
    pub fn has(&self, key_or_title: &str) -> bool {
        self.get_subcategory(key_or_title).is_some()
    }

    pub fn is_child(&self) -> bool {
        self.key.contains(SERIES_KEY_SEPARATOR)
    }

    pub fn is_parent(&self) -> bool {
        !self.subcategories.is_empty()
    }

    /// Total posts in this category and its descendants, counted per listing.
    pub fn post_count(&self) -> usize {
        self.posts.len()
            + self
                .subcategories
                .iter()
                .map(Category::post_count)
                .sum::<usize>()
    }
}
