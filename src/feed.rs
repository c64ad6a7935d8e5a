//! Atom feed projection.
//!
//! Builds serialisable Atom feed values from the loaded blog. Entries link to
//! `site.url/post-key`, so a series start appears under the series URL. The
//! feed needs the `[site]` and `[owner]` config sections.
//!
//! ```text
//! AtomFeed
//! ├── id, title, subtitle, link     ← [site]
//! ├── author, contributor           ← [owner]
//! ├── generator                     ← this crate
//! └── entry[]                       ← one per post, newest first
//! ```

use crate::blog::PhotoBlog;
use crate::config::{BlogConfig, ConfigError, OwnerConfig};
use crate::post::Post;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomPerson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl AtomPerson {
    fn owner(owner: &OwnerConfig) -> Self {
        Self {
            name: owner.name.clone(),
            uri: owner.urls.first().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomLink {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomGenerator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub rights: String,
    pub summary: Option<String>,
    pub author: AtomPerson,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomFeed {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub link: AtomLink,
    pub author: AtomPerson,
    pub contributor: AtomPerson,
    pub generator: AtomGenerator,
    pub updated: DateTime<Utc>,
    pub entry: Vec<AtomEntry>,
}

/// Feed entry for one post. `now` dates the copyright notice.
pub fn post_entry(post: &Post, config: &BlogConfig, now: DateTime<Utc>) -> Result<AtomEntry, ConfigError> {
    let (site, owner) = config.ensure_site()?;
    let url = format!("{}/{}", site.url.trim_end_matches('/'), post.key);

    Ok(AtomEntry {
        id: url.clone(),
        title: post.name(&config.subtitle_separator),
        link: format!("http://{}", site.domain),
        published: post.created_on,
        updated: post.updated_on,
        rights: format!(
            "Copyright © {} {}. All rights reserved.",
            now.year(),
            owner.name
        ),
        summary: post.description.clone(),
        author: AtomPerson::owner(owner),
        content: url,
    })
}

/// Feed of all posts, newest first, stamped as updated at `now`.
pub fn blog_feed(blog: &PhotoBlog, now: DateTime<Utc>) -> Result<AtomFeed, ConfigError> {
    let config = blog.config();
    let (site, owner) = config.ensure_site()?;
    let author = AtomPerson {
        name: owner.name.clone(),
        uri: None,
    };

    Ok(AtomFeed {
        id: site.url.clone(),
        title: site.title.clone(),
        subtitle: site.subtitle.clone(),
        link: AtomLink {
            href: site.url.clone(),
        },
        contributor: author.clone(),
        author,
        generator: AtomGenerator {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        updated: now,
        entry: blog
            .posts()
            .map(|p| post_entry(p, config, now))
            .collect::<Result<_, _>>()?,
    })
}
