//! # Photo Blog
//!
//! An in-memory model of a photo blog whose posts live with a photo hosting
//! provider. The provider supplies posts in publication order; the blog turns
//! that flat list into something a site can render: chronological neighbours,
//! multi-part series, a category tree and tag names.
//!
//! # Architecture: Load Cycle
//!
//! Everything the blog knows arrives through one load cycle driven by the
//! post provider:
//!
//! ```text
//! 1. begin_load     park the current posts so lookups keep working
//! 2. add_post*      place each post and link it to its neighbour
//! 3. finish_load    group series, report new keys, drop vanished posts
//! ```
//!
//! Post details (descriptions, photos, tracks, video) are fetched lazily the
//! first time they are asked for, and kept until the next load resets them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`blog`] | The process-wide blog: post store, load cycle, series correlation, lookups |
//! | [`post`] | A post: title/subtitle split, series keys, lazily loaded details |
//! | [`photo`] | Photos, EXIF memoisation and capture date outlier detection |
//! | [`category`] | Category tree with hierarchical keys |
//! | [`provider`] | Post, map and video provider traits and the capability bundle |
//! | [`snapshot`] | Provider serving a JSON snapshot of the remote services |
//! | [`config`] | `blog.toml` loading, validation and stock defaults |
//! | [`feed`] | Atom feed projection of the blog |
//! | [`geo`] | GeoJSON types and GPX export |
//! | [`media`] | Photo sizes, video info and EXIF values |
//! | [`slug`] | URL slugs for titles and subtitles |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Series From Titles
//!
//! Series are not declared anywhere. Posts titled `"Brother Ride: Day 1"`
//! and `"Brother Ride: Day 2"` that sit next to each other in time become
//! parts of the `brother-ride` series. The first part takes the series key,
//! later parts `series/subtitle`. The separator is configurable; `/` is
//! reserved for keys.
//!
//! ## Posts Referenced by ID
//!
//! Neighbour links and category memberships hold post IDs, never references.
//! The blog owns every post in one map, so a reload can reset, reorder and
//! drop posts without fighting the borrow checker over a linked list.
//!
//! ## One Blog Per Process
//!
//! [`blog::init`] creates the blog once behind a `tokio` mutex. Holding the
//! lock across a load keeps readers from seeing a half-correlated sequence.

pub mod blog;
pub mod category;
pub mod config;
pub mod feed;
pub mod geo;
pub mod media;
pub mod output;
pub mod photo;
pub mod post;
pub mod provider;
pub mod slug;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_helpers;
