//! Page scrapers for the news map.
//!
//! Each new post is read in two stages:
//!
//! 1. **List page** ([`feed`]): locate the feed container, take its first post
//!    and read id, title, detail link and optional media into a
//!    [`FeedEntry`](crate::models::FeedEntry)
//! 2. **Detail page** ([`detail`]): read the source link and full-size image
//!    into a [`PostDetail`](crate::models::PostDetail)
//!
//! Both stages work on markup already fetched by [`crate::fetch`] and only
//! consult the [`MarkupTemplate`](crate::config::MarkupTemplate) for element
//! names. Required list-page fields that are missing produce an
//! [`ExtractionError`](crate::error::ExtractionError); optional fields that
//! are missing are left as `None`.

pub mod detail;
pub mod feed;
