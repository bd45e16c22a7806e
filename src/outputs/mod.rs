//! Outbound notifications.
//!
//! # Submodules
//!
//! - [`embed`]: formats a [`PostDetail`](crate::models::PostDetail) into the
//!   webhook JSON body
//! - [`webhook`]: the [`Notify`](webhook::Notify) trait and the HTTP webhook
//!   implementation
//!
//! # Payload
//!
//! ```text
//! {
//!   "content": null,
//!   "embeds": [{
//!     "author": {"name", "url"},
//!     "color", "thumbnail": {"url"},
//!     "fields": [{"name": "Timezones", "value", "inline": false}],
//!     "description",
//!     "image": {"url"}        // only when an image is attached
//!   }]
//! }
//! ```

pub mod embed;
pub mod webhook;
