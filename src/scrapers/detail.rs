//! Detail page extraction.
//!
//! The detail page adds the canonical source link and a larger image to a
//! post found on the list page. Both are optional; a detail page without them
//! still yields a usable [`PostDetail`].

use tracing::{debug, instrument};
use url::Url;

use super::feed::optional_link;
use crate::config::MarkupTemplate;
use crate::dom::{AttrFilter, Document};
use crate::models::{FeedEntry, PostDetail};

/// Decorate `entry` with the data found on its detail page.
///
/// The HTML parser accepts any input, so this never fails: anything missing
/// from the page is left as `None`.
#[instrument(level = "debug", skip_all, fields(id = %entry.id))]
pub fn extract_detail(
    html: &str,
    page_url: &Url,
    entry: &FeedEntry,
    template: &MarkupTemplate,
) -> PostDetail {
    let document = Document::parse(html);
    let mut detail = PostDetail::new(entry);

    detail.source_url = document
        .find("a", &[AttrFilter::Class(&template.source_link_class)])
        .and_then(|a| a.non_empty_attr("href"))
        .and_then(|href| optional_link(page_url, href, "source"));

    detail.detail_image_url = document
        .find("div", &[AttrFilter::Class(&template.popup_image_class)])
        .and_then(|popup| popup.find_child("img", &[]))
        .and_then(|img| img.non_empty_attr("src"))
        .and_then(|src| optional_link(page_url, src, "detail image"));

    debug!(
        has_source = detail.source_url.is_some(),
        has_detail_image = detail.detail_image_url.is_some(),
        "Extracted post detail"
    );
    detail
}
