//! List page extraction.
//!
//! The list page holds every post inside a single feed container, newest
//! first. Only the first post is inspected: document order is taken as
//! recency, so a reordering of the upstream page would break detection of
//! new posts.

use tracing::{debug, instrument};
use url::Url;

use crate::config::MarkupTemplate;
use crate::dom::{AttrFilter, Document, Node};
use crate::error::ExtractionError;
use crate::models::FeedEntry;
use crate::utils::{collapse_whitespace, resolve_link};

/// Extract the latest post from list-page markup.
///
/// # Arguments
///
/// * `html` - Raw markup of the list page
/// * `page_url` - URL the markup was fetched from, used to resolve relative links
/// * `template` - Element markers of the current page template
///
/// # Errors
///
/// [`ExtractionError::FeedRootMissing`] when the feed container is absent,
/// [`ExtractionError::EmptyFeed`] when it has no posts, and a missing-field
/// error when the post has no id, title or detail link.
#[instrument(level = "debug", skip_all, fields(%page_url))]
pub fn extract_latest(
    html: &str,
    page_url: &Url,
    template: &MarkupTemplate,
) -> Result<FeedEntry, ExtractionError> {
    let document = Document::parse(html);

    let feed_root = document
        .find("div", &[AttrFilter::Id(&template.feed_root_id)])
        .ok_or_else(|| ExtractionError::FeedRootMissing {
            marker: template.feed_root_id.clone(),
        })?;

    let post = feed_root
        .first_element_child()
        .ok_or_else(|| ExtractionError::EmptyFeed {
            marker: template.feed_root_id.clone(),
        })?;

    let id = post
        .non_empty_attr(&template.post_id_attr)
        .ok_or_else(|| ExtractionError::missing_attribute(&template.post_id_attr))?
        .to_string();

    let text = post
        .find_child("div", &[AttrFilter::Class(&template.title_class)])
        .map(|title| collapse_whitespace(&title.text()))
        .ok_or_else(|| ExtractionError::missing_element(format!("div.{}", template.title_class)))?;

    let href = post
        .find_child(
            "a",
            &[
                AttrFilter::Equals(&template.post_id_attr, &id),
                AttrFilter::Class(&template.comment_link_class),
            ],
        )
        .and_then(|a| a.non_empty_attr("href"))
        .ok_or_else(|| {
            ExtractionError::missing_element(format!("a.{}[href]", template.comment_link_class))
        })?;
    let detail_link = resolve_link(page_url, href).map_err(|e| ExtractionError::InvalidLink {
        what: "detail".into(),
        href: href.to_string(),
        message: e.to_string(),
    })?;

    let entry = FeedEntry {
        image_url: image_url(&post, page_url, template),
        video_url: video_url(&post, page_url, template),
        id,
        text,
        detail_link,
    };
    debug!(
        id = %entry.id,
        detail_link = %entry.detail_link,
        has_image = entry.image_url.is_some(),
        has_video = entry.video_url.is_some(),
        "Extracted latest post"
    );
    Ok(entry)
}

/// Thumbnail inside the post's image container, if both exist.
fn image_url(post: &Node<'_>, page_url: &Url, template: &MarkupTemplate) -> Option<String> {
    let src = post
        .find_child("div", &[AttrFilter::Class(&template.image_class)])?
        .find_child("img", &[])?
        .non_empty_attr("src")?;
    optional_link(page_url, src, "image")
}

/// Video link, either carried directly on the post element or inside an
/// embedded video quote.
fn video_url(post: &Node<'_>, page_url: &Url, template: &MarkupTemplate) -> Option<String> {
    if let Some(direct) = post
        .non_empty_attr(&template.video_attr)
        .filter(|v| v.contains("video"))
    {
        return optional_link(page_url, direct, "video");
    }

    let href = post
        .find_child("blockquote", &[AttrFilter::Class(&template.video_quote_class)])?
        .find_child("a", &[])?
        .non_empty_attr("href")?;
    optional_link(page_url, href, "video")
}

pub(crate) fn optional_link(page_url: &Url, href: &str, what: &str) -> Option<String> {
    match resolve_link(page_url, href) {
        Ok(link) => Some(link),
        Err(e) => {
            debug!(%href, what, error = %e, "Dropping unresolvable optional link");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://liveuamap.com/").unwrap()
    }

    fn extract(html: &str) -> Result<FeedEntry, ExtractionError> {
        extract_latest(html, &page_url(), &MarkupTemplate::default())
    }

    const FULL_PAGE: &str = r#"
        <html><body>
          <div id="feedler" class="scroller">
            <div class="event cat3 sourcees" data-id="20731452"
                 data-twitpic="https://video.twimg.com/ext_tw_video/1/pu/vid/720x1280/a.mp4">
              <div class="time">1 minute ago</div>
              <div class="title">
                Air raid alert in
                Kyiv oblast
              </div>
              <div class="img"><img src="https://liveuamap.com/pics/2024/thumb.jpg"></div>
              <a class="comment-link" data-id="20731452" href="/en/2024/air-raid-kyiv">Comment</a>
            </div>
            <div class="event" data-id="20731451">
              <div class="title">Older news</div>
              <a class="comment-link" data-id="20731451" href="/en/2024/older">Comment</a>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn test_extracts_all_fields() {
        let entry = extract(FULL_PAGE).unwrap();
        assert_eq!(entry.id, "20731452");
        assert_eq!(entry.text, "Air raid alert in Kyiv oblast");
        assert_eq!(entry.detail_link, "https://liveuamap.com/en/2024/air-raid-kyiv");
        assert_eq!(
            entry.image_url.as_deref(),
            Some("https://liveuamap.com/pics/2024/thumb.jpg")
        );
        assert_eq!(
            entry.video_url.as_deref(),
            Some("https://video.twimg.com/ext_tw_video/1/pu/vid/720x1280/a.mp4")
        );
    }

    #[test]
    fn test_first_child_is_latest_even_after_whitespace_and_comments() {
        let html = r#"<div id="feedler">

            <!-- pinned banner removed -->
            <div data-id="7"><div class="title">Seven</div>
              <a class="comment-link" data-id="7" href="https://liveuamap.com/en/7">c</a></div>
            <div data-id="6"><div class="title">Six</div></div>
        </div>"#;
        let entry = extract(html).unwrap();
        assert_eq!(entry.id, "7");
        assert_eq!(entry.text, "Seven");
    }

    #[test]
    fn test_optional_fields_absent() {
        let html = r#"<div id="feedler">
            <div data-id="9">
              <div class="title">No media</div>
              <div class="img"></div>
              <a class="comment-link" data-id="9" href="/en/9">c</a>
            </div></div>"#;
        let entry = extract(html).unwrap();
        assert_eq!(entry.image_url, None);
        assert_eq!(entry.video_url, None);
    }

    #[test]
    fn test_picture_attribute_is_not_a_video() {
        let html = r#"<div id="feedler">
            <div data-id="9" data-twitpic="https://pbs.twimg.com/media/photo.jpg">
              <div class="title">Photo only</div>
              <a class="comment-link" data-id="9" href="/en/9">c</a>
            </div></div>"#;
        assert_eq!(extract(html).unwrap().video_url, None);
    }

    #[test]
    fn test_video_from_embedded_quote() {
        let html = r#"<div id="feedler">
            <div data-id="10">
              <div class="title">Footage</div>
              <blockquote class="twitter-video"><p>clip</p>
                <a href="https://twitter.com/user/status/1500000000">March 1, 2022</a>
              </blockquote>
              <a class="comment-link" data-id="10" href="/en/10">c</a>
            </div></div>"#;
        let entry = extract(html).unwrap();
        assert_eq!(
            entry.video_url.as_deref(),
            Some("https://twitter.com/user/status/1500000000")
        );
    }

    #[test]
    fn test_missing_feed_root() {
        let err = extract("<html><body><h1>502 Bad Gateway</h1></body></html>").unwrap_err();
        assert_eq!(
            err,
            ExtractionError::FeedRootMissing {
                marker: "feedler".into()
            }
        );
    }

    #[test]
    fn test_empty_feed() {
        let err = extract(r#"<div id="feedler">   </div>"#).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyFeed { .. }));
    }

    #[test]
    fn test_missing_id_is_fatal() {
        let html = r#"<div id="feedler"><div><div class="title">t</div></div></div>"#;
        let err = extract(html).unwrap_err();
        assert_eq!(err, ExtractionError::missing_attribute("data-id"));
    }

    #[test]
    fn test_missing_title_is_fatal() {
        let html = r#"<div id="feedler"><div data-id="1">
            <a class="comment-link" data-id="1" href="/en/1">c</a></div></div>"#;
        let err = extract(html).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingElement { .. }));
    }

    #[test]
    fn test_detail_link_must_match_post_id() {
        let html = r#"<div id="feedler"><div data-id="1">
            <div class="title">t</div>
            <a class="comment-link" data-id="2" href="/en/2">c</a></div></div>"#;
        let err = extract(html).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingElement { .. }));
    }

    #[test]
    fn test_custom_template_markers() {
        let template = MarkupTemplate {
            feed_root_id: "feed-v2".into(),
            title_class: "headline".into(),
            ..MarkupTemplate::default()
        };
        let html = r#"<div id="feed-v2"><div data-id="3">
            <div class="headline">Renamed</div>
            <a class="comment-link" data-id="3" href="/en/3">c</a></div></div>"#;
        let entry = extract_latest(html, &page_url(), &template).unwrap();
        assert_eq!(entry.text, "Renamed");
    }
}
