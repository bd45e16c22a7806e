//! Typed tree queries over parsed HTML.
//!
//! Extraction code asks declarative questions ("the first `div` with class
//! `title` below this node") through [`Node::find_child`] instead of building
//! CSS selector strings. Attribute values taken from the page itself, such as
//! a post id, are compared literally and never need escaping.

use scraper::{ElementRef, Html};

/// Predicate on one attribute of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrFilter<'f> {
    /// `id` attribute equals the value.
    Id(&'f str),
    /// One of the whitespace-separated classes equals the value.
    Class(&'f str),
    /// Arbitrary attribute equals the value.
    Equals(&'f str, &'f str),
}

impl AttrFilter<'_> {
    fn matches(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        match *self {
            AttrFilter::Id(id) => value.id() == Some(id),
            AttrFilter::Class(class) => {
                value.classes().any(|c| c == class) || value.attr("class") == Some(class)
            }
            AttrFilter::Equals(name, expected) => value.attr(name) == Some(expected),
        }
    }
}

/// An owned parsed document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse a full HTML document. Parsing is error-tolerant and never fails.
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            element: self.html.root_element(),
        }
    }

    /// First element anywhere in the document matching `tag` and all `filters`.
    pub fn find(&self, tag: &str, filters: &[AttrFilter<'_>]) -> Option<Node<'_>> {
        let root = self.root();
        if root.matches(tag, filters) {
            return Some(root);
        }
        root.find_child(tag, filters)
    }
}

/// Handle to one element of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

impl<'a> Node<'a> {
    /// Local tag name, lowercased by the parser.
    pub fn tag(&self) -> &'a str {
        self.element.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Attribute value, treating blank values as absent.
    pub fn non_empty_attr(&self, name: &str) -> Option<&'a str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// First descendant element (depth-first, document order) whose tag is
    /// `tag` and which satisfies every filter.
    pub fn find_child(&self, tag: &str, filters: &[AttrFilter<'_>]) -> Option<Node<'a>> {
        self.element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .map(|element| Node { element })
            .find(|node| node.matches(tag, filters))
    }

    /// First direct child that is an element; text and comment nodes are skipped.
    pub fn first_element_child(&self) -> Option<Node<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|element| Node { element })
            .next()
    }

    fn matches(&self, tag: &str, filters: &[AttrFilter<'_>]) -> bool {
        self.tag().eq_ignore_ascii_case(tag) && filters.iter().all(|f| f.matches(&self.element))
    }
}
