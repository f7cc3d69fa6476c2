use crate::error::MalformedListingError;

mod flatten;

pub use flatten::flatten_listing;

/// Placeholder leaf the site emits in every listing.
pub const NEW_ARTICLE_PLACEHOLDER: &str = "New article";

pub const BREADCRUMB_SEPARATOR: &str = " ^ ";

#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedArticleRef {
    pub breadcrumb: String,
    pub title: String,
    pub href: String,
}

/// Result of flattening a listing: the article references in document order,
/// plus what was dropped on the way.
#[derive(Debug, Default, PartialEq)]
pub struct Flattened {
    pub refs: Vec<FlattenedArticleRef>,
    pub skipped: usize,
    pub malformed: Vec<MalformedListingError>,
}
