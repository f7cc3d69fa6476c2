use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("unexpected content type {0:?}")]
    ContentType(Option<String>),
    #[error("body error: {0}")]
    Body(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("navigation container #{0} not found")]
    MissingContainer(String),
    #[error("subcategory link {0:?} has no href")]
    MissingHref(String),
    #[error("href {0:?} carries no listing id")]
    MissingListingId(String),
    #[error("subcategory {0:?} appears before any main category")]
    MissingMainCategory(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedListingError {
    #[error("listing is not valid json: {0}")]
    Json(String),
    #[error("listing is empty")]
    EmptyListing,
    #[error("listing node under {breadcrumb:?} has no text")]
    MissingText { breadcrumb: String },
    #[error("listing node {text:?} has nodes that are not a list")]
    InvalidNodes { text: String },
    #[error("listing root {0:?} has no nodes")]
    MissingNodes(String),
    #[error("listing nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("no article id in href {0:?}")]
    ArticleId(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("article root #{0} not found")]
    MissingRoot(String),
    #[error("article has no h1 heading")]
    MissingHeading,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store connection lock poisoned")]
    Poisoned,
    #[error("store task failed: {0}")]
    Task(String),
}

/// Failure of a single article. The category pipeline moves on to the next one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArticleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("malformed reference: {0}")]
    Malformed(#[from] MalformedListingError),
}

/// Failure of a whole category pipeline. Sibling categories are unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CategoryError {
    #[error("listing fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("listing malformed: {0}")]
    Listing(#[from] MalformedListingError),
    #[error("pipeline task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
