use std::future::Future;

use crate::error::PersistenceError;

mod sqlite;
mod writer;

pub use sqlite::SqliteStore;
pub use writer::ArticleWriter;

/// Metadata row linking one stored content block back to its article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub main_category: String,
    pub sub_category: String,
    pub list_name: String,
    pub article_id: String,
    pub article_name: String,
    pub h2_name: String,
    pub h3_name: String,
    pub keywords: Option<String>,
    pub content_id: i64,
}

pub trait ArticleStore: Send + Sync + Clone {
    /// Creates the `content` and `articles` tables when missing.
    fn ensure_schema(&self) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Inserts a content block and returns its generated id.
    fn insert_content(
        &self,
        description: &str,
        text: &str,
    ) -> impl Future<Output = Result<i64, PersistenceError>> + Send;

    fn insert_article(
        &self,
        row: &ArticleRow,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}
