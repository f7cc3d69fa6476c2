mod extract;

pub use extract::extract_article;

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Leading characters of the article's `h1`, shared by all its sections.
    pub name: String,
    pub h2: String,
    pub h3: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub breadcrumb: String,
    pub title: String,
    pub article_id: String,
    pub keywords: Option<String>,
    pub sections: Vec<Section>,
}
