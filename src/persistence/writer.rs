use super::{ArticleRow, ArticleStore};
use crate::article::{ExtractedArticle, Section};
use crate::category_tree::CategoryDescriptor;
use crate::error::PersistenceError;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WriteSummary {
    pub written: usize,
    pub failed: usize,
}

/// Maps extracted articles onto content blocks and their metadata rows.
#[derive(Clone, Debug)]
pub struct ArticleWriter<S> {
    store: S,
}

impl<S: ArticleStore> ArticleWriter<S> {
    pub async fn new(store: S) -> Result<Self, PersistenceError> {
        store.ensure_schema().await?;
        Ok(ArticleWriter { store })
    }

    async fn write_section(
        &self,
        category: &CategoryDescriptor,
        article: &ExtractedArticle,
        section: &Section,
    ) -> Result<(), PersistenceError> {
        let content_id = self
            .store
            .insert_content(&section.name, &section.content)
            .await?;
        let row = ArticleRow {
            main_category: category.main_category.clone(),
            sub_category: category.subcategory.clone(),
            list_name: article.breadcrumb.clone(),
            article_id: article.article_id.clone(),
            article_name: article.title.clone(),
            h2_name: section.h2.clone(),
            h3_name: section.h3.clone(),
            keywords: article.keywords.clone(),
            content_id,
        };
        self.store.insert_article(&row).await
    }

    /// Stores every section as a content row plus a metadata row. A failed
    /// section is logged and counted; the remaining sections are still written.
    #[tracing::instrument(skip_all, fields(article_id = %article.article_id))]
    pub async fn write(
        &self,
        category: &CategoryDescriptor,
        article: &ExtractedArticle,
    ) -> WriteSummary {
        let mut summary = WriteSummary::default();
        for section in &article.sections {
            match self.write_section(category, article, section).await {
                Ok(()) => summary.written += 1,
                Err(err) => {
                    tracing::error!(
                        "Failed to store section h2={:?} h3={:?} of {:?}: {}",
                        section.h2,
                        section.h3,
                        article.title,
                        err
                    );
                    summary.failed += 1;
                }
            }
        }
        tracing::debug!("Stored {} sections, {} failed", summary.written, summary.failed);
        summary
    }
}
