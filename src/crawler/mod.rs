use std::collections::{HashMap, VecDeque};

use tokio::task::{Id, JoinSet};
use tracing::Instrument;

mod report;

pub use report::{CategoryCounts, CrawlReport};

use crate::article::{extract_article, ExtractedArticle};
use crate::article_list::{flatten_listing, FlattenedArticleRef};
use crate::category_tree::{parse_categories, CategoryDescriptor};
use crate::error::{ArticleError, CategoryError};
use crate::page_fetcher::{PageFetcher, URLContentGetter};
use crate::persistence::{ArticleStore, ArticleWriter};

pub type WorkerResult = (CategoryDescriptor, Result<CategoryCounts, CategoryError>);

/// Runs one pipeline per category. Pipelines share the fetcher and writer
/// through clones and never cancel one another.
pub struct CrawlOrchestrator<T: URLContentGetter + 'static, S: ArticleStore + 'static> {
    pub fetcher: PageFetcher<T>,
    pub writer: ArticleWriter<S>,
    pub worker_pool_size: usize,
}

async fn crawl_article<T: URLContentGetter>(
    fetcher: &PageFetcher<T>,
    reference: &FlattenedArticleRef,
) -> Result<ExtractedArticle, ArticleError> {
    let html = fetcher.get_article(&reference.href).await?;
    extract_article(&html, reference)
}

async fn crawl_category<T: URLContentGetter, S: ArticleStore>(
    fetcher: &PageFetcher<T>,
    writer: &ArticleWriter<S>,
    category: &CategoryDescriptor,
) -> Result<CategoryCounts, CategoryError> {
    let body = fetcher.get_listing(&category.listing_id).await?;
    let flattened = flatten_listing(&body).inspect_err(|_| {
        tracing::debug!("Failed listing body: {}", body);
    })?;

    let mut counts = CategoryCounts {
        discovered: flattened.refs.len(),
        skipped: flattened.skipped,
        malformed: flattened.malformed.len(),
        ..Default::default()
    };
    for reference in &flattened.refs {
        match crawl_article(fetcher, reference).await {
            Ok(article) => {
                let summary = writer.write(category, &article).await;
                if summary.written > 0 {
                    counts.stored += 1;
                } else {
                    counts.failed += 1;
                }
                counts.sections_written += summary.written;
                counts.sections_failed += summary.failed;
            }
            Err(err) => {
                tracing::error!(
                    "Failed to process article {:?} ({}): {}",
                    reference.title,
                    reference.href,
                    err
                );
                counts.failed += 1;
            }
        }
    }
    Ok(counts)
}

impl<T: URLContentGetter + 'static, S: ArticleStore + 'static> CrawlOrchestrator<T, S> {
    fn worker(&self, category: CategoryDescriptor, in_flight: &mut JoinSet<WorkerResult>) -> Id {
        let fetcher = self.fetcher.clone();
        let writer = self.writer.clone();
        let span = tracing::info_span!("category", category = %category);
        in_flight
            .spawn(
                async move {
                    tracing::info!("Processing category");
                    let result = crawl_category(&fetcher, &writer, &category).await;
                    tracing::info!("Finished processing category");
                    (category, result)
                }
                .instrument(span),
            )
            .id()
    }

    /// Crawls the given categories concurrently, at most `worker_pool_size`
    /// at a time. A failed category is logged and counted; the rest go on.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, categories: Vec<CategoryDescriptor>) -> CrawlReport {
        tracing::info!("Beginning crawl of {} categories", categories.len());
        let mut report = CrawlReport::new(categories.len());
        let mut queue = VecDeque::from(categories);
        let mut in_flight = JoinSet::new();
        // a panicked task hands back only its id
        let mut running: HashMap<Id, String> = HashMap::new();

        loop {
            while in_flight.len() < self.worker_pool_size.max(1) {
                match queue.pop_front() {
                    Some(category) => {
                        let name = category.to_string();
                        running.insert(self.worker(category, &mut in_flight), name);
                    }
                    None => break,
                }
            }
            let result = match in_flight.join_next_with_id().await {
                Some(Ok((id, (category, result)))) => {
                    running.remove(&id);
                    result.map_err(|err| (category.to_string(), err))
                }
                Some(Err(err)) => {
                    let category = running
                        .remove(&err.id())
                        .unwrap_or_else(|| "unknown".to_string());
                    Err((category, CategoryError::Aborted(err.to_string())))
                }
                None => break,
            };
            match result {
                Ok(counts) => report.add_completed(&counts),
                Err((category, err)) => {
                    tracing::error!("Category {} failed: {}", category, err);
                    report.add_failed();
                }
            }
        }

        report.finish();
        tracing::info!("Finished crawl");
        report
    }

    /// Fetches the navigation page, reads its categories and crawls them.
    pub async fn crawl(&self) -> CrawlReport {
        let categories = match self.fetcher.get_navigation().await {
            Ok(page) => match parse_categories(&page) {
                Ok(categories) => categories,
                Err(err) => {
                    tracing::error!("Failed to parse categories: {}", err);
                    vec![]
                }
            },
            Err(err) => {
                tracing::error!("Failed to fetch navigation page: {}", err);
                vec![]
            }
        };
        self.run(categories).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::FetchError;
    use crate::page_fetcher::{MockURLCG, RawResponse, SiteUrls};
    use crate::persistence::SqliteStore;

    const ROOT: &str = "http://example.com/tk/tk.koti";

    fn urls() -> SiteUrls {
        SiteUrls {
            root_url: ROOT.to_string(),
            listing_url_template: "http://example.com/api?p_teos={teos}".to_string(),
            article_placeholder: "tk.koti".to_string(),
        }
    }

    fn navigation() -> (String, Result<RawResponse, FetchError>) {
        let page = r#"
<div id="vakionavi">
  <div>
    <a class="main-menu-item">Terveyskirjasto</a>
    <a href="tk.koti?p_teos=ykt">Lääkärikirja</a>
    <a href="tk.koti?p_teos=far">Lääkkeet</a>
  </div>
</div>"#;
        (ROOT.to_string(), Ok(RawResponse::ok("text/html", page)))
    }

    fn listing(id: &str, body: &str) -> (String, Result<RawResponse, FetchError>) {
        (
            format!("http://example.com/api?p_teos={}", id),
            Ok(RawResponse::ok("application/json", body)),
        )
    }

    fn article(id: &str, heading: &str, text: &str) -> (String, Result<RawResponse, FetchError>) {
        let html = format!(
            r#"<div id="duo-article"><h1>{}</h1><div class="section"><h2>Osa</h2><p>{}</p></div></div>"#,
            heading, text
        );
        (
            format!("http://example.com/tk/tk.koti?p_artikkeli={}", id),
            Ok(RawResponse::ok("text/html", &html)),
        )
    }

    const YKT_LISTING: &str = r#"[{"text": "Lääkärikirja", "nodes": [
        {"text": "Sydän", "nodes": [
            {"text": "Angina", "href": "tk.koti?p_artikkeli=dlk00001"},
            {"text": "New article", "href": "tk.koti?p_artikkeli=new"}
        ]},
        {"text": "Flunssa", "href": "tk.koti?p_artikkeli=dlk00002"}
    ]}]"#;

    const FAR_LISTING: &str = r#"[{"text": "Lääkkeet", "nodes": [
        {"text": "Beetasalpaajat", "href": "tk.koti?p_artikkeli=far00607"}
    ]}]"#;

    async fn orchestrator(mock: MockURLCG) -> (CrawlOrchestrator<MockURLCG, SqliteStore>, SqliteStore) {
        let store = SqliteStore::open_in_memory().unwrap();
        let orchestrator = CrawlOrchestrator {
            fetcher: PageFetcher::new(mock, urls()),
            writer: ArticleWriter::new(store.clone()).await.unwrap(),
            worker_pool_size: 10,
        };
        (orchestrator, store)
    }

    #[tokio::test]
    async fn crawl_happy_path() {
        let mock = MockURLCG::new(HashMap::from([
            navigation(),
            listing("ykt", YKT_LISTING),
            listing("far", r#"[{"text": "Lääkkeet", "nodes": []}]"#),
            article("dlk00001", "Angina pectoris", "Rintakipu."),
            article("dlk00002", "Flunssa", "Nuha."),
        ]));
        let (orchestrator, store) = orchestrator(mock).await;

        let report = orchestrator.crawl().await;

        assert_eq!(report.categories, 2);
        assert_eq!(report.categories_completed, 2);
        assert_eq!(report.categories_failed, 0);
        assert_eq!(report.articles.discovered, 2);
        assert_eq!(report.articles.stored, 2);
        assert_eq!(report.articles.skipped, 1);
        assert_eq!(report.articles.failed, 0);
        assert_eq!(report.articles.sections_written, 2);
        assert_eq!(
            store.stored_rows(),
            vec![
                (
                    "Lääkärikirja".to_string(),
                    "dlk00001".to_string(),
                    "Angina p".to_string(),
                    "Rintakipu.".to_string()
                ),
                (
                    "Lääkärikirja".to_string(),
                    "dlk00002".to_string(),
                    "Flunssa".to_string(),
                    "Nuha.".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn failed_listing_does_not_stop_other_categories() {
        let mock = MockURLCG::new(HashMap::from([
            navigation(),
            (
                "http://example.com/api?p_teos=ykt".to_string(),
                Err(FetchError::Status(500)),
            ),
            listing("far", FAR_LISTING),
            article("far00607", "Beetasalpaajat", "Verenpaine."),
        ]));
        let (orchestrator, store) = orchestrator(mock).await;

        let report = orchestrator.crawl().await;

        assert_eq!(report.categories_completed, 1);
        assert_eq!(report.categories_failed, 1);
        assert_eq!(report.articles.stored, 1);
        assert_eq!(
            store.stored_rows(),
            vec![(
                "Lääkkeet".to_string(),
                "far00607".to_string(),
                "Beetasal".to_string(),
                "Verenpaine.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn malformed_listing_fails_only_its_category() {
        let mock = MockURLCG::new(HashMap::from([
            navigation(),
            listing("ykt", r#"{"not": "an array"}"#),
            listing("far", FAR_LISTING),
            article("far00607", "Beetasalpaajat", "Verenpaine."),
        ]));
        let (orchestrator, store) = orchestrator(mock).await;

        let report = orchestrator.crawl().await;

        assert_eq!(report.categories_failed, 1);
        assert_eq!(report.articles.stored, 1);
        assert_eq!(store.stored_rows().len(), 1);
    }

    #[tokio::test]
    async fn failed_article_does_not_stop_category() {
        let mock = MockURLCG::new(HashMap::from([
            listing(
                "ykt",
                r#"[{"text": "Lääkärikirja", "nodes": [
                    {"text": "Missing", "href": "tk.koti?p_artikkeli=gone"},
                    {"text": "Broken", "href": "tk.koti?p_artikkeli=broken"},
                    {"text": "No id", "href": "tk.koti?p_teos=ykt"},
                    {"text": "Flunssa", "href": "tk.koti?p_artikkeli=dlk00002"}
                ]}]"#,
            ),
            (
                "http://example.com/tk/tk.koti?p_artikkeli=broken".to_string(),
                Ok(RawResponse::ok("text/html", "<p>no article here</p>")),
            ),
            (
                "http://example.com/tk/tk.koti?p_teos=ykt".to_string(),
                Ok(RawResponse::ok(
                    "text/html",
                    r#"<div id="duo-article"><h1>No id</h1></div>"#,
                )),
            ),
            article("dlk00002", "Flunssa", "Nuha."),
        ]));
        let (orchestrator, store) = orchestrator(mock).await;

        let report = orchestrator
            .run(vec![CategoryDescriptor {
                main_category: "Terveyskirjasto".to_string(),
                subcategory: "Lääkärikirja".to_string(),
                listing_id: "ykt".to_string(),
            }])
            .await;

        assert_eq!(report.categories_completed, 1);
        assert_eq!(report.articles.discovered, 4);
        assert_eq!(report.articles.failed, 3);
        assert_eq!(report.articles.stored, 1);
        assert_eq!(store.stored_rows().len(), 1);
    }

    /// Delegates to the mock but panics on one URL.
    #[derive(Clone)]
    struct PanickingCG {
        inner: MockURLCG,
        panic_on: String,
    }

    impl URLContentGetter for PanickingCG {
        async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
            if url == self.panic_on {
                panic!("getter crashed on {}", url);
            }
            self.inner.get(url).await
        }
    }

    #[tokio::test]
    async fn panicking_category_is_counted_as_failed() {
        let mock = MockURLCG::new(HashMap::from([
            navigation(),
            listing("far", FAR_LISTING),
            article("far00607", "Beetasalpaajat", "Verenpaine."),
        ]));
        let getter = PanickingCG {
            inner: mock,
            panic_on: "http://example.com/api?p_teos=ykt".to_string(),
        };
        let store = SqliteStore::open_in_memory().unwrap();
        let orchestrator = CrawlOrchestrator {
            fetcher: PageFetcher::new(getter, urls()),
            writer: ArticleWriter::new(store.clone()).await.unwrap(),
            worker_pool_size: 10,
        };

        let report = orchestrator.crawl().await;

        assert_eq!(report.categories, 2);
        assert_eq!(report.categories_completed, 1);
        assert_eq!(report.categories_failed, 1);
        assert_eq!(report.articles.stored, 1);
        assert_eq!(
            store.stored_rows(),
            vec![(
                "Lääkkeet".to_string(),
                "far00607".to_string(),
                "Beetasal".to_string(),
                "Verenpaine.".to_string()
            )]
        );
    }

    /// SQLite store whose content table rejects every insert.
    #[derive(Clone)]
    struct RejectingStore(SqliteStore);

    impl ArticleStore for RejectingStore {
        async fn ensure_schema(&self) -> Result<(), crate::error::PersistenceError> {
            self.0.ensure_schema().await
        }

        async fn insert_content(
            &self,
            _description: &str,
            _text: &str,
        ) -> Result<i64, crate::error::PersistenceError> {
            Err(crate::error::PersistenceError::Poisoned)
        }

        async fn insert_article(
            &self,
            row: &crate::persistence::ArticleRow,
        ) -> Result<(), crate::error::PersistenceError> {
            self.0.insert_article(row).await
        }
    }

    #[tokio::test]
    async fn article_without_written_sections_is_not_stored() {
        let mock = MockURLCG::new(HashMap::from([
            listing("far", FAR_LISTING),
            article("far00607", "Beetasalpaajat", "Verenpaine."),
        ]));
        let store = RejectingStore(SqliteStore::open_in_memory().unwrap());
        let orchestrator = CrawlOrchestrator {
            fetcher: PageFetcher::new(mock, urls()),
            writer: ArticleWriter::new(store).await.unwrap(),
            worker_pool_size: 1,
        };

        let report = orchestrator
            .run(vec![CategoryDescriptor {
                main_category: "Terveyskirjasto".to_string(),
                subcategory: "Lääkkeet".to_string(),
                listing_id: "far".to_string(),
            }])
            .await;

        assert_eq!(report.categories_completed, 1);
        assert_eq!(report.articles.stored, 0);
        assert_eq!(report.articles.failed, 1);
        assert_eq!(report.articles.sections_failed, 1);
    }

    #[tokio::test]
    async fn unreachable_navigation_yields_empty_report() {
        let (orchestrator, _) = orchestrator(MockURLCG::new(HashMap::new())).await;

        let report = orchestrator.crawl().await;

        assert_eq!(report.categories, 0);
        assert_eq!(report.categories_failed, 0);
    }

    #[tokio::test]
    async fn single_worker_processes_every_category() {
        let mock = MockURLCG::new(HashMap::from([
            listing("ykt", YKT_LISTING),
            listing("far", FAR_LISTING),
            article("dlk00001", "Angina", "Rintakipu."),
            article("dlk00002", "Flunssa", "Nuha."),
            article("far00607", "Beetasalpaajat", "Verenpaine."),
        ]));
        let (mut orchestrator, store) = orchestrator(mock).await;
        orchestrator.worker_pool_size = 1;

        let categories = ["ykt", "far"]
            .iter()
            .map(|id| CategoryDescriptor {
                main_category: "Terveyskirjasto".to_string(),
                subcategory: id.to_string(),
                listing_id: id.to_string(),
            })
            .collect();
        let report = orchestrator.run(categories).await;

        assert_eq!(report.categories_completed, 2);
        let ids: Vec<String> = store.stored_rows().into_iter().map(|row| row.1).collect();
        assert_eq!(ids, vec!["dlk00001", "dlk00002", "far00607"]);
    }
}
