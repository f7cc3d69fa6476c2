use std::fmt::{Display, Formatter, Result};

use jiff::Timestamp;

/// Tally of one category pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CategoryCounts {
    pub discovered: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub stored: usize,
    pub failed: usize,
    pub sections_written: usize,
    pub sections_failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub categories: usize,
    pub categories_completed: usize,
    pub categories_failed: usize,
    pub articles: CategoryCounts,
    started: Timestamp,
    finished: Option<Timestamp>,
}

impl CrawlReport {
    pub fn new(categories: usize) -> Self {
        CrawlReport {
            categories,
            categories_completed: 0,
            categories_failed: 0,
            articles: CategoryCounts::default(),
            started: Timestamp::now(),
            finished: None,
        }
    }

    pub fn add_completed(&mut self, counts: &CategoryCounts) {
        self.categories_completed += 1;
        let total = &mut self.articles;
        total.discovered += counts.discovered;
        total.skipped += counts.skipped;
        total.malformed += counts.malformed;
        total.stored += counts.stored;
        total.failed += counts.failed;
        total.sections_written += counts.sections_written;
        total.sections_failed += counts.sections_failed;
    }

    pub fn add_failed(&mut self) {
        self.categories_failed += 1;
    }

    pub fn finish(&mut self) {
        self.finished = Some(Timestamp::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.finished
            .unwrap_or_else(Timestamp::now)
            .duration_since(self.started)
            .as_secs_f64()
    }

    pub fn get_status(&self) -> String {
        format!(
            "\nCrawl - {}/{} categories ({} failed)\n{} articles discovered, {} stored, {} failed, {} skipped, {} malformed subtrees\n{} sections written, {} failed\nCompleted in {:.2} seconds",
            self.categories_completed,
            self.categories,
            self.categories_failed,
            self.articles.discovered,
            self.articles.stored,
            self.articles.failed,
            self.articles.skipped,
            self.articles.malformed,
            self.articles.sections_written,
            self.articles.sections_failed,
            self.elapsed_secs(),
        )
    }
}

impl Display for CrawlReport {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", &self.get_status())
    }
}
