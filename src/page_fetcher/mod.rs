mod backoff;
#[allow(clippy::module_inception)]
mod page_fetcher;
mod url_content_getter;

pub use page_fetcher::{PageFetcher, SiteUrls};
pub use url_content_getter::URLContentGetter;

#[cfg(test)]
pub use page_fetcher::tests::MockURLCG;
#[cfg(test)]
pub use url_content_getter::RawResponse;
