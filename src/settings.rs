use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::SettingsError;
use crate::page_fetcher::SiteUrls;

pub const DEFAULT_CONFIG_FILE_PATH: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    pub path: String,
    /// Log every statement at debug level.
    #[serde(default)]
    pub echo: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub worker_pool_size: usize,
    pub max_retries: u8,
    pub initial_retry_delay_ms: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        CrawlSettings {
            worker_pool_size: 100,
            max_retries: 0,
            initial_retry_delay_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub site: SiteUrls,
    #[serde(default)]
    pub crawl: CrawlSettings,
}

/// Command line values that take precedence over every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database: Option<String>,
    pub log_level: Option<String>,
    pub workers: Option<u32>,
}

impl Settings {
    /// Reads `path` (if it exists), then `TK_*` environment variables, then `overrides`.
    pub fn load(path: &str, overrides: &Overrides) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TK")
                    .prefix_separator("_")
                    .separator("__"),
            );
        Settings::build(builder, overrides)
    }

    fn build(
        builder: ConfigBuilder<DefaultState>,
        overrides: &Overrides,
    ) -> Result<Self, SettingsError> {
        let settings: Settings = builder
            .set_override_option("database.path", overrides.database.clone())?
            .set_override_option("logging.level", overrides.log_level.clone())?
            .set_override_option("crawl.worker_pool_size", overrides.workers.map(i64::from))?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.database.path.trim().is_empty() {
            return Err(SettingsError::Invalid("database.path is empty".to_string()));
        }
        if !self.site.listing_url_template.contains("{teos}") {
            return Err(SettingsError::Invalid(
                "site.listing_url_template lacks a {teos} placeholder".to_string(),
            ));
        }
        if self.site.article_placeholder.is_empty() {
            return Err(SettingsError::Invalid(
                "site.article_placeholder is empty".to_string(),
            ));
        }
        if !self.site.root_url.contains(&self.site.article_placeholder) {
            return Err(SettingsError::Invalid(format!(
                "site.root_url does not contain {:?}",
                self.site.article_placeholder
            )));
        }
        if self.crawl.worker_pool_size == 0 {
            return Err(SettingsError::Invalid(
                "crawl.worker_pool_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
