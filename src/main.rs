mod article;
mod article_list;
mod category_tree;
mod crawler;
mod error;
mod page_fetcher;
mod persistence;
mod settings;

use crawler::CrawlOrchestrator;
use page_fetcher::PageFetcher;
use persistence::{ArticleWriter, SqliteStore};
use settings::{Overrides, Settings};

use clap::Parser;

const CONFIG_EXIT_CODE: i32 = 3;

#[derive(Parser, Debug)]
#[command(version, about = "Crawls terveyskirjasto.fi articles into SQLite")]
pub struct Cli {
    /// Configuration file, JSON or TOML
    #[arg(short, long, default_value = settings::DEFAULT_CONFIG_FILE_PATH)]
    config: String,
    #[arg(short, long)]
    log_level: Option<String>,
    /// SQLite database file
    #[arg(short, long)]
    database: Option<String>,
    /// Category pipelines run at once
    #[arg(short, long)]
    workers: Option<u32>,
}

fn fail_startup(message: String) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(CONFIG_EXIT_CODE);
}

#[tokio::main]
async fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let overrides = Overrides {
        database: args.database,
        log_level: args.log_level,
        workers: args.workers,
    };
    let settings = match Settings::load(&args.config, &overrides) {
        Ok(settings) => settings,
        Err(e) => fail_startup(format!("{} ({})", e, args.config)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "terveyskirjasto_crawler={}",
            settings.logging.level
        ))
        .compact()
        .init();

    let store = match SqliteStore::open(&settings.database.path, settings.database.echo) {
        Ok(store) => store,
        Err(e) => fail_startup(format!("{} ({})", e, settings.database.path)),
    };
    let writer = match ArticleWriter::new(store).await {
        Ok(writer) => writer,
        Err(e) => fail_startup(e.to_string()),
    };

    let fetcher = PageFetcher::new(reqwest::Client::new(), settings.site.clone()).with_retries(
        settings.crawl.max_retries,
        settings.crawl.initial_retry_delay_ms,
    );
    tracing::info!("Crawling {}", fetcher.urls().root_url);

    let orchestrator = CrawlOrchestrator {
        fetcher,
        writer,
        worker_pool_size: settings.crawl.worker_pool_size,
    };
    let report = orchestrator.crawl().await;
    tracing::info!("Crawl finished in {:.2} seconds", report.elapsed_secs());
    println!("{}", report);
}
