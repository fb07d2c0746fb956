use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use match_stats_scraper::config::ScraperConfig;
use match_stats_scraper::fetch::{HtmlFetcher, WebHtmlFetcher};
use match_stats_scraper::live_status::{extract_live_status, extract_odds};
use match_stats_scraper::match_scraper::{MatchScraper, ParseOutput, Source};
use match_stats_scraper::output::{output_paths, write_csv_summary, write_json};
use match_stats_scraper::stats_site::DetailsHints;
use match_stats_scraper::types::{LiveStatus, Odds};
use match_stats_scraper::utils::slugify;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process a saved page or OpenLigaDB payload
    ProcessFile {
        /// Path to the HTML or JSON file to process
        #[arg(short, long)]
        file: PathBuf,

        /// Source of the file; guessed from the content when omitted
        #[arg(short, long, value_enum)]
        source: Option<Source>,

        /// Keep only OpenLigaDB matches on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Page URL, recorded on competition output
        #[arg(long)]
        url: Option<String>,
    },
    /// Parse a stats-site match page
    Details {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        match_id: Option<String>,

        /// Home team, when the page does not name it
        #[arg(long)]
        team_a: Option<String>,

        /// Away team, when the page does not name it
        #[arg(long)]
        team_b: Option<String>,
    },
    /// Print the live status and odds found in a page
    Live {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Download a page and process it
    Fetch {
        #[arg(short, long)]
        url: String,

        #[arg(short, long, value_enum)]
        source: Option<Source>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveReport {
    live_status: LiveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    odds: Option<Odds>,
}

struct FileProcessor {
    output_dir: PathBuf,
}

impl FileProcessor {
    fn new(config: &ScraperConfig) -> Result<Self> {
        fs::create_dir_all(&config.output_dir)
            .with_context(|| format!("Failed to create output dir {:?}", config.output_dir))?;
        Ok(Self {
            output_dir: config.output_dir.clone(),
        })
    }

    fn parse(&self, scraper: &MatchScraper, content: &str, source: Option<Source>) -> Result<ParseOutput> {
        let source = source.unwrap_or_else(|| Source::detect(content));
        scraper.parse(content, source).map_err(|e| {
            if let Some(diagnostics) = e.diagnostics() {
                warn!("Extraction failed: {:?}", diagnostics);
            }
            anyhow::Error::from(e)
        })
    }

    fn write(&self, name: &Path, output: &ParseOutput) -> Result<()> {
        let (json_path, csv_path) = output_paths(&self.output_dir, name, None);
        write_json(&json_path, output)?;
        let records = output.records();
        if !records.is_empty() {
            write_csv_summary(&csv_path, &records)?;
        }
        info!("{} records written for {:?}", records.len(), name);
        Ok(())
    }

    fn process_file(&self, path: &Path, scraper: &MatchScraper, source: Option<Source>) -> Result<()> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        info!("Processing {:?}", path);
        let output = self.parse(scraper, &content, source)?;
        self.write(path, &output)
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();

    match cli.command {
        Commands::ProcessFile {
            file,
            source,
            date,
            url,
        } => {
            let processor = FileProcessor::new(&config)?;
            let scraper = MatchScraper::new(&config).date_filter(date).source_url(url);
            processor.process_file(&file, &scraper, source)?;
        }
        Commands::Details {
            file,
            match_id,
            team_a,
            team_b,
        } => {
            let processor = FileProcessor::new(&config)?;
            let scraper = MatchScraper::new(&config).hints(DetailsHints {
                match_id,
                team_a,
                team_b,
            });
            processor.process_file(&file, &scraper, Some(Source::StatsSiteDetails))?;
        }
        Commands::Live { file } => {
            let html = fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let now = Utc::now();
            let report = LiveReport {
                live_status: extract_live_status(&html).stamped(now),
                odds: extract_odds(&html).map(|odds| odds.stamped(now)),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Fetch { url, source } => {
            let processor = FileProcessor::new(&config)?;
            let fetcher = WebHtmlFetcher::new(&config.scraping)?;
            let content = fetcher.fetch(&url)?;
            let scraper = MatchScraper::new(&config).source_url(Some(url.clone()));
            let output = processor.parse(&scraper, &content, source)?;
            processor.write(Path::new(&format!("{}.html", slugify(&url))), &output)?;
        }
    }

    Ok(())
}
