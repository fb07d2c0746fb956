use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use match_stats_scraper::config::ScraperConfig;
use match_stats_scraper::match_scraper::{MatchScraper, Source};
use match_stats_scraper::output::{output_paths, write_csv_summary, write_json};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the saved pages
    #[arg(short, long, default_value = "html_files")]
    input: PathBuf,

    /// Source of every file; guessed per file when omitted
    #[arg(short, long, value_enum)]
    source: Option<Source>,

    /// Number of files to process (for testing)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Number of worker threads
    #[arg(short, long, default_value = "8")]
    parallel: usize,

    /// Reprocess files that already have output
    #[arg(long)]
    force: bool,
}

fn process_file(
    path: &Path,
    input_root: &Path,
    scraper: &MatchScraper,
    source: Option<Source>,
    output_dir: &Path,
) -> Result<usize> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let source = source.unwrap_or_else(|| Source::detect(&content));
    let output = scraper.parse(&content, source)?;

    let (json_path, csv_path) = output_paths(output_dir, path, Some(input_root));
    write_json(&json_path, &output)?;
    let records = output.records();
    if !records.is_empty() {
        write_csv_summary(&csv_path, &records)?;
    }
    Ok(records.len())
}

fn html_files(input: &Path, output_dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("Failed to list {:?}", input))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "html") {
            let (json_path, _) = output_paths(output_dir, &path, Some(input));
            if force || !json_path.exists() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();
    fs::create_dir_all(&config.output_dir)?;

    let mut files = html_files(&cli.input, &config.output_dir, cli.force)?;
    if let Some(limit) = cli.limit {
        files.truncate(limit);
    }

    let total_files = files.len();
    println!("Found {} HTML files to process", total_files);

    let pb = ProgressBar::new(total_files as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta})")?,
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.parallel.max(1))
        .build()?;
    let scraper = MatchScraper::new(&config);

    let results: Vec<(PathBuf, Result<usize>)> = pool.install(|| {
        files
            .par_iter()
            .progress_with(pb.clone())
            .map(|path| {
                let result = process_file(path, &cli.input, &scraper, cli.source, &config.output_dir);
                (path.clone(), result)
            })
            .collect()
    });

    let mut records = 0;
    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(count) => records += count,
            Err(e) => {
                failures += 1;
                error!("Error processing {:?}: {:#}", path, e);
            }
        }
    }

    pb.finish_with_message("Done!");
    info!(
        "Processed {} files: {} records, {} failures",
        total_files, records, failures
    );
    Ok(())
}
