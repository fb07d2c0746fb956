use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, info};

use crate::competition::{parse_competition, CompetitionData};
use crate::config::ScraperConfig;
use crate::error::ExtractError;
use crate::openligadb;
use crate::soccerway::SoccerwayParser;
use crate::sokkerpro::SokkerProParser;
use crate::spa::SpaDetector;
use crate::stats_site::{DetailsHints, MatchListing, StatsSiteParser};
use crate::types::MatchRecord;
use crate::utils::brasilia_offset;

/// Upstream a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Stats-site listing page (structured-data events)
    StatsSite,
    /// Stats-site match page (per-team tables)
    StatsSiteDetails,
    Soccerway,
    #[value(name = "sokkerpro")]
    SokkerPro,
    #[value(name = "openligadb")]
    OpenLigaDb,
    /// Generic competition page with a league table
    Competition,
}

impl Source {
    /// Guesses the source from the document itself. Competition pages are
    /// never guessed.
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim_start();
        let source = if trimmed.starts_with('[') || trimmed.starts_with('{') {
            Source::OpenLigaDb
        } else if content.contains("event__") {
            Source::Soccerway
        } else if content.to_lowercase().contains("sokkerpro") {
            Source::SokkerPro
        } else if content.contains("stat-last10") || content.contains("stat-seqs") {
            Source::StatsSiteDetails
        } else {
            Source::StatsSite
        };
        debug!("Detected source {:?}", source);
        source
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ParseOutput {
    Listing(MatchListing),
    Details(Box<MatchRecord>),
    Matches(Vec<MatchRecord>),
    Competition(CompetitionData),
}

impl ParseOutput {
    pub fn records(&self) -> Vec<&MatchRecord> {
        match self {
            ParseOutput::Listing(listing) => listing.records.iter().collect(),
            ParseOutput::Details(record) => vec![record.as_ref()],
            ParseOutput::Matches(records) => records.iter().collect(),
            ParseOutput::Competition(_) => Vec::new(),
        }
    }
}

/// Entry point tying the adapters together. Every adapter shares one
/// reference date, used wherever a page omits the match date.
pub struct MatchScraper {
    reference_date: NaiveDate,
    date_filter: Option<NaiveDate>,
    hints: DetailsHints,
    source_url: Option<String>,
    stats_site: StatsSiteParser,
    soccerway: SoccerwayParser,
    sokkerpro: SokkerProParser,
}

impl MatchScraper {
    /// Uses today's date in Brasília as the reference date.
    pub fn new(config: &ScraperConfig) -> Self {
        let today = Utc::now().with_timezone(&brasilia_offset()).date_naive();
        Self::with_reference_date(config, today)
    }

    pub fn with_reference_date(config: &ScraperConfig, reference_date: NaiveDate) -> Self {
        let spa = SpaDetector::new(config.spa);
        Self {
            reference_date,
            date_filter: None,
            hints: DetailsHints::default(),
            source_url: None,
            stats_site: StatsSiteParser::new(reference_date, config.live, spa),
            soccerway: SoccerwayParser::new(reference_date, spa),
            sokkerpro: SokkerProParser::new(reference_date, spa),
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Keeps only OpenLigaDB matches on this day.
    pub fn date_filter(mut self, day: Option<NaiveDate>) -> Self {
        self.date_filter = day;
        self
    }

    pub fn hints(mut self, hints: DetailsHints) -> Self {
        self.hints = hints;
        self
    }

    /// Recorded on competition pages.
    pub fn source_url(mut self, url: Option<String>) -> Self {
        self.source_url = url;
        self
    }

    pub fn parse_auto(&self, content: &str) -> Result<ParseOutput, ExtractError> {
        self.parse(content, Source::detect(content))
    }

    pub fn parse(&self, content: &str, source: Source) -> Result<ParseOutput, ExtractError> {
        info!("Parsing {} bytes as {:?}", content.len(), source);
        let output = match source {
            Source::StatsSite => ParseOutput::Listing(self.stats_site.process_matches_html(content)?),
            Source::StatsSiteDetails => ParseOutput::Details(Box::new(
                self.stats_site.parse_match_details(content, &self.hints)?,
            )),
            Source::Soccerway => ParseOutput::Matches(self.soccerway.parse(content)?),
            Source::SokkerPro => ParseOutput::Matches(self.sokkerpro.parse(content)?),
            Source::OpenLigaDb => {
                ParseOutput::Matches(openligadb::parse_matches(content, self.date_filter)?)
            }
            Source::Competition => {
                ParseOutput::Competition(parse_competition(content, self.source_url.as_deref()))
            }
        };
        Ok(output)
    }
}
