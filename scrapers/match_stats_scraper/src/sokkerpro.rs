use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::spa::SpaDetector;
use crate::structured_data::extract_events;
use crate::tables::{parse_fixture_cells, row_cells, FixtureRow};
use crate::team_names::split_fixture;
use crate::types::{MatchInfo, MatchRecord, TeamInfo};
use crate::utils::{element_text, find_time, format_time, match_id, parse_match_date};

const DEFAULT_COMPETITION: &str = "Competição";
const MATCH_INDICATORS: [&str; 6] = ["vs", "x", ":", "match", "game", "team"];

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("Invalid table selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("Invalid tr selector"));
static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("Invalid th selector"));
static MATCH_CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"div[class*="match"], div[class*="game"], div[class*="jogo"], div[class*="fixture"], div[id*="match"], div[id*="game"], div[id*="jogo"], div[id*="fixture"]"#,
    )
    .expect("Invalid match card selector")
});
static CLOCK_OR_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[:/.]\d{2}(?:[/.]\d{2,4})?\b").expect("Invalid clock/date regex")
});
static CARD_TEAM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="team"]"#).expect("Invalid card team selector"));

/// Adapter for SokkerPro pages: structured data first, then fixture
/// tables, then match cards.
pub struct SokkerProParser {
    reference_date: NaiveDate,
    spa: SpaDetector,
}

impl SokkerProParser {
    pub fn new(reference_date: NaiveDate, spa: SpaDetector) -> Self {
        Self { reference_date, spa }
    }

    fn record_from_fixture(&self, fixture: FixtureRow) -> MatchRecord {
        MatchRecord::new(
            match_id(&fixture.home, &fixture.away),
            TeamInfo {
                name: fixture.home,
                logo_url: String::new(),
            },
            TeamInfo {
                name: fixture.away,
                logo_url: String::new(),
            },
            MatchInfo {
                date: fixture
                    .date
                    .unwrap_or(self.reference_date)
                    .format("%Y-%m-%d")
                    .to_string(),
                time: fixture.time.map_or_else(|| "00:00".to_string(), format_time),
                competition: fixture
                    .competition
                    .unwrap_or_else(|| DEFAULT_COMPETITION.to_string()),
                source_url: None,
            },
        )
    }

    pub fn parse(&self, html: &str) -> Result<Vec<MatchRecord>, ExtractError> {
        if self.spa.is_spa_shell(html) {
            debug!("SokkerPro page is an unrendered shell");
            return Err(ExtractError::SpaShell {
                diagnostics: self.spa.diagnostics(html),
            });
        }

        let mut records = self.from_structured_data(html);
        let document = Html::parse_document(html);
        if records.is_empty() {
            records = self.from_tables(&document);
        }
        if records.is_empty() {
            records = self.from_cards(&document);
        }

        if records.is_empty() {
            return Err(ExtractError::NoMatches {
                diagnostics: self.spa.diagnostics(html),
            });
        }
        info!("SokkerPro: {} fixtures", records.len());
        Ok(records)
    }

    fn from_structured_data(&self, html: &str) -> Vec<MatchRecord> {
        extract_events(html)
            .iter()
            .map(|event| {
                let start = event.start();
                let competition = [event.competition(), event.sport.clone()]
                    .into_iter()
                    .find(|c| !c.is_empty());
                let mut record = self.record_from_fixture(FixtureRow {
                    home: event.home_team.name.clone(),
                    away: event.away_team.name.clone(),
                    date: start.map(|dt| dt.date()),
                    time: start.map(|dt| dt.time()),
                    competition,
                });
                record.team_a.logo_url = event.home_team.image.clone();
                record.team_b.logo_url = event.away_team.image.clone();
                record.match_info.source_url = (!event.url.is_empty()).then(|| event.url.clone());
                record
            })
            .collect()
    }

    fn looks_like_fixture_table(table: ElementRef<'_>) -> bool {
        let text = element_text(table);
        let inner = table.inner_html();
        MATCH_INDICATORS
            .iter()
            .any(|marker| text.contains(marker) || inner.contains(marker))
    }

    fn from_tables(&self, document: &Html) -> Vec<MatchRecord> {
        document
            .select(&TABLE)
            .filter(|table| Self::looks_like_fixture_table(*table))
            .flat_map(|table| table.select(&ROW).collect::<Vec<_>>())
            .filter(|row| {
                row.select(&HEADER_CELL).next().is_none()
                    && !row.value().attr("class").unwrap_or_default().contains("header")
            })
            .map(row_cells)
            .filter(|cells| cells.len() >= 2)
            .filter_map(|cells| parse_fixture_cells(&cells))
            .map(|fixture| self.record_from_fixture(fixture))
            .collect()
    }

    /// Cards either mark their two teams with `team` classes or print
    /// "Home x Away" somewhere in their text.
    fn from_cards(&self, document: &Html) -> Vec<MatchRecord> {
        let mut records: Vec<MatchRecord> = Vec::new();
        for card in document.select(&MATCH_CARD) {
            let text = element_text(card);
            let teams: Vec<String> = card
                .select(&CARD_TEAM)
                .map(element_text)
                .filter(|t| t.chars().count() >= 2)
                .collect();
            let pair = match teams.as_slice() {
                [home, away, ..] if home != away => Some((home.clone(), away.clone())),
                _ => split_fixture(&CLOCK_OR_DATE_RE.replace_all(&text, " ")),
            };
            let Some((home, away)) = pair else {
                continue;
            };
            let record = self.record_from_fixture(FixtureRow {
                home,
                away,
                date: parse_match_date(&text),
                time: find_time(&text),
                competition: None,
            });
            // Nested cards describe the same fixture.
            if !records.iter().any(|r| r.id == record.id) {
                records.push(record);
            }
        }
        records
    }
}
