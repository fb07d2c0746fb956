use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::spa::SpaDetector;
use crate::structured_data::extract_events;
use crate::tables::{parse_fixture_cells, row_cells};
use crate::team_names::split_fixture;
use crate::types::{group_records, LeagueGroup, MatchInfo, MatchRecord, TeamInfo};
use crate::utils::{element_text, find_time, format_time, match_id, parse_match_date};

const BASE_URL: &str = "https://www.soccerway.com";
const DEFAULT_COMPETITION: &str = "Competição";
const UNGROUPED: &str = "Outras";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid Soccerway selector")
}

/// Event-row class variants, tried in order until one yields matches.
static EVENT_ROWS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        selector(r#"div[class*="event__match"]"#),
        selector(r#"div[class*="event--twoLine"]"#),
        selector(r#"div[class*="event"][data-event-id]"#),
    ]
});
static HOME_TEAM: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="event__homeTeam"], [class*="event__participant--home"]"#));
static AWAY_TEAM: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="event__awayTeam"], [class*="event__participant--away"]"#));
static PARTICIPANT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="event__participant"]"#));
static EVENT_TIME: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="event__time"], [class*="event__stage--block"]"#));
static EVENT_DATE: LazyLock<Selector> = LazyLock::new(|| selector(r#"[class*="event__date"]"#));
static EVENT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="event__title"], [class*="event__league"]"#));
static MATCH_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a[href*="/matches/"], a[href*="/match/"]"#));
static LISTING_COMPETITION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="competition"], [class*="league"]"#));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", BASE_URL, href)
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Adapter for Soccerway/FlashScore listing pages. Dates are ISO
/// `YYYY-MM-DD`; rows without a date take the reference date.
pub struct SoccerwayParser {
    reference_date: NaiveDate,
    spa: SpaDetector,
}

impl SoccerwayParser {
    pub fn new(reference_date: NaiveDate, spa: SpaDetector) -> Self {
        Self { reference_date, spa }
    }

    fn record(
        &self,
        home: &str,
        away: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        competition: Option<String>,
        source_url: Option<String>,
    ) -> MatchRecord {
        MatchRecord::new(
            match_id(home, away),
            TeamInfo {
                name: home.to_string(),
                logo_url: String::new(),
            },
            TeamInfo {
                name: away.to_string(),
                logo_url: String::new(),
            },
            MatchInfo {
                date: date.unwrap_or(self.reference_date).format("%Y-%m-%d").to_string(),
                time: time.map_or_else(|| "00:00".to_string(), format_time),
                competition: competition
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_COMPETITION.to_string()),
                source_url,
            },
        )
    }

    /// Extracts every fixture on the page, or explains why there are none.
    pub fn parse(&self, html: &str) -> Result<Vec<MatchRecord>, ExtractError> {
        if self.spa.is_spa_shell_strict(html) {
            return Err(ExtractError::SpaShell {
                diagnostics: self.spa.diagnostics(html),
            });
        }

        let document = Html::parse_document(html);
        let strategies: [(&str, fn(&Self, &Html, &str) -> Vec<MatchRecord>); 4] = [
            ("event rows", Self::from_event_rows),
            ("structured data", Self::from_structured_data),
            ("match links", Self::from_match_links),
            ("tables", Self::from_tables),
        ];
        for (name, strategy) in strategies {
            let records = strategy(self, &document, html);
            if !records.is_empty() {
                info!("Soccerway: {} fixtures via {}", records.len(), name);
                return Ok(records);
            }
            debug!("Soccerway: no fixtures via {}", name);
        }

        Err(ExtractError::NoMatches {
            diagnostics: self.spa.diagnostics(html),
        })
    }

    fn teams_of_row(row: ElementRef<'_>) -> Option<(String, String)> {
        let home = first_text(row, &HOME_TEAM);
        let away = first_text(row, &AWAY_TEAM);
        let (home, away) = match (home, away) {
            (Some(home), Some(away)) => (home, away),
            _ => {
                let participants: Vec<String> = row
                    .select(&PARTICIPANT)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                if participants.len() < 2 {
                    return None;
                }
                (participants[0].clone(), participants[1].clone())
            }
        };
        if home.chars().count() < 2 || away.chars().count() < 2 || home == away {
            return None;
        }
        Some((home, away))
    }

    fn from_event_rows(&self, document: &Html, _html: &str) -> Vec<MatchRecord> {
        for rows in EVENT_ROWS.iter() {
            let inside_row = |element: &ElementRef<'_>| {
                element
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| rows.matches(&ancestor))
            };
            // Competition headers precede their rows in document order.
            let mut current_title: Option<String> = None;
            let mut records = Vec::new();
            for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
                if EVENT_TITLE.matches(&element) && !inside_row(&element) {
                    let title = element_text(element);
                    if !title.is_empty() {
                        current_title = Some(title);
                    }
                    continue;
                }
                if !rows.matches(&element) {
                    continue;
                }
                let Some((home, away)) = Self::teams_of_row(element) else {
                    continue;
                };
                let time = first_text(element, &EVENT_TIME).and_then(|t| find_time(&t));
                let date = first_text(element, &EVENT_DATE).and_then(|t| parse_match_date(&t));
                let url = element
                    .select(&MATCH_LINK)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(absolute_url);
                let competition = first_text(element, &EVENT_TITLE).or_else(|| current_title.clone());
                records.push(self.record(&home, &away, date, time, competition, url));
            }
            if !records.is_empty() {
                return records;
            }
        }
        Vec::new()
    }

    fn from_structured_data(&self, _document: &Html, html: &str) -> Vec<MatchRecord> {
        extract_events(html)
            .iter()
            .map(|event| {
                let start = event.start();
                let competition = Some(event.competition())
                    .filter(|c| !c.is_empty())
                    .or_else(|| Some(event.sport.clone()));
                let mut record = self.record(
                    &event.home_team.name,
                    &event.away_team.name,
                    start.map(|dt| dt.date()),
                    start.map(|dt| dt.time()),
                    competition,
                    (!event.url.is_empty()).then(|| event.url.clone()),
                );
                record.team_a.logo_url = event.home_team.image.clone();
                record.team_b.logo_url = event.away_team.image.clone();
                record
            })
            .collect()
    }

    fn from_match_links(&self, document: &Html, _html: &str) -> Vec<MatchRecord> {
        // Links carry only team names; date, time and competition come from
        // the first ones printed anywhere on the page.
        let page_text = element_text(document.root_element());
        let date = parse_match_date(&page_text);
        let time = find_time(&page_text);
        let competition = document
            .select(&LISTING_COMPETITION)
            .map(element_text)
            .find(|t| !t.is_empty());

        document
            .select(&MATCH_LINK)
            .filter(|a| a.value().attr("href").is_some_and(|h| h.contains("/matches/")))
            .filter_map(|link| {
                let (home, away) = split_fixture(&element_text(link))?;
                let url = link.value().attr("href").map(absolute_url);
                Some(self.record(&home, &away, date, time, competition.clone(), url))
            })
            .collect()
    }

    fn from_tables(&self, document: &Html, _html: &str) -> Vec<MatchRecord> {
        document
            .select(&TABLE)
            .filter(|table| {
                let inner = table.inner_html();
                inner.contains("team") || inner.contains("match") || inner.contains("vs")
            })
            .flat_map(|table| table.select(&ROW).collect::<Vec<_>>())
            .map(row_cells)
            .filter(|cells| cells.len() >= 3)
            .filter_map(|cells| parse_fixture_cells(&cells))
            .map(|fixture| {
                self.record(
                    &fixture.home,
                    &fixture.away,
                    fixture.date,
                    fixture.time,
                    fixture.competition,
                    None,
                )
            })
            .collect()
    }
}

/// Groups records by competition, in first-seen order.
pub fn group_by_competition(records: &[MatchRecord]) -> Vec<LeagueGroup> {
    group_records(records, |record| {
        if record.match_info.competition.is_empty() {
            UNGROUPED.to_string()
        } else {
            record.match_info.competition.clone()
        }
    })
}
