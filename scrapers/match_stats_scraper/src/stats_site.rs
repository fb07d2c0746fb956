use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::config::LiveWindows;
use crate::error::{Diagnostics, ExtractError};
use crate::form::{extract_form, extract_head_to_head};
use crate::live_status::{
    extract_event_live_status, extract_event_odds, extract_live_status, extract_odds,
};
use crate::opponent_analysis::extract_scoped_opponent_analysis;
use crate::spa::SpaDetector;
use crate::standings::{extract_standings, extract_team_goal_stats};
use crate::streaks::extract_all_streaks;
use crate::structured_data::{extract_events, SportsEvent};
use crate::tables::{find_table_for_team, find_team_tables, TableKind, TeamTable};
use crate::types::{
    group_records, LeagueGroup, LiveStatus, MatchInfo, MatchRecord, MatchStatus, Odds, Scoped,
    StreakCounters, TeamInfo,
};
use crate::utils::{element_text, format_pt_br_date, format_time, match_id};

pub const UNKNOWN_COMPETITION: &str = "Competição não informada";
pub const OTHER_LEAGUES: &str = "Outras Ligas";
const DEFAULT_TIME: &str = "00:00";

static LEAGUE_HEADINGS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"h2[class*="league"], h3[class*="league"], h4[class*="league"], div[class*="competition"], span[class*="league"]"#,
    )
    .expect("Invalid league heading selector")
});
static KNOWN_LEAGUES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Brasileirão|Premier League|La Liga|Serie A|Bundesliga|Ligue 1|Champions League|Europa League")
        .expect("Invalid league names regex")
});

/// Everything a listing page yielded. Live statuses and odds are keyed by
/// record id and are also attached to the records themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchListing {
    pub records: Vec<MatchRecord>,
    pub events: Vec<SportsEvent>,
    pub live_statuses: BTreeMap<String, LiveStatus>,
    pub odds: BTreeMap<String, Odds>,
    pub leagues: Vec<LeagueGroup>,
    pub diagnostics: Diagnostics,
}

/// Optional context for a match-details page.
#[derive(Debug, Clone, Default)]
pub struct DetailsHints {
    pub match_id: Option<String>,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
}

/// Adapter for the primary stats site: listing pages carry structured data,
/// details pages carry per-team tables labelled by subtitles.
pub struct StatsSiteParser {
    reference_date: NaiveDate,
    windows: LiveWindows,
    spa: SpaDetector,
}

impl StatsSiteParser {
    pub fn new(reference_date: NaiveDate, windows: LiveWindows, spa: SpaDetector) -> Self {
        Self {
            reference_date,
            windows,
            spa,
        }
    }

    fn match_info_from_event(&self, event: &SportsEvent) -> MatchInfo {
        let start = event.start();
        let competition = event.competition();
        MatchInfo {
            date: format_pt_br_date(start.map_or(self.reference_date, |dt| dt.date())),
            time: start.map_or_else(|| DEFAULT_TIME.to_string(), |dt| format_time(dt.time())),
            competition: if competition.is_empty() {
                UNKNOWN_COMPETITION.to_string()
            } else {
                competition
            },
            source_url: (!event.url.is_empty()).then(|| event.url.clone()),
        }
    }

    pub fn record_from_event(&self, event: &SportsEvent) -> MatchRecord {
        MatchRecord::new(
            match_id(&event.home_team.name, &event.away_team.name),
            TeamInfo {
                name: event.home_team.name.clone(),
                logo_url: event.home_team.image.clone(),
            },
            TeamInfo {
                name: event.away_team.name.clone(),
                logo_url: event.away_team.image.clone(),
            },
            self.match_info_from_event(event),
        )
    }

    /// Parses a listing page into one record per structured-data event.
    pub fn process_matches_html(&self, html: &str) -> Result<MatchListing, ExtractError> {
        let events = extract_events(html);
        info!("Found {} events in listing page", events.len());

        if events.is_empty() {
            let diagnostics = self.spa.diagnostics(html);
            if self.spa.is_spa_shell(html) {
                return Err(ExtractError::SpaShell { diagnostics });
            }
            return Err(ExtractError::NoMatches { diagnostics });
        }

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut live_statuses = BTreeMap::new();
        let mut odds = BTreeMap::new();

        for event in &events {
            let mut record = self.record_from_event(event);
            if !seen.insert(record.id.clone()) {
                debug!("Skipping duplicate event {}", record.id);
                continue;
            }
            if !event.url.is_empty() {
                if let Some(status) =
                    extract_event_live_status(html, &event.url, self.windows.status_radius)
                {
                    live_statuses.insert(record.id.clone(), status.clone());
                    record.live_status = Some(status);
                }
                if let Some(prices) = extract_event_odds(html, &event.url, self.windows.odds_radius) {
                    odds.insert(record.id.clone(), prices.clone());
                    record.odds = Some(prices);
                }
            }
            records.push(record);
        }

        let leagues = group_by_league(&records, html);
        info!(
            "Built {} records in {} leagues ({} live, {} with odds)",
            records.len(),
            leagues.len(),
            live_statuses.len(),
            odds.len()
        );

        Ok(MatchListing {
            records,
            events,
            live_statuses,
            odds,
            leagues,
            diagnostics: self.spa.diagnostics(html),
        })
    }

    /// Parses a match-details page into a record with every block the page
    /// carries filled in.
    pub fn parse_match_details(&self, html: &str, hints: &DetailsHints) -> Result<MatchRecord, ExtractError> {
        let document = Html::parse_document(html);
        let event = extract_events(html).into_iter().next();

        let form_tables = find_team_tables(&document, TableKind::RecentForm);
        let (team_a, team_b) = match (&hints.team_a, &hints.team_b, &event) {
            (Some(a), Some(b), _) => (a.clone(), b.clone()),
            (_, _, Some(event)) => (event.home_team.name.clone(), event.away_team.name.clone()),
            _ if form_tables.len() >= 2 => (form_tables[0].team.clone(), form_tables[1].team.clone()),
            _ => {
                warn!("Could not identify the teams of the match");
                return Err(ExtractError::MissingMatchInfo {
                    diagnostics: self.spa.diagnostics(html),
                });
            }
        };

        let match_info = match &event {
            Some(event) => self.match_info_from_event(event),
            None => MatchInfo {
                date: format_pt_br_date(self.reference_date),
                time: DEFAULT_TIME.to_string(),
                competition: UNKNOWN_COMPETITION.to_string(),
                source_url: None,
            },
        };
        let logo = |name: &str| -> String {
            event
                .as_ref()
                .map(|e| {
                    if e.home_team.name == name {
                        e.home_team.image.clone()
                    } else if e.away_team.name == name {
                        e.away_team.image.clone()
                    } else {
                        String::new()
                    }
                })
                .unwrap_or_default()
        };

        let mut record = MatchRecord::new(
            hints
                .match_id
                .clone()
                .unwrap_or_else(|| match_id(&team_a, &team_b)),
            TeamInfo {
                logo_url: logo(&team_a),
                name: team_a.clone(),
            },
            TeamInfo {
                logo_url: logo(&team_b),
                name: team_b.clone(),
            },
            match_info,
        );

        if let Some(table) = find_table_for_team(&form_tables, &team_a) {
            record.team_a_form = extract_form(table.table, Some(&team_a));
        }
        if let Some(table) = find_table_for_team(&form_tables, &team_b) {
            record.team_b_form = extract_form(table.table, Some(&team_b));
        }
        record.h2h_data = extract_head_to_head(&document, Some(&team_a));

        let streak_tables = find_team_tables(&document, TableKind::Streaks);
        record.team_a_streaks = scoped_streaks(&streak_tables, &team_a);
        record.team_b_streaks = scoped_streaks(&streak_tables, &team_b);

        let analysis_tables = find_team_tables(&document, TableKind::OpponentAnalysis);
        if let Some(table) = find_table_for_team(&analysis_tables, &team_a) {
            record.team_a_opponent_analysis = extract_scoped_opponent_analysis(table.table, &team_a);
        }
        if let Some(table) = find_table_for_team(&analysis_tables, &team_b) {
            record.team_b_opponent_analysis = extract_scoped_opponent_analysis(table.table, &team_b);
        }

        record.standings_data = extract_standings(&document);
        if let Some(stats) = extract_team_goal_stats(html, &team_a) {
            record.team_a_goal_stats.global = stats;
        }
        if let Some(stats) = extract_team_goal_stats(html, &team_b) {
            record.team_b_goal_stats.global = stats;
        }

        let status = extract_live_status(html);
        if status.is_live || status.status != MatchStatus::Scheduled {
            record.live_status = Some(status);
        }
        record.odds = extract_odds(html);

        debug!(
            "Details for {}: form {}/{}, h2h {}, standings {}",
            record.id,
            record.team_a_form.len(),
            record.team_b_form.len(),
            record.h2h_data.len(),
            record.standings_data.len()
        );
        Ok(record)
    }
}

fn scoped_streaks(tables: &[TeamTable<'_>], team: &str) -> Scoped<StreakCounters> {
    find_table_for_team(tables, team)
        .map(|table| extract_all_streaks(table.table))
        .unwrap_or_default()
}

/// League names the page advertises, in document order.
fn page_leagues(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut leagues: Vec<String> = Vec::new();
    let headings = document.select(&LEAGUE_HEADINGS).map(element_text);
    let known = KNOWN_LEAGUES_RE.find_iter(html).map(|m| m.as_str().to_string());
    for name in headings.chain(known) {
        if !name.is_empty() && !leagues.contains(&name) {
            leagues.push(name);
        }
    }
    leagues
}

/// Groups listing records under the page's league headings, falling back to
/// the record's own competition. Larger groups come first.
pub fn group_by_league(records: &[MatchRecord], html: &str) -> Vec<LeagueGroup> {
    let leagues = page_leagues(html);
    let mut groups = group_records(records, |record| {
        let competition = record.match_info.competition.to_lowercase();
        if competition.is_empty() || record.match_info.competition == UNKNOWN_COMPETITION {
            return OTHER_LEAGUES.to_string();
        }
        leagues
            .iter()
            .find(|league| {
                let league = league.to_lowercase();
                competition.contains(&league) || league.contains(&competition)
            })
            .cloned()
            .unwrap_or_else(|| record.match_info.competition.clone())
    });
    groups.sort_by(|a, b| b.matches.len().cmp(&a.matches.len()));
    groups
}
