use scraper::Html;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::standings::{extract_competition_name, extract_standings, extract_team_goal_stats};
use crate::types::{Standing, TeamGoalStats};

/// A competition page: its name, league table and the goal statistics of
/// every listed team that has any on the page.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionData {
    pub name: String,
    pub standings: Vec<Standing>,
    pub team_stats: BTreeMap<String, TeamGoalStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub fn parse_competition(html: &str, url: Option<&str>) -> CompetitionData {
    let document = Html::parse_document(html);
    let name = extract_competition_name(&document);
    let mut standings = extract_standings(&document);
    for standing in &mut standings {
        standing.competition = Some(name.clone());
    }

    let team_stats: BTreeMap<String, TeamGoalStats> = standings
        .iter()
        .filter_map(|s| extract_team_goal_stats(html, &s.team).map(|stats| (s.team.clone(), stats)))
        .collect();

    info!(
        "Competition '{}': {} teams, {} with goal stats",
        name,
        standings.len(),
        team_stats.len()
    );

    CompetitionData {
        name,
        standings,
        team_stats,
        url: url.map(str::to_string),
    }
}
