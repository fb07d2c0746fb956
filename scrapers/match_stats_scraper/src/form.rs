use scraper::{ElementRef, Html};
use tracing::debug;

use crate::tables::{find_tables, is_header_row, row_cells, table_rows, TableKind};
use crate::team_names::side_of;
use crate::types::{MatchResult, ResultMarker};
use crate::utils::parse_score;

/// Parses a row laid out as date, competition, home, score, away. Rows
/// without a played score are upcoming fixtures and yield `None`.
fn parse_result_row(cells: &[String], subject: Option<&str>) -> Option<MatchResult> {
    if cells.len() < 5 {
        return None;
    }
    let (home_score, away_score) = parse_score(&cells[3])?;
    let home_team = cells[2].clone();
    let away_team = cells[4].clone();
    if home_team.is_empty() || away_team.is_empty() {
        return None;
    }

    let result_for_team = subject
        .and_then(|subject| side_of(subject, &home_team, &away_team))
        .map(|side| ResultMarker::derive(home_score, away_score, Some(side)));

    Some(MatchResult {
        date: cells[0].clone(),
        competition: cells[1].clone(),
        home_team,
        away_team,
        home_score,
        away_score,
        result_for_team,
    })
}

/// Recent results from a `stat-last10` table.
pub fn extract_form(table: ElementRef<'_>, subject: Option<&str>) -> Vec<MatchResult> {
    let results: Vec<MatchResult> = table_rows(table)
        .into_iter()
        .filter(|row| !is_header_row(*row))
        .filter_map(|row| parse_result_row(&row_cells(row), subject))
        .collect();
    debug!("Extracted {} form rows", results.len());
    results
}

/// Head-to-head results from the first `stat-cd3` table in the document.
pub fn extract_head_to_head(document: &Html, subject: Option<&str>) -> Vec<MatchResult> {
    find_tables(document, TableKind::HeadToHead)
        .into_iter()
        .next()
        .map(|table| extract_form(table, subject))
        .unwrap_or_default()
}
