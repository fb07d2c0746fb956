use scraper::ElementRef;
use tracing::debug;

use crate::tables::{row_cells, table_rows};
use crate::team_names::side_of;
use crate::types::{OpponentAnalysisMatch, Scoped, Side};
use crate::utils::parse_score;

const QUARTILE_ROW_CLASS: &str = "stat-quart-";

fn parse_rank(cell: &str) -> u32 {
    let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Row layout: home rank, home team, score, away team, away rank, first goal.
fn parse_row(cells: &[String], subject: &str) -> Option<OpponentAnalysisMatch> {
    if cells.len() < 6 {
        return None;
    }
    let score = parse_score(&cells[2])?;
    let home_team = cells[1].clone();
    let away_team = cells[3].clone();
    let side = side_of(subject, &home_team, &away_team);

    // The opponent's rank sits on the other side of the row.
    let opponent_rank = match side {
        Some(Side::Home) => parse_rank(&cells[4]),
        Some(Side::Away) | None => parse_rank(&cells[0]),
    };
    let first_goal = match cells[5].trim() {
        "" => "-".to_string(),
        text => text.to_string(),
    };

    Some(OpponentAnalysisMatch::new(
        opponent_rank,
        home_team,
        away_team,
        score,
        side,
        first_goal,
    ))
}

/// Results from a rank-bucketed (`stat-quart-*` rows) table. With `slot`
/// set, only games where `subject` played on that side are kept.
pub fn extract_opponent_analysis(
    table: ElementRef<'_>,
    subject: &str,
    slot: Option<Side>,
) -> Vec<OpponentAnalysisMatch> {
    let matches: Vec<OpponentAnalysisMatch> = table_rows(table)
        .into_iter()
        .filter(|row| {
            row.value()
                .attr("class")
                .is_some_and(|class| class.contains(QUARTILE_ROW_CLASS))
        })
        .filter_map(|row| parse_row(&row_cells(row), subject))
        .filter(|m| slot.is_none() || m.subject_side == slot)
        .collect();
    debug!("Extracted {} opponent-analysis rows for {}", matches.len(), subject);
    matches
}

pub fn extract_scoped_opponent_analysis(
    table: ElementRef<'_>,
    subject: &str,
) -> Scoped<Vec<OpponentAnalysisMatch>> {
    let global = extract_opponent_analysis(table, subject, None);
    let pick = |side: Side| -> Vec<OpponentAnalysisMatch> {
        global
            .iter()
            .filter(|m| m.subject_side == Some(side))
            .cloned()
            .collect()
    };
    Scoped {
        home: pick(Side::Home),
        away: pick(Side::Away),
        global,
    }
}
