use regex::Regex;
use scraper::ElementRef;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::tables::{row_cells, table_rows};
use crate::types::{Scope, Scoped, StreakCounters, StreakKind};
use crate::utils::strip_diacritics;

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid count regex"));

/// Label phrases, matched against lower-cased diacritic-free text. Negated
/// phrases come first so "sem vencer" is not read as a win streak.
const STREAK_LABELS: [(&str, StreakKind); 12] = [
    ("nao perde", StreakKind::Unbeaten),
    ("sem perder", StreakKind::Unbeaten),
    ("invict", StreakKind::Unbeaten),
    ("nao ganha", StreakKind::Winless),
    ("nao vence", StreakKind::Winless),
    ("sem vencer", StreakKind::Winless),
    ("sem ganhar", StreakKind::Winless),
    ("nao empata", StreakKind::NoDraw),
    ("sem empatar", StreakKind::NoDraw),
    ("vitori", StreakKind::Win),
    ("empate", StreakKind::Draw),
    ("derrota", StreakKind::Loss),
];

/// Rows describing the longest streak of the season rather than the current one.
const RECORD_MARKERS: [&str; 3] = ["maior", "maxima", "recorde"];

pub fn classify_label(label: &str) -> Option<StreakKind> {
    let folded = strip_diacritics(&label.to_lowercase());
    if RECORD_MARKERS.iter().any(|m| folded.contains(m)) {
        return None;
    }
    STREAK_LABELS
        .iter()
        .find(|(phrase, _)| folded.contains(phrase))
        .map(|(_, kind)| *kind)
}

fn count_at(cells: &[String], column: usize) -> u32 {
    cells
        .get(column)
        .and_then(|cell| COUNT_RE.find(cell))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Labelled rows in table order; the first row for each counter wins.
fn streak_rows(table: ElementRef<'_>) -> Vec<(StreakKind, Vec<String>)> {
    let mut seen = HashSet::new();
    table_rows(table)
        .into_iter()
        .filter_map(|row| {
            let cells = row_cells(row);
            let kind = classify_label(cells.first()?)?;
            seen.insert(kind).then_some((kind, cells))
        })
        .collect()
}

/// Current streaks for one scope, read from column 1 (home), 2 (away) or 3
/// (global).
pub fn extract_streaks(table: ElementRef<'_>, scope: Scope) -> StreakCounters {
    let mut counters = StreakCounters::default();
    for (kind, cells) in streak_rows(table) {
        counters.set(kind, count_at(&cells, scope.column()));
    }
    counters
}

/// Current streaks for all three scopes at once.
pub fn extract_all_streaks(table: ElementRef<'_>) -> Scoped<StreakCounters> {
    let mut scoped = Scoped::<StreakCounters>::default();
    for (kind, cells) in streak_rows(table) {
        for scope in Scope::ALL {
            scoped.get_mut(scope).set(kind, count_at(&cells, scope.column()));
        }
    }
    scoped
}
