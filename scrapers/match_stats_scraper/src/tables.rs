use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::team_names::{find_best_match, normalize, split_fixture};
use crate::utils::{element_text, find_time, parse_match_date};

static LABEL_OR_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".stats-subtitle, table").expect("Invalid label/table selector")
});
static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("Invalid table selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("Invalid tr selector"));
static QUARTILE_ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"tr[class*="stat-quart-"]"#).expect("Invalid quartile row selector")
});

const SUBTITLE_CLASS: &str = "stats-subtitle";
const COMPETITION_WORDS: [&str; 6] = ["League", "Cup", "Championship", "Liga", "Copa", "Campeonato"];
const HEADER_MARKERS: [&str; 6] = ["data", "date", "total", "jogo", "competição", "competition"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    RecentForm,
    Streaks,
    OpponentAnalysis,
    HeadToHead,
}

impl TableKind {
    pub fn class_marker(self) -> &'static str {
        match self {
            TableKind::RecentForm | TableKind::OpponentAnalysis => "stat-last10",
            TableKind::Streaks => "stat-seqs",
            TableKind::HeadToHead => "stat-cd3",
        }
    }

    /// Whether `table` is of this kind. Recent-form and opponent-analysis
    /// tables share a class and differ by their `stat-quart-*` rows.
    pub fn matches(self, table: ElementRef<'_>) -> bool {
        let class = table.value().attr("class").unwrap_or_default();
        if !class.contains(self.class_marker()) {
            return false;
        }
        match self {
            TableKind::RecentForm => table.select(&QUARTILE_ROW).next().is_none(),
            TableKind::OpponentAnalysis => table.select(&QUARTILE_ROW).next().is_some(),
            TableKind::Streaks | TableKind::HeadToHead => true,
        }
    }
}

/// A statistics table and the team-name label that precedes it.
#[derive(Debug, Clone)]
pub struct TeamTable<'a> {
    pub team: String,
    pub table: ElementRef<'a>,
}

fn is_label(element: ElementRef<'_>) -> bool {
    element.value().classes().any(|c| c == SUBTITLE_CLASS)
}

/// Pairs each `stats-subtitle` label with the table that follows it in
/// document order. Any table consumes a pending label; only tables of `kind`
/// are returned. When a team appears twice, the first table wins.
pub fn find_team_tables<'a>(document: &'a Html, kind: TableKind) -> Vec<TeamTable<'a>> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut pending_label: Option<String> = None;

    for element in document.select(&LABEL_OR_TABLE) {
        if is_label(element) {
            let text = element_text(element);
            if !text.is_empty() {
                pending_label = Some(text);
            }
            continue;
        }
        let Some(label) = pending_label.take() else {
            continue;
        };
        if !kind.matches(element) {
            continue;
        }
        let key = normalize(&label);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        found.push(TeamTable {
            team: label,
            table: element,
        });
    }

    debug!("Found {} {:?} tables", found.len(), kind);
    found
}

/// All tables of `kind`, labelled or not.
pub fn find_tables(document: &Html, kind: TableKind) -> Vec<ElementRef<'_>> {
    document
        .select(&TABLE)
        .filter(|table| kind.matches(*table))
        .collect()
}

pub fn find_table_for_team<'t, 'a>(tables: &'t [TeamTable<'a>], team: &str) -> Option<&'t TeamTable<'a>> {
    let names: Vec<&str> = tables.iter().map(|t| t.team.as_str()).collect();
    let best = find_best_match(&names, team)?;
    tables.iter().find(|t| t.team == best)
}

pub fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table.select(&ROW).collect()
}

/// Text of the direct `td`/`th` children of a row.
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(element_text)
        .collect()
}

/// Header and footer rows: only `th` cells, or a first cell holding a
/// column caption.
pub fn is_header_row(row: ElementRef<'_>) -> bool {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect();
    if cells.is_empty() {
        return true;
    }
    if cells.iter().all(|cell| cell.value().name() == "th") {
        return true;
    }
    let first = element_text(cells[0]).to_lowercase();
    HEADER_MARKERS.contains(&first.as_str())
}

/// A fixture read from a generic listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub home: String,
    pub away: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub competition: Option<String>,
}

/// Reads a fixture from the cells of a generic table row: one cell names
/// both teams ("A vs B"), others may hold a date, a time or a competition.
/// Later cells overwrite earlier ones.
pub fn parse_fixture_cells(cells: &[String]) -> Option<FixtureRow> {
    let mut teams = None;
    let mut date = None;
    let mut time = None;
    let mut competition = None;
    for cell in cells {
        if let Some(pair) = split_fixture(cell) {
            teams = Some(pair);
        }
        if let Some(found) = parse_match_date(cell) {
            date = Some(found);
        }
        if let Some(found) = find_time(cell) {
            time = Some(found);
        }
        if cell.chars().count() > 5 && COMPETITION_WORDS.iter().any(|w| cell.contains(w)) {
            competition = Some(cell.clone());
        }
    }
    let (home, away) = teams?;
    Some(FixtureRow {
        home,
        away,
        date,
        time,
        competition,
    })
}
