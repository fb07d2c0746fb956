use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use crate::tables::{row_cells, table_rows};
use crate::types::{Standing, TeamGoalStats};
use crate::utils::{clean_text, element_text};

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("Invalid table selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Invalid title selector"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2").expect("Invalid heading selector"));
static TITLE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*-\s*(?:Academia|Estat[ií]sticas).*$").expect("Invalid title suffix regex")
});

static AVG_SCORED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)m[ée]dia[^0-9]*gols[^0-9]*marcados[^0-9]*(\d+(?:[.,]\d+)?)")
        .expect("Invalid scored regex")
});
static AVG_CONCEDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)m[ée]dia[^0-9]*gols[^0-9]*sofridos[^0-9]*(\d+(?:[.,]\d+)?)")
        .expect("Invalid conceded regex")
});
static NO_SCORED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sem\s+marcar[^0-9%]{0,100}(\d+(?:[.,]\d+)?)\s*%").expect("Invalid no-scored regex")
});
static NO_CONCEDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sem\s+sofrer[^0-9%]{0,100}(\d+(?:[.,]\d+)?)\s*%").expect("Invalid no-conceded regex")
});
static OVER25_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:mais\s+de|acima\s+de|over|>|\+)\s*2[.,]5[^0-9%]{0,200}?(\d+(?:[.,]\d+)?)\s*%")
        .expect("Invalid over 2.5 regex")
});
static UNDER25_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:menos\s+de|abaixo\s+de|under|<)\s*2[.,]5[^0-9%]{0,200}?(\d+(?:[.,]\d+)?)\s*%")
        .expect("Invalid under 2.5 regex")
});

pub const UNKNOWN_COMPETITION: &str = "Competição Desconhecida";
const STANDINGS_MARKERS: [&str; 3] = ["Pos", "Pts", "Jogos"];
/// How far past a team's name its statistics block may extend.
const TEAM_SECTION_LEN: usize = 5000;

#[derive(Debug, Default, Clone, Copy)]
struct Columns {
    points: Option<usize>,
    played: Option<usize>,
    wins: Option<usize>,
    draws: Option<usize>,
    losses: Option<usize>,
}

impl Columns {
    /// Maps header captions to columns. A `W` or `L` caption marks an
    /// English header, where `D` means draws rather than defeats.
    fn from_header(cells: &[String]) -> Option<Self> {
        let captions: Vec<String> = cells.iter().map(|c| c.trim().to_lowercase()).collect();
        let english = captions.iter().any(|c| c == "w" || c == "l");
        let mut columns = Columns::default();
        for (idx, caption) in captions.iter().enumerate() {
            match caption.as_str() {
                "pts" | "pontos" | "points" => columns.points = Some(idx),
                "j" | "pj" | "jogos" | "mp" | "gp" | "played" => columns.played = Some(idx),
                "v" | "w" | "vitórias" | "wins" => columns.wins = Some(idx),
                "e" | "empates" | "draws" => columns.draws = Some(idx),
                "d" if english => columns.draws = Some(idx),
                "d" | "derrotas" | "l" | "losses" => columns.losses = Some(idx),
                _ => {}
            }
        }
        (columns.points.is_some() && columns.played.is_some()).then_some(columns)
    }
}

fn number(cell: &str) -> Option<u32> {
    let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn is_numeric(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit())
}

/// Fills the counters from the numbers after the team column when there is
/// no usable header. Accepts "Pts J V E D" and "J V E D ... Pts" when the
/// numbers are self-consistent, and falls back to the first layout.
fn assign_by_layout(standing: &mut Standing, numbers: &[u32]) {
    let consistent = |pts: u32, j: u32, v: u32, e: u32, d: u32| pts == 3 * v + e && j == v + e + d;
    let at = |idx: usize| numbers.get(idx).copied().unwrap_or(0);

    let points_first = consistent(at(0), at(1), at(2), at(3), at(4));
    let trailing_points = numbers
        .iter()
        .skip(4)
        .find(|pts| consistent(**pts, at(0), at(1), at(2), at(3)));

    match trailing_points {
        Some(&points) if !points_first => {
            standing.points = points;
            standing.played = at(0);
            standing.wins = at(1);
            standing.draws = at(2);
            standing.losses = at(3);
        }
        _ => {
            standing.points = at(0);
            standing.played = at(1);
            standing.wins = at(2);
            standing.draws = at(3);
            standing.losses = at(4);
        }
    }
}

fn parse_standing_row(cells: &[String], columns: Option<Columns>) -> Option<Standing> {
    if cells.len() < 4 {
        return None;
    }
    let position = number(&cells[0]).filter(|p| (1..=50).contains(p))?;
    let (team_idx, team) = cells
        .iter()
        .enumerate()
        .take(5)
        .skip(1)
        .find(|(_, cell)| !is_numeric(cell) && cell.chars().count() > 2)?;

    let mut standing = Standing {
        position,
        team: team.clone(),
        ..Standing::default()
    };
    match columns {
        Some(columns) => {
            let at = |idx: Option<usize>| idx.and_then(|i| cells.get(i)).and_then(|c| number(c)).unwrap_or(0);
            standing.points = at(columns.points);
            standing.played = at(columns.played);
            standing.wins = at(columns.wins);
            standing.draws = at(columns.draws);
            standing.losses = at(columns.losses);
        }
        None => {
            let numbers: Vec<u32> = cells[team_idx + 1..].iter().filter_map(|c| number(c)).collect();
            assign_by_layout(&mut standing, &numbers);
        }
    }
    Some(standing)
}

fn standings_from_table(table: ElementRef<'_>) -> Vec<Standing> {
    let mut columns = None;
    let mut standings = Vec::new();
    for row in table_rows(table) {
        let cells = row_cells(row);
        if columns.is_none() {
            if let Some(found) = Columns::from_header(&cells) {
                columns = Some(found);
                continue;
            }
        }
        if let Some(standing) = parse_standing_row(&cells, columns) {
            standings.push(standing);
        }
    }
    standings
}

/// League table from the first table that looks like standings and yields
/// at least one row.
pub fn extract_standings(document: &Html) -> Vec<Standing> {
    for table in document.select(&TABLE) {
        let text = element_text(table);
        if !STANDINGS_MARKERS.iter().any(|m| text.contains(m)) {
            continue;
        }
        let standings = standings_from_table(table);
        if !standings.is_empty() {
            debug!("Extracted {} standings rows", standings.len());
            return standings;
        }
    }
    Vec::new()
}

pub fn extract_competition_name(document: &Html) -> String {
    if let Some(title) = document.select(&TITLE).next() {
        let title = element_text(title);
        let cleaned = TITLE_SUFFIX_RE.replace(&title, "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            return cleaned.to_string();
        }
    }
    document
        .select(&HEADING)
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| UNKNOWN_COMPETITION.to_string())
}

fn capture_f64(re: &Regex, text: &str) -> f64 {
    re.captures(text)
        .and_then(|caps| caps[1].replace(',', ".").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Goal statistics printed after the team's name. `None` when neither
/// average could be read.
pub fn extract_team_goal_stats(html: &str, team: &str) -> Option<TeamGoalStats> {
    if team.trim().is_empty() {
        return None;
    }
    let text = clean_text(html);
    let name_re = Regex::new(&format!("(?i){}", regex::escape(team.trim()))).ok()?;
    let start = name_re.find(&text)?.start();
    let mut end = (start + TEAM_SECTION_LEN).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    let section = &text[start..end];

    let mut stats = TeamGoalStats {
        avg_goals_scored: capture_f64(&AVG_SCORED_RE, section),
        avg_goals_conceded: capture_f64(&AVG_CONCEDED_RE, section),
        no_goals_scored_pct: capture_f64(&NO_SCORED_RE, section),
        no_goals_conceded_pct: capture_f64(&NO_CONCEDED_RE, section),
        over25_pct: capture_f64(&OVER25_RE, section),
        under25_pct: capture_f64(&UNDER25_RE, section),
        ..TeamGoalStats::default()
    };
    if stats.avg_goals_scored <= 0.0 && stats.avg_goals_conceded <= 0.0 {
        return None;
    }
    stats.avg_total_goals = stats.avg_goals_scored + stats.avg_goals_conceded;
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standings_with_portuguese_header() {
        let document = Html::parse_document(
            r#"<table><tr><th>Pos</th><th>Time</th><th>Pts</th><th>J</th><th>V</th><th>E</th><th>D</th></tr>
               <tr><td>1º</td><td>Flamengo</td><td>71</td><td>33</td><td>21</td><td>8</td><td>4</td></tr>
               <tr><td>2</td><td>Palmeiras</td><td>68</td><td>33</td><td>21</td><td>5</td><td>7</td></tr>
               <tr><td>Total</td><td>-</td><td>-</td><td>-</td></tr></table>"#,
        );
        let standings = extract_standings(&document);
        assert_eq!(standings.len(), 2);
        assert_eq!(
            standings[0],
            Standing {
                position: 1,
                team: "Flamengo".to_string(),
                points: 71,
                played: 33,
                wins: 21,
                draws: 8,
                losses: 4,
                competition: None,
            }
        );
    }

    #[test]
    fn test_standings_with_english_header() {
        let document = Html::parse_document(
            r#"<table><tr><th>#</th><th>Team</th><th>MP</th><th>W</th><th>D</th><th>L</th><th>Pts</th></tr>
               <tr><td>1</td><td>Bayern</td><td>10</td><td>9</td><td>1</td><td>0</td><td>28</td></tr></table>"#,
        );
        let standings = extract_standings(&document);
        assert_eq!(standings[0].draws, 1);
        assert_eq!(standings[0].losses, 0);
        assert_eq!(standings[0].points, 28);
    }

    #[test]
    fn test_standings_without_header_use_consistent_layout() {
        let document = Html::parse_document(
            r#"<table><tr><td>Pos</td><td>Clube</td><td>-</td><td>-</td></tr>
               <tr><td>3</td><td>Cruzeiro</td><td>33</td><td>19</td><td>5</td><td>9</td><td>50</td><td>62</td></tr>
               <tr><td>4</td><td>Mirassol</td><td>61</td><td>33</td><td>17</td><td>10</td><td>6</td></tr></table>"#,
        );
        let standings = extract_standings(&document);
        assert_eq!(standings[0].points, 62);
        assert_eq!(standings[0].played, 33);
        assert_eq!(standings[1].points, 61);
        assert_eq!(standings[1].losses, 6);
    }

    #[test]
    fn test_competition_name() {
        let document = Html::parse_document(
            "<html><head><title>Brasileirão Série A - Estatísticas e Resultados</title></head></html>",
        );
        assert_eq!(extract_competition_name(&document), "Brasileirão Série A");
        let document = Html::parse_document("<html><body><h1>Copa do Brasil</h1></body></html>");
        assert_eq!(extract_competition_name(&document), "Copa do Brasil");
        let document = Html::parse_document("<p>nothing</p>");
        assert_eq!(extract_competition_name(&document), UNKNOWN_COMPETITION);
    }

    #[test]
    fn test_team_goal_stats() {
        let html = r#"<div><h3>Fortaleza</h3>
            <p>Média de gols marcados: 1,45</p>
            <p>Média de gols sofridos: 0,9</p>
            <p>Jogos sem marcar: 20%</p>
            <p>Mais de 2,5 golos: 45%</p>
            <p>Menos de 2,5 golos: 55%</p></div>"#;
        let stats = extract_team_goal_stats(html, "fortaleza").unwrap();
        assert_eq!(stats.avg_goals_scored, 1.45);
        assert_eq!(stats.avg_goals_conceded, 0.9);
        assert!((stats.avg_total_goals - 2.35).abs() < 1e-9);
        assert_eq!(stats.no_goals_scored_pct, 20.0);
        assert_eq!(stats.over25_pct, 45.0);
        assert_eq!(stats.under25_pct, 55.0);
        assert_eq!(stats.goal_moments.scored, [0; 6]);

        assert!(extract_team_goal_stats(html, "Bahia").is_none());
        assert!(extract_team_goal_stats("<p>Fortaleza</p>", "Fortaleza").is_none());
    }
}
