//! Live-status and odds scanning over page text.
//!
//! Indicators are matched against the visible text (tags, scripts and styles
//! stripped) with word boundaries, so markup such as `<html>` or
//! `class="live-table"` never counts as a signal.

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{LiveStatus, MatchStatus, Odds};
use crate::utils::{clean_text, context_window, element_text};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid live-status regex")
}

static LIVE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\bao\s+vivo\b|\blive\b|\bem\s+andamento\b|\bjogando\s+agora\b|\bminuto\s*\d+")
});
// Attribute form, e.g. `data-status="live"`, checked on the raw markup.
static LIVE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?i)status[^<>]{0,40}?\blive\b"#));
static MINUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(\d{1,3})\s*['’]?\s*(?:min\b|minutos?\b)|\bminuto\s*(\d{1,3})\b")
});
static HALFTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bintervalo\b|\bhalf.?time\b"));
static HT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bht\b"));
static FINISHED_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\bfinalizado\b|\bterminado\b|\bencerrado\b|\bfinished\b|\bfull.?time\b|\bft\b")
});
static POSTPONED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\badiad[oa]\b|\bpostponed\b"));
static CANCELLED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bcancelad[oa]\b|\bcancell?ed\b"));
static HT_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:ht|intervalo)\b[:\s]+(\d{1,2})\s*[-:]\s*(\d{1,2})\b")
});
static LABELLED_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:placar|score|resultado)\b[:\s]+(\d{1,2})\s*[-:x]\s*(\d{1,2})\b")
});
static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(\d{1,2})\s*([-:])\s*(\d{1,2})\b"));

const ODDS_VALUE: &str = r"(\d+(?:[.,]\d+)?)";

fn labelled(words: &str, single: &str) -> Vec<Regex> {
    let mut patterns = vec![re(&format!(r"(?i)\b(?:{})\b[:\s]+{}", words, ODDS_VALUE))];
    if !single.is_empty() {
        // One-character labels need an explicit colon and a decimal price.
        patterns.push(re(&format!(r"(?:^|[^\w.,]){}\s*:\s*(\d+\.\d+)", single)));
    }
    patterns
}

fn goal_line(direction: &str, line: &str) -> Vec<Regex> {
    vec![re(&format!(
        r"(?i)\b(?:{})(?:\s+de)?\s*{}(?:\s*gols?)?[:\s]+{}",
        direction, line, ODDS_VALUE
    ))]
}

static HOME_WIN_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| labelled(r"vit[óo]ria\s+(?:da\s+)?casa|casa|home", "1"));
static DRAW_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| labelled(r"empate|draw", "[xXeE]"));
static AWAY_WIN_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| labelled(r"vit[óo]ria\s+(?:do\s+)?visitante|visitante|away", "2"));
static OVER15_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| goal_line(r"over|acima|mais", r"1[.,]5"));
static UNDER15_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| goal_line(r"under|abaixo|menos", r"1[.,]5"));
static OVER25_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| goal_line(r"over|acima|mais", r"2[.,]5"));
static UNDER25_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| goal_line(r"under|abaixo|menos", r"2[.,]5"));

static ODDS_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"table[class*="odds"]"#).expect("Invalid odds table selector")
});
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("Invalid cell selector"));
static PLAIN_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^\d+(?:\.\d+)?$"));
static DECIMAL_ODDS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b([1-9]\.\d{1,2}|[2-9]\.\d)\b"));

const ODDS_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

fn capture_u32(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// A `\d-\d` or `\d:\d` hit that is really part of a clock time or a date.
fn is_time_or_date(text: &str, caps: &Captures<'_>) -> bool {
    let (Some(whole), Some(sep), Some(right)) = (caps.get(0), caps.get(2), caps.get(3)) else {
        return true;
    };
    if sep.as_str() == ":" && right.as_str().len() == 2 {
        return true;
    }
    let before = text[..whole.start()].chars().rev().take(2).collect::<Vec<_>>();
    let after = text[whole.end()..].chars().take(2).collect::<Vec<_>>();
    let joins = |pair: &[char]| {
        matches!(pair.first(), Some('-' | '/' | ':' | '.'))
            && pair.get(1).is_some_and(|c| c.is_ascii_digit())
    };
    joins(&before) || joins(&after)
}

fn extract_score(text: &str) -> Option<(u32, u32)> {
    if let Some(caps) = LABELLED_SCORE_RE.captures(text) {
        return Some((capture_u32(&caps, 1)?, capture_u32(&caps, 2)?));
    }
    // Half-time scores must not be read as the current score.
    let text = HT_SCORE_RE.replace_all(text, " ");
    SCORE_RE
        .captures_iter(&text)
        .find(|caps| !is_time_or_date(&text, caps))
        .and_then(|caps| Some((capture_u32(&caps, 1)?, capture_u32(&caps, 3)?)))
}

/// "Intervalo", "half time", or a standalone HT marker. An HT marker that
/// introduces a half-time score does not count.
fn is_halftime(text: &str) -> bool {
    if HALFTIME_RE.is_match(text) {
        return true;
    }
    HT_MARKER_RE.find_iter(text).any(|m| {
        !HT_SCORE_RE
            .find_at(text, m.start())
            .is_some_and(|score| score.start() == m.start())
    })
}

fn status_from_text(text: &str, raw: &str) -> LiveStatus {
    let mut status = LiveStatus::default();

    if LIVE_TEXT_RE.is_match(text) || LIVE_ATTR_RE.is_match(raw) {
        status.is_live = true;
        status.status = MatchStatus::Live;
    }
    if let Some(caps) = MINUTE_RE.captures(text) {
        status.minute = capture_u32(&caps, 1).or_else(|| capture_u32(&caps, 2));
    }
    if is_halftime(text) {
        status.is_live = true;
        status.status = MatchStatus::Halftime;
    }
    if FINISHED_RE.is_match(text) {
        status.is_live = false;
        status.status = MatchStatus::Finished;
    }
    if POSTPONED_RE.is_match(text) {
        status.is_live = false;
        status.status = MatchStatus::Postponed;
    }
    if CANCELLED_RE.is_match(text) {
        status.is_live = false;
        status.status = MatchStatus::Cancelled;
    }

    if let Some((home, away)) = extract_score(text) {
        status.home_score = Some(home);
        status.away_score = Some(away);
    }
    if let Some(caps) = HT_SCORE_RE.captures(text) {
        status.home_score_ht = capture_u32(&caps, 1);
        status.away_score_ht = capture_u32(&caps, 2);
    }
    status
}

/// Current status of the match a page describes. Always returns a fresh
/// value; `last_updated` is left for the caller to stamp.
pub fn extract_live_status(html: &str) -> LiveStatus {
    let text = clean_text(html);
    let status = status_from_text(&text, html);
    debug!("Live status: {:?}", status.status);
    status
}

/// First labelled value that is a plausible decimal price.
fn first_price(patterns: &[Regex], text: &str) -> Option<f64> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps[1].replace(',', ".").parse::<f64>().ok())
            .find(|value| ODDS_RANGE.contains(value))
    })
}

/// Assigns prices positionally: 1X2 first, then over/under 1.5, then
/// over/under 2.5.
fn odds_from_values(values: &[f64]) -> Odds {
    let mut odds = Odds::default();
    if values.len() >= 3 {
        odds.home_win = Some(values[0]);
        odds.draw = Some(values[1]);
        odds.away_win = Some(values[2]);
    }
    if values.len() >= 5 {
        odds.over1_5 = Some(values[3]);
        odds.under1_5 = Some(values[4]);
    }
    if values.len() >= 7 {
        odds.over2_5 = Some(values[5]);
        odds.under2_5 = Some(values[6]);
    }
    odds
}

fn odds_from_tables(html: &str) -> Odds {
    let document = Html::parse_document(html);
    for table in document.select(&ODDS_TABLE) {
        let values: Vec<f64> = table
            .select(&CELL)
            .map(element_text)
            .filter(|text| PLAIN_NUMBER_RE.is_match(text))
            .filter_map(|text| text.parse::<f64>().ok())
            .filter(|value| ODDS_RANGE.contains(value))
            .collect();
        let odds = odds_from_values(&values);
        if !odds.is_empty() {
            return odds;
        }
    }
    Odds::default()
}

/// Prices for the seven supported markets. `None` when no market was found.
pub fn extract_odds(html: &str) -> Option<Odds> {
    let text = clean_text(html);
    let mut odds = Odds {
        home_win: first_price(&HOME_WIN_RES, &text),
        draw: first_price(&DRAW_RES, &text),
        away_win: first_price(&AWAY_WIN_RES, &text),
        over1_5: first_price(&OVER15_RES, &text),
        under1_5: first_price(&UNDER15_RES, &text),
        over2_5: first_price(&OVER25_RES, &text),
        under2_5: first_price(&UNDER25_RES, &text),
        last_updated: None,
    };
    if odds.is_empty() {
        odds = odds_from_tables(html);
    }
    (!odds.is_empty()).then_some(odds)
}

/// Status of one event on a listing page, read from the markup surrounding
/// its URL. `None` unless the event is live or no longer scheduled.
pub fn extract_event_live_status(html: &str, event_url: &str, radius: usize) -> Option<LiveStatus> {
    let window = context_window(html, event_url, radius)?;
    let status = status_from_text(&clean_text(window), window);
    (status.is_live || status.status != MatchStatus::Scheduled).then_some(status)
}

/// Decimal prices found near an event's URL, assigned positionally.
pub fn extract_event_odds(html: &str, event_url: &str, radius: usize) -> Option<Odds> {
    let window = context_window(html, event_url, radius)?;
    let text = clean_text(window);
    let values: Vec<f64> = DECIMAL_ODDS_RE
        .find_iter(&text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| ODDS_RANGE.contains(value))
        .take(7)
        .collect();
    let odds = odds_from_values(&values);
    (odds.home_win.is_some() || odds.over1_5.is_some()).then_some(odds)
}
