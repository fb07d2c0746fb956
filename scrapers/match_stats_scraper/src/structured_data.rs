//! Extraction of schema.org `SportsEvent` descriptors embedded in pages.
//!
//! Four strategies run in order, each only when the previous one found
//! nothing: parsed `ld+json` script blocks, a best-effort object inside a
//! block that failed to parse, a `@graph` wrapper found in the raw text, and
//! finally a scan for individual `SportsEvent` markers.

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::Diagnostics;
use crate::utils::parse_event_start;

static LD_JSON_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type*="ld+json"]"#).expect("Invalid ld+json selector")
});
static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid object regex"));
static GRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{"@context":"https://schema\.org/?"[^}]*?"@graph":\[(.*?)\]\}"#)
        .expect("Invalid graph regex")
});

const EVENT_TYPE: &str = "SportsEvent";
const EVENT_OPENING: &str = r#"{"@type":"SportsEvent""#;
const EVENT_MARKER: &str = r#""@type":"SportsEvent""#;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTeam {
    pub name: String,
    pub image: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportsEvent {
    pub name: String,
    pub sport: String,
    pub home_team: EventTeam,
    pub away_team: EventTeam,
    pub start_date: String,
    pub end_date: String,
    /// `location.name`, which the source sites fill with "Venue - Competition".
    pub location: String,
    pub url: String,
}

fn str_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Object(obj)) => obj
            .get("url")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn is_event(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == EVENT_TYPE,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(EVENT_TYPE)),
        _ => false,
    }
}

impl EventTeam {
    fn from_value(value: &Value) -> Option<Self> {
        let name = match value {
            Value::String(s) => s.trim().to_string(),
            _ => str_field(value, "name"),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            image: str_field(value, "image"),
            url: str_field(value, "url"),
        })
    }
}

impl SportsEvent {
    /// Builds an event from a JSON value, requiring the event type and both
    /// team names.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_event(value) {
            return None;
        }
        let home_team = EventTeam::from_value(value.get("homeTeam")?)?;
        let away_team = EventTeam::from_value(value.get("awayTeam")?)?;
        let location = match value.get("location") {
            Some(loc @ Value::Object(_)) => str_field(loc, "name"),
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        };
        Some(Self {
            name: str_field(value, "name"),
            sport: str_field(value, "sport"),
            home_team,
            away_team,
            start_date: str_field(value, "startDate"),
            end_date: str_field(value, "endDate"),
            location,
            url: str_field(value, "url"),
        })
    }

    /// Competition name: the part after " - " in the location, or the whole
    /// location when there is no separator.
    pub fn competition(&self) -> String {
        self.location
            .split(" - ")
            .nth(1)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.location)
            .trim()
            .to_string()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        parse_event_start(&self.start_date)
    }
}

/// Collects events from a parsed block: a `@graph` wrapper, a single event,
/// or a top-level array of events.
fn events_from_value(value: &Value) -> Vec<SportsEvent> {
    if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
        let events: Vec<SportsEvent> = graph.iter().filter_map(SportsEvent::from_value).collect();
        if !events.is_empty() {
            return events;
        }
    }
    if let Some(event) = SportsEvent::from_value(value) {
        return vec![event];
    }
    if let Some(items) = value.as_array() {
        return items.iter().flat_map(events_from_value).collect();
    }
    Vec::new()
}

fn from_script_blocks(html: &str) -> Vec<SportsEvent> {
    let document = Html::parse_document(html);
    let mut events = Vec::new();

    for script in document.select(&LD_JSON_SELECTOR) {
        let content = script.text().collect::<String>();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(content) {
            Ok(value) => events.extend(events_from_value(&value)),
            Err(err) => {
                debug!("ld+json block did not parse ({}), trying embedded object", err);
                let parsed = OBJECT_RE
                    .find(content)
                    .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok());
                if let Some(value) = parsed {
                    events.extend(events_from_value(&value));
                }
            }
        }
    }
    events
}

/// Returns the balanced JSON object starting at byte `start` (which must be
/// a `{`). Braces inside string literals are ignored.
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walks back from `pos` to the `{` that encloses it.
fn enclosing_open_brace(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut idx = pos;
    while idx > 0 {
        idx -= 1;
        match bytes[idx] {
            b'}' => depth += 1,
            b'{' if depth == 0 => return Some(idx),
            b'{' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn from_graph_pattern(html: &str) -> Vec<SportsEvent> {
    let Some(caps) = GRAPH_RE.captures(html) else {
        return Vec::new();
    };
    let whole = caps.get(0).map_or("", |m| m.as_str());
    if let Ok(value) = serde_json::from_str::<Value>(whole) {
        let events = events_from_value(&value);
        if !events.is_empty() {
            return events;
        }
    }

    // The lazy match stops at the first `]}`, which can fall inside an
    // event. Rebuild each event from the full document text instead.
    let from = caps.get(1).map_or(0, |m| m.start());
    let mut events = Vec::new();
    for (idx, _) in html[from..].match_indices(EVENT_OPENING) {
        if let Some(event) = balanced_object(html, from + idx)
            .and_then(|obj| serde_json::from_str::<Value>(obj).ok())
            .and_then(|value| SportsEvent::from_value(&value))
        {
            events.push(event);
        }
    }
    events
}

fn from_event_markers(html: &str) -> Vec<SportsEvent> {
    let mut events: Vec<SportsEvent> = Vec::new();
    for (idx, _) in html.match_indices(EVENT_MARKER) {
        let Some(event) = enclosing_open_brace(html, idx)
            .and_then(|start| balanced_object(html, start))
            .and_then(|obj| serde_json::from_str::<Value>(obj).ok())
            .and_then(|value| SportsEvent::from_value(&value))
        else {
            continue;
        };
        let duplicate = events.iter().any(|e| {
            e.home_team.name == event.home_team.name && e.away_team.name == event.away_team.name
        });
        if !duplicate {
            events.push(event);
        }
    }
    events
}

/// Finds every sports event described in the document. Never fails: a
/// document without usable structured data yields an empty list.
pub fn extract_events(html: &str) -> Vec<SportsEvent> {
    let events = from_script_blocks(html);
    if !events.is_empty() {
        debug!("Found {} events in ld+json blocks", events.len());
        return events;
    }
    let events = from_graph_pattern(html);
    if !events.is_empty() {
        debug!("Found {} events via @graph pattern", events.len());
        return events;
    }
    let events = from_event_markers(html);
    debug!("Found {} events via SportsEvent markers", events.len());
    events
}

/// Structured-data flags for a document.
pub fn diagnostics(html: &str) -> Diagnostics {
    Diagnostics {
        html_length: html.len(),
        has_script: html.contains("application/ld+json"),
        has_sports_event: html.contains(EVENT_TYPE),
        has_graph: html.contains("@graph"),
        ..Diagnostics::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORTALEZA_EVENT: &str = r#"{"@type":"SportsEvent","sport":"Soccer","name":"Fortaleza x Atlético-MG","homeTeam":{"@type":"SportsTeam","name":"Fortaleza","image":"https://img/fortaleza.png","url":"/time/fortaleza"},"awayTeam":{"@type":"SportsTeam","name":"Atlético-MG","image":"https://img/cam.png","url":"/time/atletico-mg"},"location":{"@type":"Place","name":"Arena Castelão - Brasileirão Série A"},"startDate":"2025-11-12T20:30:00","endDate":"2025-11-12T22:30:00","url":"https://example.com/jogo/fortaleza-atletico-mg"}"#;

    #[test]
    fn test_single_event_block() {
        let html = format!(
            r#"<html><head><script type="application/ld+json">{}</script></head><body></body></html>"#,
            FORTALEZA_EVENT
        );
        let events = extract_events(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].home_team.name, "Fortaleza");
        assert_eq!(events[0].away_team.name, "Atlético-MG");
        assert_eq!(events[0].competition(), "Brasileirão Série A");
        assert_eq!(events[0].start_date, "2025-11-12T20:30:00");
    }

    #[test]
    fn test_graph_block_filters_non_events() {
        let html = format!(
            r#"<script type="application/ld+json">{{"@context":"https://schema.org/","@graph":[{{"@type":"WebPage","name":"x"}},{}]}}</script>"#,
            FORTALEZA_EVENT
        );
        let events = extract_events(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].url, "https://example.com/jogo/fortaleza-atletico-mg");
    }

    #[test]
    fn test_top_level_array() {
        let html = format!(
            r#"<script type="application/ld+json">[{},{{"@type":"Organization"}}]</script>"#,
            FORTALEZA_EVENT
        );
        assert_eq!(extract_events(&html).len(), 1);
    }

    #[test]
    fn test_embedded_object_in_broken_block() {
        let html = format!(
            r#"<script type="application/ld+json">/* cms */ {} ;</script>"#,
            FORTALEZA_EVENT
        );
        assert_eq!(extract_events(&html).len(), 1);
    }

    #[test]
    fn test_graph_pattern_in_raw_text() {
        // Not inside a script block, and the event name contains "]}" so the
        // lazy regex match is truncated mid-object.
        let event = FORTALEZA_EVENT.replace("Fortaleza x Atlético-MG", "Rodada ]} 34");
        let html = format!(
            r#"<div data-json='{{"@context":"https://schema.org/","@graph":[{}]}}'></div>"#,
            event
        );
        let events = extract_events(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Rodada ]} 34");
    }

    #[test]
    fn test_marker_scan_dedupes() {
        let event = FORTALEZA_EVENT.replace(r#"{"@type":"SportsEvent","sport":"Soccer","#, r#"{"sport":"Soccer","@type":"SportsEvent","#);
        let html = format!("<div>{}</div><p>{}</p>", event, event);
        let events = extract_events(&html);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sport, "Soccer");
    }

    #[test]
    fn test_events_without_teams_are_dropped() {
        let html = r#"<script type="application/ld+json">{"@type":"SportsEvent","name":"x"}</script>"#;
        assert!(extract_events(html).is_empty());
    }

    #[test]
    fn test_garbage_never_panics() {
        for html in ["", "{", "\"@type\":\"SportsEvent\"", "{\"@type\":\"SportsEvent\",\"homeTeam\":{", "<script type=\"application/ld+json\">{{{</script>"] {
            assert!(extract_events(html).is_empty());
        }
    }

    #[test]
    fn test_balanced_object_ignores_braces_in_strings() {
        let text = r#"xx{"a":"}{","b":{"c":"\"}"}}yy"#;
        assert_eq!(balanced_object(text, 2), Some(r#"{"a":"}{","b":{"c":"\"}"}}"#));
    }

    #[test]
    fn test_diagnostics_flags() {
        let diag = diagnostics(r#"<script type="application/ld+json">{"@graph":[]}</script>"#);
        assert!(diag.has_script);
        assert!(diag.has_graph);
        assert!(!diag.has_sports_event);
    }
}
