use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::SpaThresholds;
use crate::error::Diagnostics;
use crate::structured_data;
use crate::utils::strip_scripts_and_styles;

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*?)(?:</body\s*>|$)").expect("Invalid body regex"));
static SKELETON_LOADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*\bsk[^"]*"[^>]*>.*?Loading"#).expect("Invalid skeleton regex")
});
static SKELETON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*class="[^"]*\bsk[^"]*""#).expect("Invalid skeleton class regex")
});
static LIVE_TABLE_SKELETON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*id=["']live-table["'][^>]*>\s*(?:<div[^>]*>\s*)*<div[^>]*class="[^"]*\bsk"#)
        .expect("Invalid live-table regex")
});
static EMPTY_ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*id=["'](?:app|root)["'][^>]*>\s*</div>"#).expect("Invalid empty root regex")
});
static MODULE_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script[^>]*type=["'][^"']*module["'][^>]*>"#).expect("Invalid module script regex")
});

const EVENT_MARKUP: [&str; 3] = ["event__match", "event__homeTeam", "event__awayTeam"];
const FRAMEWORK_MARKERS: [&str; 4] = ["react", "vue", "__REACT", "__VUE"];

/// Length of the body's markup once scripts and styles are removed. A
/// document without a `<body>` tag is measured whole.
pub fn body_content_length(html: &str) -> usize {
    let body = BODY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map_or(html, |m| m.as_str());
    strip_scripts_and_styles(body).trim().len()
}

fn has_event_markup(html: &str) -> bool {
    EVENT_MARKUP.iter().any(|marker| html.contains(marker))
}

/// Flags documents that are client-rendered shells with nothing to extract.
/// A heuristic only: both false positives and false negatives happen.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaDetector {
    thresholds: SpaThresholds,
}

impl SpaDetector {
    pub fn new(thresholds: SpaThresholds) -> Self {
        Self { thresholds }
    }

    pub fn is_spa_shell(&self, html: &str) -> bool {
        let body_len = body_content_length(html);
        let event_markup = has_event_markup(html);

        let skeleton_only = SKELETON_LOADING_RE.is_match(html) && !event_markup;
        let empty_live_table = LIVE_TABLE_SKELETON_RE.is_match(html) && !event_markup;
        let empty_root = EMPTY_ROOT_RE.is_match(html);
        let module_shell =
            MODULE_SCRIPT_RE.is_match(html) && body_len < self.thresholds.module_script_body_len;
        let framework_shell = FRAMEWORK_MARKERS.iter().any(|m| html.contains(m))
            && body_len < self.thresholds.framework_body_len;

        let verdict = skeleton_only || empty_live_table || empty_root || module_shell || framework_shell;
        if verdict {
            debug!(
                "SPA shell: skeleton={} live_table={} empty_root={} module={} framework={} body_len={}",
                skeleton_only, empty_live_table, empty_root, module_shell, framework_shell, body_len
            );
        }
        verdict
    }

    /// Listing-page profile: any short body without event rows also counts.
    pub fn is_spa_shell_strict(&self, html: &str) -> bool {
        self.is_spa_shell(html)
            || (body_content_length(html) < self.thresholds.max_body_len && !html.contains("event__match"))
    }

    pub fn diagnostics(&self, html: &str) -> Diagnostics {
        Diagnostics {
            body_length: body_content_length(html),
            has_event_markup: has_event_markup(html),
            has_table: html.contains("<table"),
            has_skeleton: SKELETON_RE.is_match(html),
            has_loading: html.contains("Loading"),
            ..structured_data::diagnostics(html)
        }
    }
}
