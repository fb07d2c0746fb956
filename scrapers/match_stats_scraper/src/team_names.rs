//! Fuzzy team-name matching. Matching is permissive on purpose: a short name
//! such as "Atlético" can match several clubs, and the first candidate in
//! document order wins.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Side;
use crate::utils::strip_diacritics;

static FIXTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(?:vs\.?|v|x|×|-|–|—)\s+(.+)$").expect("Invalid fixture regex")
});

/// Lower-cased, diacritic-free, alphanumeric-only matching key.
///
/// The key also folds a trailing state adjective into its two-letter code
/// (`STATE_ALIASES`), so "Atlético Mineiro" and "atletico-mg" both become
/// `atleticomg`. Callers comparing keys rely on this folding. A name that is
/// only the adjective ("Paulista") keeps it, and folding an already folded
/// key changes nothing.
pub fn normalize(name: &str) -> String {
    let key: String = strip_diacritics(&name.to_lowercase())
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    fold_state_suffix(key)
}

const STATE_ALIASES: [(&str, &str); 6] = [
    ("mineiro", "mg"),
    ("paranaense", "pr"),
    ("goianiense", "go"),
    ("gaucho", "rs"),
    ("baiano", "ba"),
    ("paulista", "sp"),
];

fn fold_state_suffix(key: String) -> String {
    for (long, short) in STATE_ALIASES {
        if let Some(stem) = key.strip_suffix(long) {
            if !stem.is_empty() {
                return format!("{}{}", stem, short);
            }
        }
    }
    key
}

fn keys_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a)
}

/// Whether two names refer to the same club.
pub fn same_team(a: &str, b: &str) -> bool {
    keys_match(&normalize(a), &normalize(b))
}

/// Which side of a fixture `subject` played on. An exact key match on
/// either side is preferred over a containment match.
pub fn side_of(subject: &str, home: &str, away: &str) -> Option<Side> {
    let subject = normalize(subject);
    let (home, away) = (normalize(home), normalize(away));
    if !subject.is_empty() {
        if subject == home {
            return Some(Side::Home);
        }
        if subject == away {
            return Some(Side::Away);
        }
    }
    if keys_match(&subject, &home) {
        Some(Side::Home)
    } else if keys_match(&subject, &away) {
        Some(Side::Away)
    } else {
        None
    }
}

/// Exact key match first, then the first candidate whose key contains or is
/// contained in the target's key.
pub fn find_best_match<'a, S: AsRef<str>>(candidates: &'a [S], target: &str) -> Option<&'a str> {
    let target_key = normalize(target);
    if target_key.is_empty() {
        return None;
    }
    let keys: Vec<String> = candidates
        .iter()
        .map(|c| normalize(c.as_ref()))
        .collect();

    if let Some(idx) = keys.iter().position(|key| *key == target_key) {
        return Some(candidates[idx].as_ref());
    }
    keys.iter()
        .position(|key| keys_match(key, &target_key))
        .map(|idx| candidates[idx].as_ref())
}

/// Splits fixture text such as "Fortaleza vs Bahia" or "Atlético-MG x
/// Santos" into home and away names. Separators must be surrounded by
/// spaces so hyphenated names stay whole.
pub fn split_fixture(text: &str) -> Option<(String, String)> {
    let caps = FIXTURE_RE.captures(text.trim())?;
    let home = caps[1].trim().to_string();
    let away = caps[2].trim().to_string();
    if home.chars().count() < 2 || away.chars().count() < 2 || home == away {
        return None;
    }
    Some((home, away))
}
