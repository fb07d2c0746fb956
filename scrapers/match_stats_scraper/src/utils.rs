use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// A `<` only opens a tag when followed by a letter, `/`, `!` or `?`.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z/!?][^<>]*>").expect("Invalid tag regex"));
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("Invalid script/style regex")
});
static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[-:x]\s*(\d+)").expect("Invalid score regex"));
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("Invalid ISO date regex"));
static DMY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4}|\d{2})\b").expect("Invalid d/m/y regex")
});
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("Invalid clock regex"));
static PT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(?:de\s+)?([a-z]+)\.?\s+(?:de\s+)?(\d{4})\b")
        .expect("Invalid Portuguese date regex")
});

const PT_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

static BRASILIA: LazyLock<FixedOffset> =
    LazyLock::new(|| FixedOffset::west_opt(3 * 3600).expect("Invalid Brasília offset"));

/// Offset used by the Brazilian source sites (America/Sao_Paulo, no DST).
pub fn brasilia_offset() -> FixedOffset {
    *BRASILIA
}

/// Collapses whitespace runs (including non-breaking spaces) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_scripts_and_styles(html: &str) -> String {
    SCRIPT_STYLE_RE.replace_all(html, " ").into_owned()
}

/// Turns an HTML fragment into single-line plain text.
pub fn clean_text(fragment: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(fragment, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Removes diacritics by decomposing and dropping combining marks.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Finds the first `home-away` pair in a cell. Upcoming fixtures carry "-"
/// or "vs" and yield `None`.
pub fn parse_score(text: &str) -> Option<(u32, u32)> {
    let caps = SCORE_RE.captures(text)?;
    let home = caps[1].parse::<u32>().ok()?;
    let away = caps[2].parse::<u32>().ok()?;
    Some((home, away))
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in strip_diacritics(name).chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Record id shared by every adapter: `slug(home)-slug(away)`.
pub fn match_id(home: &str, away: &str) -> String {
    format!("{}-{}", slugify(home), slugify(away))
}

/// "12 de novembro de 2025"
pub fn format_pt_br_date(date: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        PT_MONTHS[date.month0() as usize],
        date.year()
    )
}

/// "20:30"
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// First `HH:MM` clock time in the text.
pub fn find_time(text: &str) -> Option<NaiveTime> {
    CLOCK_RE.captures_iter(text).find_map(|caps| {
        NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
    })
}

fn month_from_name(name: &str) -> Option<u32> {
    let key = strip_diacritics(&name.to_lowercase());
    if key.len() < 3 {
        return None;
    }
    PT_MONTHS
        .iter()
        .position(|month| {
            let month = strip_diacritics(month);
            month.starts_with(&key) || key.starts_with(&month)
        })
        .map(|idx| idx as u32 + 1)
}

fn expand_year(year: &str) -> Option<i32> {
    let value = year.parse::<i32>().ok()?;
    Some(if year.len() == 2 { 2000 + value } else { value })
}

/// Parses the date formats the source sites print: ISO, `DD/MM/YYYY`,
/// `DD-MM-YY` and Portuguese long dates.
pub fn parse_match_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE_RE.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }
    if let Some(caps) = DMY_DATE_RE.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            expand_year(&caps[3])?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }
    let folded = strip_diacritics(text);
    let caps = PT_DATE_RE.captures(&folded)?;
    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        month_from_name(&caps[2])?,
        caps[1].parse().ok()?,
    )
}

/// Parses a structured-data start date. Timestamps carrying an offset are
/// converted to Brasília wall-clock time; naive timestamps are taken as-is.
pub fn parse_event_start(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&brasilia_offset()).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&brasilia_offset()).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Slice of `html` extending `radius` bytes either side of the first
/// occurrence of `needle`, widened to char boundaries.
pub fn context_window<'a>(html: &'a str, needle: &str, radius: usize) -> Option<&'a str> {
    if needle.is_empty() {
        return None;
    }
    let idx = html.find(needle)?;
    let mut start = idx.saturating_sub(radius);
    while !html.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (idx + needle.len() + radius).min(html.len());
    while !html.is_char_boundary(end) {
        end += 1;
    }
    Some(&html[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("<td class=\"x\">Fortaleza&nbsp;&amp;\n  <b>Ceará</b></td>"),
            "Fortaleza & Ceará"
        );
        assert_eq!(clean_text("2 < 3 and <span>4 > 1</span>"), "2 < 3 and 4 > 1");
        assert_eq!(clean_text("&lt;b&gt; &quot;x&quot; &apos;y&apos;"), "<b> \"x\" 'y'");
        assert_eq!(clean_text("<div class=\"unterminated"), "<div class=\"unterminated");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_element_text() {
        let html = Html::parse_fragment("<div><span> Atlético </span>\n<span>MG</span></div>");
        let selector = Selector::parse("div").unwrap();
        let div = html.select(&selector).next().unwrap();
        assert_eq!(element_text(div), "Atlético MG");
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("2-1"), Some((2, 1)));
        assert_eq!(parse_score(" 0 : 0 "), Some((0, 0)));
        assert_eq!(parse_score("3 x 2"), Some((3, 2)));
        assert_eq!(parse_score("-"), None);
        assert_eq!(parse_score("vs"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn test_slug_and_id() {
        assert_eq!(slugify("Atlético-MG"), "atletico-mg");
        assert_eq!(slugify("  São Paulo FC "), "sao-paulo-fc");
        assert_eq!(slugify("Red Bull Bragantino!!"), "red-bull-bragantino");
        assert_eq!(match_id("Fortaleza", "Atlético-MG"), "fortaleza-atletico-mg");
    }

    #[test]
    fn test_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
        assert_eq!(format_pt_br_date(date), "12 de novembro de 2025");
        assert_eq!(parse_match_date("12 de novembro de 2025"), Some(date));
        assert_eq!(parse_match_date("12 Nov 2025"), Some(date));
        assert_eq!(parse_match_date("2025-11-12"), Some(date));
        assert_eq!(parse_match_date("12/11/2025"), Some(date));
        assert_eq!(parse_match_date("12-11-25"), Some(date));
        assert_eq!(
            parse_match_date("7 de março de 2024"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
        assert_eq!(parse_match_date("Total"), None);
    }

    #[test]
    fn test_find_time() {
        assert_eq!(find_time("Hoje, 20:30"), NaiveTime::from_hms_opt(20, 30, 0));
        assert_eq!(find_time("99:10 e 9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(find_time("sem hora"), None);
    }

    #[test]
    fn test_parse_event_start() {
        let naive = parse_event_start("2025-11-12T20:30:00").unwrap();
        assert_eq!(format_time(naive.time()), "20:30");
        let utc = parse_event_start("2025-11-12T23:30:00Z").unwrap();
        assert_eq!(utc, naive);
        let offset = parse_event_start("2025-11-12T20:30:00-03:00").unwrap();
        assert_eq!(offset, naive);
        assert!(parse_event_start("tomorrow").is_none());
    }

    #[test]
    fn test_context_window() {
        let html = "aaaa<a href=\"/m/1\">x</a>bbbb";
        assert_eq!(context_window(html, "/m/1", 2), Some("=\"/m/1\">"));
        assert_eq!(context_window(html, "/m/2", 2), None);
        let accented = "ééé/m/1ééé";
        assert!(context_window(accented, "/m/1", 1).is_some());
    }
}
