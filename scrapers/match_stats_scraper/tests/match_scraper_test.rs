use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use scraper::Html;

use match_stats_scraper::config::ScraperConfig;
use match_stats_scraper::error::ExtractError;
use match_stats_scraper::live_status::{extract_live_status, extract_odds};
use match_stats_scraper::match_scraper::{MatchScraper, ParseOutput, Source};
use match_stats_scraper::openligadb;
use match_stats_scraper::spa::SpaDetector;
use match_stats_scraper::standings::extract_standings;
use match_stats_scraper::structured_data::extract_events;
use match_stats_scraper::tables::{find_team_tables, TableKind};
use match_stats_scraper::team_names::{find_best_match, normalize, same_team};
use match_stats_scraper::types::{MatchRecord, MatchStatus, ResultMarker};

const LISTING: &str = include_str!("fixtures/stats_site/listing.html");
const DETAILS: &str = include_str!("fixtures/stats_site/details.html");
const SOCCERWAY_SHELL: &str = include_str!("fixtures/soccerway/shell.html");
const SOCCERWAY_MATCHES: &str = include_str!("fixtures/soccerway/matches.html");
const SOKKERPRO_FIXTURES: &str = include_str!("fixtures/sokkerpro/fixtures.html");
const OPENLIGADB_MATCHDAY: &str = include_str!("fixtures/openligadb/bl1_matchday.json");

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 12).unwrap()
}

fn new_scraper() -> MatchScraper {
    MatchScraper::with_reference_date(&ScraperConfig::default(), reference_date())
}

/// Leading part of `text`, cut on a char boundary.
fn prefix(text: &str, len: usize) -> &str {
    let end = (0..=len.min(text.len()))
        .rev()
        .find(|idx| text.is_char_boundary(*idx))
        .unwrap_or(0);
    &text[..end]
}

fn records(output: &ParseOutput) -> Vec<MatchRecord> {
    output.records().into_iter().cloned().collect()
}

#[test]
fn test_listing_page_yields_one_record_per_event() {
    let output = new_scraper().parse_auto(LISTING).unwrap();
    let ParseOutput::Listing(listing) = &output else {
        panic!("expected a listing, got {:?}", output);
    };

    assert_eq!(listing.records.len(), 1);
    let record = &listing.records[0];
    assert_eq!(record.id, "fortaleza-atletico-mg");
    assert_eq!(record.team_a.name, "Fortaleza");
    assert_eq!(record.team_b.name, "Atlético-MG");
    assert_eq!(record.team_b.logo_url, "https://stats.example/img/equipas/atletico-mg.png");
    assert_eq!(record.match_info.date, "12 de novembro de 2025");
    assert_eq!(record.match_info.time, "20:30");
    assert_eq!(record.match_info.competition, "Brasileirão Série A");

    let status = record.live_status.as_ref().unwrap();
    assert!(status.is_live);
    assert_eq!(status.status, MatchStatus::Live);
    assert_eq!((status.home_score, status.away_score), (Some(2), Some(1)));

    assert_eq!(listing.leagues.len(), 1);
    assert_eq!(listing.leagues[0].league_name, "Brasileirão Série A");
}

#[test]
fn test_details_page_fills_form_h2h_and_streaks() {
    let output = new_scraper().parse_auto(DETAILS).unwrap();
    let ParseOutput::Details(record) = output else {
        panic!("expected a details record");
    };

    assert_eq!(record.id, "fortaleza-bahia");
    assert_eq!(record.team_a.name, "Fortaleza");
    assert_eq!(record.team_b.name, "Bahia");

    assert_eq!(record.team_a_form.len(), 2);
    // The upcoming Bahia x Santos fixture has no score yet.
    assert_eq!(record.team_b_form.len(), 1);
    assert!(record.team_b_form.iter().all(|m| m.away_team != "Santos"));
    assert_eq!(record.team_b_form[0].result_for_team, Some(ResultMarker::D));

    assert_eq!(record.h2h_data.len(), 1);
    assert_eq!(record.h2h_data[0].result_for_team, Some(ResultMarker::V));

    assert_eq!(record.team_a_streaks.home.win_streak, 5);
    assert_eq!(record.team_a_streaks.away.win_streak, 0);
    assert_eq!(record.team_a_streaks.global.win_streak, 2);
    assert_eq!(record.team_b_streaks.away.winless_streak, 4);

    assert!(record.standings_data.is_empty());
    assert!(record.team_a_opponent_analysis.global.is_empty());
}

#[test]
fn test_details_hints_pick_the_teams() {
    let scraper = new_scraper().hints(match_stats_scraper::stats_site::DetailsHints {
        match_id: None,
        team_a: Some("bahia".to_string()),
        team_b: Some("fortaleza".to_string()),
    });
    let output = scraper.parse(DETAILS, Source::StatsSiteDetails).unwrap();
    let record = &records(&output)[0];
    assert_eq!(record.id, "bahia-fortaleza");
    assert_eq!(record.team_a_form.len(), 1);
    assert_eq!(record.team_b_form.len(), 2);
}

#[test]
fn test_shell_pages_need_rendered_html() {
    assert!(SpaDetector::default().is_spa_shell(SOCCERWAY_SHELL));

    for source in [Source::Soccerway, Source::StatsSite, Source::SokkerPro] {
        let err = new_scraper().parse(SOCCERWAY_SHELL, source).unwrap_err();
        assert!(err.needs_rendered_html(), "{:?} did not flag the shell", source);
        let diagnostics = err.diagnostics().unwrap();
        assert!(diagnostics.has_skeleton);
        assert!(diagnostics.has_loading);
        assert!(!diagnostics.has_event_markup);
    }
}

#[test]
fn test_soccerway_event_rows() {
    assert_eq!(Source::detect(SOCCERWAY_MATCHES), Source::Soccerway);
    let output = new_scraper().parse_auto(SOCCERWAY_MATCHES).unwrap();
    let records = records(&output);

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["fortaleza-atletico-mg", "gremio-internacional", "bayern-dortmund"]);
    assert_eq!(records[1].match_info.competition, "Brasil: Série A");
    assert_eq!(records[1].match_info.time, "21:30");
    assert_eq!(records[2].match_info.competition, "Alemanha: Bundesliga");
    assert_eq!(records[2].match_info.date, "2025-11-12");

    let groups = match_stats_scraper::soccerway::group_by_competition(&records);
    assert_eq!(groups[0].matches.len(), 2);
    assert_eq!(groups[1].matches.len(), 1);
}

#[test]
fn test_sokkerpro_fixture_table() {
    assert_eq!(Source::detect(SOKKERPRO_FIXTURES), Source::SokkerPro);
    let output = new_scraper().parse_auto(SOKKERPRO_FIXTURES).unwrap();
    let records = records(&output);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "corinthians-sao-paulo");
    assert_eq!(records[0].match_info.time, "19:00");
    assert_eq!(records[0].match_info.date, "2025-11-12");
    assert_eq!(records[1].id, "cruzeiro-botafogo");
    assert_eq!(records[1].match_info.competition, "Copa do Brasil");
}

#[test]
fn test_openligadb_matchday() {
    let output = new_scraper().parse_auto(OPENLIGADB_MATCHDAY).unwrap();
    let records = records(&output);
    assert_eq!(records.len(), 2);

    let bayern = &records[0];
    assert_eq!(bayern.id, "fc-bayern-munchen-sc-freiburg");
    assert_eq!(bayern.match_info.date, "2025-11-22");
    let status = bayern.live_status.as_ref().unwrap();
    assert_eq!(status.status, MatchStatus::Finished);
    assert_eq!((status.home_score, status.away_score), (Some(6), Some(2)));
    assert_eq!((status.home_score_ht, status.away_score_ht), (Some(2), Some(0)));
    // Local German time, one hour ahead of UTC in November.
    assert_eq!(
        status.last_updated,
        Some(Utc.with_ymd_and_hms(2025, 11, 22, 16, 24, 51).unwrap() + Duration::milliseconds(370))
    );
    // Null short names and result lists do not reject the matchday.
    assert_eq!(records[1].team_a.name, "1. FC Köln");
    assert!(records[1].live_status.is_none());

    let filtered = openligadb::parse_matches(
        OPENLIGADB_MATCHDAY,
        NaiveDate::from_ymd_opt(2025, 11, 23),
    )
    .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].team_b.name, "Borussia Dortmund");
}

#[test]
fn test_truncated_payload_is_invalid() {
    let truncated = prefix(OPENLIGADB_MATCHDAY, 200);
    let err = new_scraper().parse(truncated, Source::OpenLigaDb).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidPayload(_)));
}

#[test]
fn test_live_status_ao_vivo() {
    let status = extract_live_status("<div>AO VIVO</div><div class=\"placar\">2-1</div>");
    assert!(status.is_live);
    assert_eq!(status.status, MatchStatus::Live);
    assert_eq!(status.home_score, Some(2));
    assert_eq!(status.away_score, Some(1));
}

#[test]
fn test_team_name_variants_share_a_key() {
    assert_eq!(normalize("Atlético Mineiro"), normalize("atletico-mg"));
    assert!(same_team("Atlético Mineiro", "atletico-mg"));
    assert_eq!(
        find_best_match(&["Fortaleza", "Atlético-MG"], "Atlético Mineiro"),
        Some("Atlético-MG")
    );
    for name in ["Atlético Mineiro", "São Paulo F.C.", "Grêmio", "", "  "] {
        assert_eq!(normalize(&normalize(name)), normalize(name));
    }
}

#[test]
fn test_extraction_is_repeatable() {
    let first = new_scraper().parse_auto(DETAILS).unwrap();
    let second = new_scraper().parse_auto(DETAILS).unwrap();
    assert_eq!(records(&first), records(&second));

    let first = new_scraper().parse_auto(LISTING).unwrap();
    let second = new_scraper().parse_auto(LISTING).unwrap();
    assert_eq!(records(&first), records(&second));
}

#[test]
fn test_extractors_accept_any_input() {
    let inputs = [
        "",
        "plain text without markup",
        "<",
        "<<<>>>",
        "<table><tr><td>1-0",
        r#"<script type="application/ld+json">{"@type": "SportsEvent", "homeTeam": {"#,
        prefix(DETAILS, DETAILS.len() / 2),
        prefix(LISTING, LISTING.len() / 3),
    ];
    for input in inputs {
        let document = Html::parse_document(input);
        let _ = extract_events(input);
        let _ = extract_standings(&document);
        let _ = find_team_tables(&document, TableKind::RecentForm);
        let _ = extract_odds(input);
        let status = extract_live_status(input);
        assert!(status.last_updated.is_none());
        for source in [
            Source::StatsSite,
            Source::StatsSiteDetails,
            Source::Soccerway,
            Source::SokkerPro,
            Source::OpenLigaDb,
            Source::Competition,
        ] {
            let _ = new_scraper().parse(input, source);
        }
    }
}
