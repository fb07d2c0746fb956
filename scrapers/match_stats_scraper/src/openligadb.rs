use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::types::{LiveStatus, MatchInfo, MatchRecord, MatchStatus, Standing, TeamInfo};
use crate::utils::{brasilia_offset, format_time, match_id, parse_event_start};

pub const API_BASE: &str = "https://www.openligadb.de/api";
pub const DEFAULT_LEAGUE: &str = "Bundesliga";

const FINAL_RESULT_NAME: &str = "Endergebnis";
const FINAL_RESULT_TYPE: u32 = 2;
const HALF_TIME_RESULT_TYPE: u32 = 1;
const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// The API sends `null` for absent names, result lists and counters.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenLigaTeam {
    #[serde(deserialize_with = "null_as_default")]
    pub team_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub short_name: String,
    pub team_icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenLigaResult {
    #[serde(deserialize_with = "null_as_default")]
    pub result_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub points_team1: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub points_team2: u32,
    #[serde(rename = "ResultTypeID", deserialize_with = "null_as_default")]
    pub result_type_id: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenLigaLocation {
    pub location_city: Option<String>,
    pub location_stadium: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenLigaMatch {
    #[serde(rename = "MatchID", deserialize_with = "null_as_default")]
    pub match_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub match_date_time: String,
    #[serde(rename = "MatchDateTimeUTC")]
    pub match_date_time_utc: Option<String>,
    pub league_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub team1: OpenLigaTeam,
    #[serde(deserialize_with = "null_as_default")]
    pub team2: OpenLigaTeam,
    #[serde(deserialize_with = "null_as_default")]
    pub match_is_finished: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub match_results: Vec<OpenLigaResult>,
    pub last_update_date_time: Option<String>,
    pub location: Option<OpenLigaLocation>,
}

impl OpenLigaMatch {
    /// Kick-off in Brasília wall-clock time. The UTC field is preferred;
    /// the local field is taken as-is when it is the only one present.
    fn kickoff(&self) -> Option<NaiveDateTime> {
        self.match_date_time_utc
            .as_deref()
            .and_then(|utc| DateTime::parse_from_rfc3339(utc).ok())
            .map(|dt| dt.with_timezone(&brasilia_offset()).naive_local())
            .or_else(|| parse_event_start(&self.match_date_time))
    }

    /// Offset of the API's local timestamps, taken from the kick-off pair.
    /// Falls back to UTC when only one of the two is present.
    fn local_offset(&self) -> FixedOffset {
        let utc = self
            .match_date_time_utc
            .as_deref()
            .and_then(|utc| DateTime::parse_from_rfc3339(utc).ok())
            .map(|dt| dt.naive_utc());
        let local = NaiveDateTime::parse_from_str(&self.match_date_time, LOCAL_TIMESTAMP_FORMAT).ok();
        utc.zip(local)
            .and_then(|(utc, local)| {
                let seconds = (local - utc).num_seconds();
                FixedOffset::east_opt(i32::try_from(seconds).ok()?)
            })
            .unwrap_or_else(|| Utc.fix())
    }

    /// `LastUpdateDateTime` is usually local time without an offset, with or
    /// without fractional seconds.
    fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_update_date_time.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, LOCAL_TIMESTAMP_FORMAT).ok()?;
        self.local_offset()
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn final_result(&self) -> Option<&OpenLigaResult> {
        self.match_results
            .iter()
            .find(|r| r.result_name == FINAL_RESULT_NAME || r.result_type_id == FINAL_RESULT_TYPE)
    }

    fn half_time_result(&self) -> Option<&OpenLigaResult> {
        self.match_results
            .iter()
            .find(|r| r.result_type_id == HALF_TIME_RESULT_TYPE)
    }

    fn live_status(&self) -> Option<LiveStatus> {
        if !self.match_is_finished {
            return None;
        }
        let (home, away) = self
            .final_result()
            .map_or((0, 0), |r| (r.points_team1, r.points_team2));
        let half_time = self.half_time_result();
        Some(LiveStatus {
            is_live: false,
            status: MatchStatus::Finished,
            minute: None,
            home_score: Some(home),
            away_score: Some(away),
            home_score_ht: half_time.map(|r| r.points_team1),
            away_score_ht: half_time.map(|r| r.points_team2),
            last_updated: self.last_updated(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenLigaTableEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub team_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub short_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub points: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub matches: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub won: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub draw: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lost: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub goals: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub opponent_goals: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub goal_diff: i32,
}

pub fn match_data_url(league: &str, season: i32) -> String {
    format!("{}/getmatchdata/{}/{}", API_BASE, league, season)
}

pub fn table_url(league: &str, season: i32) -> String {
    format!("{}/getbltable/{}/{}", API_BASE, league, season)
}

pub fn single_match_url(match_id: u64) -> String {
    format!("{}/getmatchdata/{}", API_BASE, match_id)
}

fn record_from_match(m: &OpenLigaMatch, kickoff: Option<NaiveDateTime>) -> MatchRecord {
    let team = |t: &OpenLigaTeam| TeamInfo {
        name: t.team_name.clone(),
        logo_url: t.team_icon_url.clone().unwrap_or_default(),
    };
    let mut record = MatchRecord::new(
        match_id(&m.team1.team_name, &m.team2.team_name),
        team(&m.team1),
        team(&m.team2),
        MatchInfo {
            date: kickoff.map(|dt| dt.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            time: kickoff.map_or_else(|| "00:00".to_string(), |dt| format_time(dt.time())),
            competition: m
                .league_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEAGUE.to_string()),
            source_url: Some(single_match_url(m.match_id)),
        },
    );
    record.live_status = m.live_status();
    record
}

/// Maps a `getmatchdata` payload to records. With a date filter only
/// matches kicking off that day (Brasília time) are kept; matches without
/// a parseable kick-off never pass a filter.
pub fn parse_matches(json: &str, date_filter: Option<NaiveDate>) -> Result<Vec<MatchRecord>, ExtractError> {
    let matches: Vec<OpenLigaMatch> = serde_json::from_str(json)?;
    debug!("OpenLigaDB payload holds {} matches", matches.len());

    let records: Vec<MatchRecord> = matches
        .iter()
        .filter(|m| !m.team1.team_name.is_empty() && !m.team2.team_name.is_empty())
        .filter_map(|m| {
            let kickoff = m.kickoff();
            match date_filter {
                Some(day) if kickoff.map(|dt| dt.date()) != Some(day) => None,
                _ => Some(record_from_match(m, kickoff)),
            }
        })
        .collect();

    info!("OpenLigaDB: {} records", records.len());
    Ok(records)
}

/// Maps a `getbltable` payload to standings. Positions follow payload order.
pub fn parse_table(json: &str, competition: &str) -> Result<Vec<Standing>, ExtractError> {
    let entries: Vec<OpenLigaTableEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| Standing {
            position: idx as u32 + 1,
            team: entry.team_name,
            points: entry.points,
            played: entry.matches,
            wins: entry.won,
            draws: entry.draw,
            losses: entry.lost,
            competition: Some(competition.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHES: &str = r#"[
        {
            "MatchID": 72215,
            "MatchDateTime": "2025-11-22T15:30:00",
            "MatchDateTimeUTC": "2025-11-22T14:30:00Z",
            "LeagueName": "1. Fußball-Bundesliga 2025/2026",
            "Team1": {"TeamName": "FC Bayern München", "ShortName": "Bayern", "TeamIconUrl": "https://i.imgur.com/bayern.png"},
            "Team2": {"TeamName": "SC Freiburg", "ShortName": "Freiburg", "TeamIconUrl": null},
            "MatchIsFinished": true,
            "MatchResults": [
                {"ResultName": "Halbzeit", "PointsTeam1": 1, "PointsTeam2": 0, "ResultTypeID": 1},
                {"ResultName": "Endergebnis", "PointsTeam1": 3, "PointsTeam2": 1, "ResultTypeID": 2}
            ],
            "LastUpdateDateTime": "2025-11-22T17:25:00"
        },
        {
            "MatchID": 72216,
            "MatchDateTime": "2025-11-23T17:30:00",
            "MatchDateTimeUTC": "2025-11-23T16:30:00Z",
            "LeagueName": "",
            "Team1": {"TeamName": "1. FC Köln"},
            "Team2": {"TeamName": "Borussia Dortmund"},
            "MatchIsFinished": false,
            "MatchResults": []
        }
    ]"#;

    #[test]
    fn test_parse_matches() {
        let records = parse_matches(MATCHES, None).unwrap();
        assert_eq!(records.len(), 2);

        let bayern = &records[0];
        assert_eq!(bayern.id, "fc-bayern-munchen-sc-freiburg");
        assert_eq!(bayern.match_info.date, "2025-11-22");
        assert_eq!(bayern.match_info.time, "11:30");
        assert_eq!(bayern.match_info.competition, "1. Fußball-Bundesliga 2025/2026");
        assert_eq!(
            bayern.match_info.source_url.as_deref(),
            Some("https://www.openligadb.de/api/getmatchdata/72215")
        );
        assert_eq!(bayern.team_a.logo_url, "https://i.imgur.com/bayern.png");
        assert_eq!(bayern.team_b.logo_url, "");

        let status = bayern.live_status.as_ref().unwrap();
        assert_eq!(status.status, MatchStatus::Finished);
        assert!(!status.is_live);
        assert_eq!((status.home_score, status.away_score), (Some(3), Some(1)));
        assert_eq!((status.home_score_ht, status.away_score_ht), (Some(1), Some(0)));
        assert_eq!(
            status.last_updated,
            Some(Utc.with_ymd_and_hms(2025, 11, 22, 16, 25, 0).unwrap())
        );

        let koln = &records[1];
        assert_eq!(koln.id, "1-fc-koln-borussia-dortmund");
        assert_eq!(koln.match_info.competition, DEFAULT_LEAGUE);
        assert!(koln.live_status.is_none());
    }

    #[test]
    fn test_null_fields_keep_the_matchday() {
        let json = r#"[{
            "MatchID": 72301,
            "MatchDateTime": "2025-08-23T15:30:00",
            "MatchDateTimeUTC": "2025-08-23T13:30:00Z",
            "LeagueName": null,
            "Team1": {"TeamName": "VfB Stuttgart", "ShortName": null, "TeamIconUrl": null},
            "Team2": {"TeamName": "1. FSV Mainz 05", "ShortName": ""},
            "MatchIsFinished": true,
            "MatchResults": [
                {"ResultName": null, "PointsTeam1": 2, "PointsTeam2": 1, "ResultTypeID": 2},
                {"ResultName": "Halbzeit", "PointsTeam1": null, "PointsTeam2": 0, "ResultTypeID": 1}
            ],
            "LastUpdateDateTime": "2025-08-23T17:25:43.45"
        }, {
            "MatchID": 72302,
            "MatchDateTime": "2025-08-24T17:30:00",
            "Team1": {"TeamName": "SV Werder Bremen", "ShortName": null},
            "Team2": {"TeamName": "Hamburger SV", "ShortName": null},
            "MatchIsFinished": null,
            "MatchResults": null
        }]"#;
        let records = parse_matches(json, None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "vfb-stuttgart-1-fsv-mainz-05");
        assert_eq!(records[0].match_info.competition, DEFAULT_LEAGUE);

        let status = records[0].live_status.as_ref().unwrap();
        assert_eq!((status.home_score, status.away_score), (Some(2), Some(1)));
        assert_eq!((status.home_score_ht, status.away_score_ht), (Some(0), Some(0)));
        // Summer time in Germany: two hours ahead of UTC.
        let expected = Utc.with_ymd_and_hms(2025, 8, 23, 15, 25, 43).unwrap()
            + chrono::Duration::milliseconds(450);
        assert_eq!(status.last_updated, Some(expected));

        assert!(records[1].live_status.is_none());
        assert_eq!(records[1].match_info.date, "2025-08-24");
    }

    #[test]
    fn test_last_updated_without_utc_kickoff_is_read_as_utc() {
        let m = OpenLigaMatch {
            match_date_time: "2025-11-22T15:30:00".to_string(),
            last_update_date_time: Some("2025-11-22T17:24:51".to_string()),
            ..OpenLigaMatch::default()
        };
        assert_eq!(
            m.last_updated(),
            Some(Utc.with_ymd_and_hms(2025, 11, 22, 17, 24, 51).unwrap())
        );

        let m = OpenLigaMatch {
            last_update_date_time: Some("2025-11-22T17:24:51+01:00".to_string()),
            ..OpenLigaMatch::default()
        };
        assert_eq!(
            m.last_updated(),
            Some(Utc.with_ymd_and_hms(2025, 11, 22, 16, 24, 51).unwrap())
        );
    }

    #[test]
    fn test_date_filter() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 23).unwrap();
        let records = parse_matches(MATCHES, Some(day)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_a.name, "1. FC Köln");
    }

    #[test]
    fn test_invalid_payload() {
        let err = parse_matches("<html>not json</html>", None).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPayload(_)));
        assert!(err.diagnostics().is_none());
    }

    #[test]
    fn test_parse_table() {
        let json = r#"[
            {"TeamName": "FC Bayern München", "Points": 31, "Matches": 11, "Won": 10, "Draw": 1, "Lost": 0, "Goals": 41, "OpponentGoals": 8, "GoalDiff": 33},
            {"TeamName": "RB Leipzig", "ShortName": null, "Points": 26, "Matches": 11, "Won": 8, "Draw": 2, "Lost": 1, "Goals": 22, "OpponentGoals": 12, "GoalDiff": 10}
        ]"#;
        let standings = parse_table(json, DEFAULT_LEAGUE).unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[1].position, 2);
        assert_eq!(standings[1].team, "RB Leipzig");
        assert_eq!(standings[1].points, 26);
        assert_eq!(standings[1].draws, 2);
        assert_eq!(standings[0].competition.as_deref(), Some(DEFAULT_LEAGUE));
    }

    #[test]
    fn test_urls() {
        assert_eq!(match_data_url("bl1", 2025), "https://www.openligadb.de/api/getmatchdata/bl1/2025");
        assert_eq!(table_url("bl1", 2025), "https://www.openligadb.de/api/getbltable/bl1/2025");
    }
}
