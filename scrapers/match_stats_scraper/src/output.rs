use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::{MatchRecord, MatchStatus};

const CSV_HEADER: [&str; 11] = [
    "match_id",
    "date",
    "time",
    "competition",
    "team_a",
    "team_b",
    "status",
    "home_score",
    "away_score",
    "h2h_matches",
    "source_url",
];

fn status_label(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Scheduled => "scheduled",
        MatchStatus::Live => "live",
        MatchStatus::Halftime => "halftime",
        MatchStatus::Finished => "finished",
        MatchStatus::Postponed => "postponed",
        MatchStatus::Cancelled => "cancelled",
    }
}

/// JSON and CSV paths for an input file, mirroring its location below
/// `input_root` inside `output_dir`.
pub fn output_paths(output_dir: &Path, input: &Path, input_root: Option<&Path>) -> (PathBuf, PathBuf) {
    let relative = input_root
        .and_then(|root| input.strip_prefix(root).ok())
        .or_else(|| input.file_name().map(Path::new))
        .unwrap_or(input);
    let base = output_dir.join(relative);
    (base.with_extension("json"), base.with_extension("csv"))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Writing JSON to {:?}", path);
    Ok(())
}

/// One row per record with the identifying fields and the live score, if any.
pub fn write_csv_summary(path: &Path, records: &[&MatchRecord]) -> Result<()> {
    ensure_parent(path)?;
    info!("Writing CSV to {:?}", path);
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CSV_HEADER)?;

    for record in records {
        let live = record.live_status.as_ref();
        let score = |s: Option<u32>| s.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            record.id.as_str(),
            record.match_info.date.as_str(),
            record.match_info.time.as_str(),
            record.match_info.competition.as_str(),
            record.team_a.name.as_str(),
            record.team_b.name.as_str(),
            live.map_or("scheduled", |l| status_label(l.status)),
            score(live.and_then(|l| l.home_score)).as_str(),
            score(live.and_then(|l| l.away_score)).as_str(),
            record.h2h_data.len().to_string().as_str(),
            record.match_info.source_url.as_deref().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LiveStatus, MatchInfo, TeamInfo};
    use pretty_assertions::assert_eq;

    fn record() -> MatchRecord {
        let mut record = MatchRecord::new(
            "gremio-internacional".to_string(),
            TeamInfo {
                name: "Grêmio".to_string(),
                logo_url: String::new(),
            },
            TeamInfo {
                name: "Internacional".to_string(),
                logo_url: String::new(),
            },
            MatchInfo {
                date: "12 de novembro de 2025".to_string(),
                time: "21:30".to_string(),
                competition: "Brasileirão, Série A".to_string(),
                source_url: None,
            },
        );
        record.live_status = Some(LiveStatus {
            is_live: true,
            status: MatchStatus::Live,
            minute: Some(67),
            home_score: Some(1),
            away_score: Some(1),
            ..LiveStatus::default()
        });
        record
    }

    #[test]
    fn test_output_paths() {
        let (json, csv) = output_paths(
            Path::new("out"),
            Path::new("html_files/rodada/jogo.html"),
            Some(Path::new("html_files")),
        );
        assert_eq!(json, PathBuf::from("out/rodada/jogo.json"));
        assert_eq!(csv, PathBuf::from("out/rodada/jogo.csv"));

        let (json, _) = output_paths(Path::new("out"), Path::new("/tmp/x/jogo.html"), None);
        assert_eq!(json, PathBuf::from("out/jogo.json"));
    }

    #[test]
    fn test_csv_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/summary.csv");
        let record = record();
        write_csv_summary(&path, &[&record]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "gremio-internacional,12 de novembro de 2025,21:30,\"Brasileirão, Série A\",Grêmio,Internacional,live,1,1,0,"
        );
    }

    #[test]
    fn test_json_is_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        write_json(&path, &record()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["teamA"]["name"], "Grêmio");
        assert_eq!(value["liveStatus"]["isLive"], true);
        assert_eq!(value["matchInfo"]["time"], "21:30");
    }
}
