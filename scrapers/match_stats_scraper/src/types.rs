use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A statistic reported separately for home games, away games and overall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoped<T> {
    pub home: T,
    pub away: T,
    pub global: T,
}

impl<T> Scoped<T> {
    pub fn get(&self, scope: Scope) -> &T {
        match scope {
            Scope::Home => &self.home,
            Scope::Away => &self.away,
            Scope::Global => &self.global,
        }
    }

    pub fn get_mut(&mut self, scope: Scope) -> &mut T {
        match scope {
            Scope::Home => &mut self.home,
            Scope::Away => &mut self.away,
            Scope::Global => &mut self.global,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Home,
    Away,
    Global,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Home, Scope::Away, Scope::Global];

    /// Column holding this scope's value in the stats-site tables.
    pub fn column(self) -> usize {
        match self {
            Scope::Home => 1,
            Scope::Away => 2,
            Scope::Global => 3,
        }
    }
}

/// Which slot of a fixture a team occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

/// Outcome of a match from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultMarker {
    /// Vitória
    V,
    /// Empate
    E,
    /// Derrota
    D,
}

impl ResultMarker {
    /// Derives the marker for the team that played on `side`. A subject that
    /// played on neither side is reported as a draw.
    pub fn derive(home_score: u32, away_score: u32, side: Option<Side>) -> Self {
        let (own, other) = match side {
            Some(Side::Home) => (home_score, away_score),
            Some(Side::Away) => (away_score, home_score),
            None => return ResultMarker::E,
        };
        match own.cmp(&other) {
            std::cmp::Ordering::Greater => ResultMarker::V,
            std::cmp::Ordering::Less => ResultMarker::D,
            std::cmp::Ordering::Equal => ResultMarker::E,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub date: String,
    pub time: String,
    pub competition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Base match-result shape shared by form, head-to-head and fixture lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub date: String,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_for_team: Option<ResultMarker>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakCounters {
    pub win_streak: u32,
    pub draw_streak: u32,
    pub loss_streak: u32,
    pub unbeaten_streak: u32,
    pub winless_streak: u32,
    pub no_draw_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreakKind {
    Win,
    Draw,
    Loss,
    Unbeaten,
    Winless,
    NoDraw,
}

impl StreakCounters {
    pub fn set(&mut self, kind: StreakKind, value: u32) {
        match kind {
            StreakKind::Win => self.win_streak = value,
            StreakKind::Draw => self.draw_streak = value,
            StreakKind::Loss => self.loss_streak = value,
            StreakKind::Unbeaten => self.unbeaten_streak = value,
            StreakKind::Winless => self.winless_streak = value,
            StreakKind::NoDraw => self.no_draw_streak = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One historical result annotated with the opponent's league rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentAnalysisMatch {
    pub opponent_rank: u32,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    /// Side the analysed team played on, when it could be identified.
    pub subject_side: Option<Side>,
    pub score: String,
    pub result: ResultMarker,
    pub date: String,
    pub first_goal: String,
}

impl OpponentAnalysisMatch {
    pub fn new(
        opponent_rank: u32,
        home_team: String,
        away_team: String,
        (home_score, away_score): (u32, u32),
        subject_side: Option<Side>,
        first_goal: String,
    ) -> Self {
        Self {
            opponent_rank,
            home_team,
            away_team,
            home_score,
            away_score,
            subject_side,
            score: format!("{}-{}", home_score, away_score),
            result: ResultMarker::derive(home_score, away_score, subject_side),
            date: String::new(),
            first_goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalMoments {
    pub scored: [u32; 6],
    pub conceded: [u32; 6],
}

impl Default for GoalMoments {
    fn default() -> Self {
        Self {
            scored: [0; 6],
            conceded: [0; 6],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGoalStats {
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub avg_total_goals: f64,
    pub no_goals_scored_pct: f64,
    pub no_goals_conceded_pct: f64,
    pub over25_pct: f64,
    pub under25_pct: f64,
    pub goal_moments: GoalMoments,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStat {
    pub games: u32,
    pub total: u32,
    pub pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalScoringPatterns {
    pub opens_score: PatternStat,
    pub wins_when_opening: PatternStat,
    pub comebacks: PatternStat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectScore {
    pub score: String,
    pub percentage: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectScores {
    pub ht: Vec<CorrectScore>,
    pub ft: Vec<CorrectScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub position: u32,
    pub team: String,
    pub points: u32,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Set by feeds whose tables are not embedded in a match page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Live,
    Halftime,
    Finished,
    Postponed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub is_live: bool,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_score: Option<u32>,
    #[serde(rename = "homeScoreHT", skip_serializing_if = "Option::is_none")]
    pub home_score_ht: Option<u32>,
    #[serde(rename = "awayScoreHT", skip_serializing_if = "Option::is_none")]
    pub away_score_ht: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl LiveStatus {
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.last_updated = Some(now);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    #[serde(rename = "homeWin", skip_serializing_if = "Option::is_none")]
    pub home_win: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<f64>,
    #[serde(rename = "awayWin", skip_serializing_if = "Option::is_none")]
    pub away_win: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over1_5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under1_5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over2_5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under2_5: Option<f64>,
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Odds {
    pub fn is_empty(&self) -> bool {
        self.home_win.is_none()
            && self.draw.is_none()
            && self.away_win.is_none()
            && self.over1_5.is_none()
            && self.under1_5.is_none()
            && self.over2_5.is_none()
            && self.under2_5.is_none()
    }

    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.last_updated = Some(now);
        self
    }
}

/// Canonical output unit. Always structurally complete: blocks that could
/// not be extracted hold zero values and empty lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub team_a: TeamInfo,
    pub team_b: TeamInfo,
    pub match_info: MatchInfo,
    pub h2h_data: Vec<MatchResult>,
    pub team_a_form: Vec<MatchResult>,
    pub team_b_form: Vec<MatchResult>,
    pub standings_data: Vec<Standing>,
    pub team_a_goal_stats: Scoped<TeamGoalStats>,
    pub team_b_goal_stats: Scoped<TeamGoalStats>,
    pub team_a_streaks: Scoped<StreakCounters>,
    pub team_b_streaks: Scoped<StreakCounters>,
    pub team_a_opponent_analysis: Scoped<Vec<OpponentAnalysisMatch>>,
    pub team_b_opponent_analysis: Scoped<Vec<OpponentAnalysisMatch>>,
    pub team_a_goal_patterns: Scoped<GoalScoringPatterns>,
    pub team_b_goal_patterns: Scoped<GoalScoringPatterns>,
    pub team_a_correct_scores: Scoped<CorrectScores>,
    pub team_b_correct_scores: Scoped<CorrectScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_status: Option<LiveStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds: Option<Odds>,
}

impl MatchRecord {
    /// Builds a record with every statistic block zero-filled. Each call
    /// constructs fresh placeholder values.
    pub fn new(id: String, team_a: TeamInfo, team_b: TeamInfo, match_info: MatchInfo) -> Self {
        Self {
            id,
            team_a,
            team_b,
            match_info,
            h2h_data: Vec::new(),
            team_a_form: Vec::new(),
            team_b_form: Vec::new(),
            standings_data: Vec::new(),
            team_a_goal_stats: Scoped::default(),
            team_b_goal_stats: Scoped::default(),
            team_a_streaks: Scoped::default(),
            team_b_streaks: Scoped::default(),
            team_a_opponent_analysis: Scoped::default(),
            team_b_opponent_analysis: Scoped::default(),
            team_a_goal_patterns: Scoped::default(),
            team_b_goal_patterns: Scoped::default(),
            team_a_correct_scores: Scoped::default(),
            team_b_correct_scores: Scoped::default(),
            live_status: None,
            odds: None,
        }
    }
}

/// Records sharing a competition, in the order the groups were first seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueGroup {
    pub league_name: String,
    pub matches: Vec<MatchRecord>,
}

/// Groups records by a key, keeping first-seen group order.
pub fn group_records<F>(records: &[MatchRecord], mut key: F) -> Vec<LeagueGroup>
where
    F: FnMut(&MatchRecord) -> String,
{
    let mut groups: Vec<LeagueGroup> = Vec::new();
    for record in records {
        let league_name = key(record);
        match groups.iter_mut().find(|g| g.league_name == league_name) {
            Some(group) => group.matches.push(record.clone()),
            None => groups.push(LeagueGroup {
                league_name,
                matches: vec![record.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_marker_derivation() {
        assert_eq!(ResultMarker::derive(2, 1, Some(Side::Home)), ResultMarker::V);
        assert_eq!(ResultMarker::derive(2, 1, Some(Side::Away)), ResultMarker::D);
        assert_eq!(ResultMarker::derive(1, 1, Some(Side::Away)), ResultMarker::E);
        assert_eq!(ResultMarker::derive(0, 3, None), ResultMarker::E);
    }

    #[test]
    fn test_placeholders_are_fresh_per_record() {
        let mut first = MatchRecord::new(
            "a-b".to_string(),
            TeamInfo::default(),
            TeamInfo::default(),
            MatchInfo::default(),
        );
        first.team_a_streaks.home.win_streak = 4;
        let second = MatchRecord::new(
            "a-b".to_string(),
            TeamInfo::default(),
            TeamInfo::default(),
            MatchInfo::default(),
        );
        assert!(second.team_a_streaks.home.is_empty());
        assert_eq!(second.team_a_goal_stats.global.goal_moments.scored, [0; 6]);
    }

    #[test]
    fn test_record_serializes_with_collaborator_field_names() {
        let record = MatchRecord::new(
            "fortaleza-atletico-mg".to_string(),
            TeamInfo { name: "Fortaleza".to_string(), logo_url: String::new() },
            TeamInfo { name: "Atlético-MG".to_string(), logo_url: String::new() },
            MatchInfo::default(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["teamA"]["name"], "Fortaleza");
        assert_eq!(json["teamAStreaks"]["home"]["winStreak"], 0);
        assert!(json["teamBOpponentAnalysis"]["global"].as_array().unwrap().is_empty());
        assert!(json.get("liveStatus").is_none());
    }

    #[test]
    fn test_odds_emptiness() {
        assert!(Odds::default().is_empty());
        let odds = Odds { under2_5: Some(1.9), ..Odds::default() };
        assert!(!odds.is_empty());
    }
}
