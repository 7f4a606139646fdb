//! Score data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{UserId, game::GameType};

/// Round to two decimal places, half away from zero
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `part` in `whole`, rounded to two decimals; 0 when `whole` is 0
pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Running totals for one (user, game type) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub user_id: UserId,
    pub game_type: GameType,
    /// Most recent session score
    pub score: i64,
    pub total_score: i64,
    pub games_played: i64,
    pub wins: i64,
    pub losses: i64,
    pub achievements: Vec<String>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Score {
    /// Zeroed row, as created before the first update
    pub fn new(user_id: UserId, game_type: GameType, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            game_type,
            score: 0,
            total_score: 0,
            games_played: 0,
            wins: 0,
            losses: 0,
            achievements: Vec::new(),
            last_played_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn win_rate(&self) -> f64 {
        percentage(self.wins, self.games_played)
    }

    /// Add an achievement; returns false if it was already present
    pub fn add_achievement(&mut self, name: &str) -> bool {
        if self.achievements.iter().any(|a| a == name) {
            return false;
        }
        self.achievements.push(name.to_string());
        true
    }
}

/// Effect of one completed session on a [`Score`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub score: i64,
    /// `None` leaves wins and losses untouched
    pub is_win: Option<bool>,
}

impl ScoreUpdate {
    pub fn apply(&self, row: &mut Score, now: DateTime<Utc>) {
        row.score = self.score;
        row.total_score = row.total_score.saturating_add(self.score);
        row.games_played += 1;
        match self.is_win {
            Some(true) => row.wins += 1,
            Some(false) => row.losses += 1,
            None => {}
        }
        row.last_played_at = Some(now);
        row.updated_at = now;
    }
}

/// Per-game statistics as shown to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub game_type: GameType,
    pub current_score: i64,
    pub total_score: i64,
    pub games_played: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: f64,
    pub achievements: Vec<String>,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl From<&Score> for ScoreStats {
    fn from(score: &Score) -> Self {
        Self {
            game_type: score.game_type,
            current_score: score.score,
            total_score: score.total_score,
            games_played: score.games_played,
            wins: score.wins,
            losses: score.losses,
            win_rate: score.win_rate(),
            achievements: score.achievements.clone(),
            last_played_at: score.last_played_at,
        }
    }
}

/// All of a user's score stats plus cross-game totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub stats: Vec<ScoreStats>,
    pub total_games: i64,
    pub total_score: i64,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[Score]) -> Self {
        let stats: Vec<ScoreStats> = scores.iter().map(ScoreStats::from).collect();
        Self {
            total_games: stats.iter().map(|s| s.games_played).sum(),
            total_score: stats.iter().map(|s| s.total_score).sum(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 28, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_apply_accumulates() {
        let mut row = Score::new(1, GameType::Spin, now());

        ScoreUpdate { score: 150, is_win: Some(true) }.apply(&mut row, now());
        ScoreUpdate { score: 40, is_win: Some(false) }.apply(&mut row, now());
        ScoreUpdate { score: 10, is_win: None }.apply(&mut row, now());

        assert_eq!(row.score, 10);
        assert_eq!(row.total_score, 200);
        assert_eq!(row.games_played, 3);
        assert_eq!(row.wins, 1);
        assert_eq!(row.losses, 1);
        assert_eq!(row.last_played_at, Some(now()));
    }

    #[test]
    fn test_win_rate_rounding() {
        let mut row = Score::new(1, GameType::Drop, now());
        assert_eq!(row.win_rate(), 0.0);

        row.games_played = 3;
        row.wins = 1;
        assert_eq!(row.win_rate(), 33.33);

        row.wins = 2;
        assert_eq!(row.win_rate(), 66.67);
    }

    #[test]
    fn test_achievements_are_a_set() {
        let mut row = Score::new(1, GameType::Spin, now());
        assert!(row.add_achievement("first_spin"));
        assert!(!row.add_achievement("first_spin"));
        assert_eq!(row.achievements, vec!["first_spin".to_string()]);
    }

    #[test]
    fn test_summary_totals() {
        let mut spin = Score::new(1, GameType::Spin, now());
        spin.total_score = 300;
        spin.games_played = 2;
        let mut drop = Score::new(1, GameType::Drop, now());
        drop.total_score = 50;
        drop.games_played = 5;

        let summary = ScoreSummary::from_scores(&[spin, drop]);
        assert_eq!(summary.total_score, 350);
        assert_eq!(summary.total_games, 7);
        assert_eq!(summary.stats.len(), 2);
    }
}
