//! Leaderboard data models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{UserId, game::GameType, score::Score};

/// Maximum page size of a ranking
pub const MAX_LIMIT: i64 = 100;

/// Maximum number of top players
pub const MAX_TOP_PLAYERS: i64 = 50;

/// Time window for rankings and rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Week,
    Month,
}

impl Period {
    /// Earliest `last_played_at` that still qualifies, `None` for all time
    pub fn floor(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::All => None,
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(now - Duration::days(30)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::All => "all",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Period::All),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

/// Which score rows are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateFilter {
    pub game_type: GameType,
    /// Minimum `last_played_at`
    pub since: Option<DateTime<Utc>>,
}

impl CandidateFilter {
    /// Positive total and, if windowed, played within the window
    pub fn admits(&self, score: &Score) -> bool {
        score.game_type == self.game_type
            && score.total_score > 0
            && self
                .since
                .is_none_or(|floor| score.last_played_at.is_some_and(|at| at >= floor))
    }
}

/// Score row joined with its owner's username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreWithUser {
    pub score: Score,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: UserId,
    pub username: String,
    pub total_score: i64,
    pub current_score: i64,
    pub games_played: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate: f64,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    pub fn new(rank: i64, row: &ScoreWithUser) -> Self {
        Self {
            rank,
            user_id: row.score.user_id,
            username: row.username.clone(),
            total_score: row.score.total_score,
            current_score: row.score.score,
            games_played: row.score.games_played,
            wins: row.score.wins,
            losses: row.score.losses,
            win_rate: row.score.win_rate(),
            last_played_at: row.score.last_played_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub game_type: GameType,
    pub period: Period,
    pub entries: Vec<LeaderboardEntry>,
    /// Size of the whole candidate set
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub game_type: GameType,
    pub period: Period,
    /// 1-based; `None` when the user has no qualifying row
    pub position: Option<i64>,
    pub total_players: i64,
    pub user_score: Option<i64>,
}

/// Aggregates for one game type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameTypeStats {
    pub game_type: GameType,
    pub total_players: i64,
    pub total_score: i64,
    pub total_games: i64,
    pub total_wins: i64,
    pub total_losses: i64,
    pub average_score: f64,
    pub max_score: i64,
}

/// Totals over the per-game stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsTotals {
    pub total_players: i64,
    pub total_score: i64,
    pub total_games: i64,
    pub total_wins: i64,
    pub total_losses: i64,
    pub average_score: f64,
    pub max_score: i64,
}

impl StatsTotals {
    /// Sum the per-game rows
    ///
    /// Players are summed per game, so a user active in two games counts
    /// twice.
    pub fn from_games(games: &[GameTypeStats]) -> Self {
        let total_players: i64 = games.iter().map(|g| g.total_players).sum();
        let total_score: i64 = games.iter().map(|g| g.total_score).sum();
        let average_score = if total_score > 0 && total_players > 0 {
            crate::score::round2(total_score as f64 / total_players as f64)
        } else {
            0.0
        };

        Self {
            total_players,
            total_score,
            total_games: games.iter().map(|g| g.total_games).sum(),
            total_wins: games.iter().map(|g| g.total_wins).sum(),
            total_losses: games.iter().map(|g| g.total_losses).sum(),
            average_score,
            max_score: games.iter().map(|g| g.max_score).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub period: Period,
    /// `None` means every game type
    pub game_type: Option<GameType>,
    pub totals: StatsTotals,
    pub games: Vec<GameTypeStats>,
}

/// Cross-game totals of one user, before ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTotals {
    pub user_id: UserId,
    pub username: String,
    pub total_score: i64,
    pub total_games: i64,
    pub total_wins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPlayer {
    pub rank: i64,
    pub user_id: UserId,
    pub username: String,
    pub total_score: i64,
    pub total_games: i64,
    pub total_wins: i64,
    pub win_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 28, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_period_floor() {
        assert_eq!(Period::All.floor(now()), None);
        assert_eq!(Period::Week.floor(now()), Some(now() - Duration::days(7)));
        assert_eq!(Period::Month.floor(now()), Some(now() - Duration::days(30)));
    }

    #[test]
    fn test_filter_requires_positive_total_and_window() {
        let filter = CandidateFilter {
            game_type: GameType::Spin,
            since: Period::Week.floor(now()),
        };
        let mut row = Score::new(1, GameType::Spin, now());
        assert!(!filter.admits(&row));

        row.total_score = 10;
        row.last_played_at = Some(now() - Duration::days(8));
        assert!(!filter.admits(&row));

        row.last_played_at = Some(now() - Duration::days(7));
        assert!(filter.admits(&row));

        row.game_type = GameType::Drop;
        assert!(!filter.admits(&row));
    }

    #[test]
    fn test_totals_average() {
        let games = vec![
            GameTypeStats {
                game_type: GameType::Spin,
                total_players: 2,
                total_score: 300,
                total_games: 4,
                total_wins: 1,
                total_losses: 1,
                average_score: 150.0,
                max_score: 200,
            },
            GameTypeStats {
                game_type: GameType::Drop,
                total_players: 1,
                total_score: 100,
                total_games: 1,
                total_wins: 0,
                total_losses: 0,
                average_score: 100.0,
                max_score: 100,
            },
        ];

        let totals = StatsTotals::from_games(&games);
        assert_eq!(totals.total_players, 3);
        assert_eq!(totals.total_score, 400);
        assert_eq!(totals.average_score, 133.33);
        assert_eq!(totals.max_score, 200);

        assert_eq!(StatsTotals::from_games(&[]).average_score, 0.0);
    }
}
