//! Game session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{SessionId, UserId, wallet::Funds, wallet::Wallet};

/// Supported game types
///
/// Parsing is closed over this set; a new game is added as a new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Spin,
    Drop,
}

impl GameType {
    pub const ALL: [GameType; 2] = [GameType::Spin, GameType::Drop];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Spin => "spin",
            GameType::Drop => "drop",
        }
    }

    /// Capitalized name used in history descriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            GameType::Spin => "Spin",
            GameType::Drop => "Drop",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown game type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game type '{0}'")]
pub struct UnknownGameType(pub String);

impl FromStr for GameType {
    type Err = UnknownGameType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spin" => Ok(GameType::Spin),
            "drop" => Ok(GameType::Drop),
            other => Err(UnknownGameType(other.to_string())),
        }
    }
}

/// Lifecycle state of a game session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// One play of a game by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub game_type: GameType,
    pub status: SessionStatus,
    pub score: i64,
    /// Whole seconds between start and completion
    pub duration: i64,
    pub game_data: serde_json::Value,
    /// Rewards credited at completion; zero until then
    pub earned: Funds,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for opening a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub game_type: GameType,
    pub game_data: serde_json::Value,
}

/// Result of `start_session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStarted {
    pub session_id: SessionId,
    pub game_type: GameType,
    pub started_at: DateTime<Utc>,
}

/// Result of a successful settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettlement {
    pub session_id: SessionId,
    pub game_type: GameType,
    pub score: i64,
    pub rewards: Funds,
    pub wallet: Wallet,
    /// Cumulative total for the (user, game type) pair after this session
    pub total_score: i64,
    pub completed_at: DateTime<Utc>,
}

/// Filter for completed-session reads
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub user_id: UserId,
    pub game_type: Option<GameType>,
    pub completed_since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: i64,
}
