//! Session lifecycle transitions.
//!
//! ```text
//! in_progress ──complete──▶ completed
//!      │
//!      └────────abandon───▶ abandoned
//! ```
//!
//! Both target states are terminal. The transitions are pure; persisting
//! them is the manager's job.

use chrono::{DateTime, Utc};

use super::{
    errors::{SessionError, SessionResult},
    models::{GameSession, SessionStatus},
};
use crate::wallet::Funds;

impl GameSession {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_in_progress(&self) -> SessionResult<()> {
        if self.is_terminal() {
            return Err(SessionError::AlreadyFinished {
                session_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Record a finished play
    ///
    /// Duration is measured in whole seconds from `started_at` and never
    /// goes negative, even if the clock moved backwards.
    ///
    /// # Errors
    ///
    /// `AlreadyFinished` if the session is completed or abandoned.
    pub fn complete(&mut self, score: i64, rewards: &Funds, now: DateTime<Utc>) -> SessionResult<()> {
        self.ensure_in_progress()?;

        self.score = score;
        self.earned = *rewards;
        self.duration = (now - self.started_at).num_seconds().max(0);
        self.status = SessionStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Give up on the session without rewards
    pub fn abandon(&mut self, now: DateTime<Utc>) -> SessionResult<()> {
        self.ensure_in_progress()?;

        self.status = SessionStatus::Abandoned;
        self.completed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameType;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn session(started_at: DateTime<Utc>) -> GameSession {
        GameSession {
            id: 7,
            user_id: 1,
            game_type: GameType::Spin,
            status: SessionStatus::InProgress,
            score: 0,
            duration: 0,
            game_data: serde_json::json!({}),
            earned: Funds::zero(),
            started_at,
            completed_at: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 28, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_complete_sets_rewards_and_duration() {
        let mut s = session(t0());
        let rewards = Funds::new(Decimal::new(5, 3), 10, 1);

        s.complete(150, &rewards, t0() + Duration::seconds(42)).unwrap();

        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.score, 150);
        assert_eq!(s.earned, rewards);
        assert_eq!(s.duration, 42);
        assert_eq!(s.completed_at, Some(t0() + Duration::seconds(42)));
    }

    #[test]
    fn test_duration_clamped_when_clock_skews_backwards() {
        let mut s = session(t0());
        s.complete(1, &Funds::zero(), t0() - Duration::seconds(5)).unwrap();
        assert_eq!(s.duration, 0);
    }

    #[test]
    fn test_terminal_session_rejects_transitions() {
        let mut s = session(t0());
        s.complete(10, &Funds::gems(1), t0()).unwrap();

        let err = s.complete(20, &Funds::gems(100), t0()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AlreadyFinished {
                status: SessionStatus::Completed,
                ..
            }
        ));
        assert!(s.abandon(t0()).is_err());
        // First completion is untouched
        assert_eq!(s.score, 10);
        assert_eq!(s.earned, Funds::gems(1));
    }

    #[test]
    fn test_abandon_keeps_rewards_zero() {
        let mut s = session(t0());
        s.abandon(t0() + Duration::seconds(3)).unwrap();

        assert_eq!(s.status, SessionStatus::Abandoned);
        assert!(s.earned.is_zero());
        assert!(s.complete(5, &Funds::gems(5), t0()).is_err());
    }
}
