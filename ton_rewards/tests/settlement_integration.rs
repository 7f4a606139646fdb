//! Integration tests for game session settlement.
//!
//! Exercises the full start -> complete flow against the in-memory ledger,
//! including retries, abandonment, injected store failures and concurrent
//! completions of the same session.

mod common;

use chrono::Duration;
use common::Ledger;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use ton_rewards::{
    DomainError, ErrorKind,
    db::FailPoint,
    game::{GameType, SessionError, SessionStatus},
    wallet::Funds,
};

#[tokio::test]
async fn test_register_start_complete_scenario() {
    let ledger = Ledger::new();
    let user_id = ledger.register("spinner").await;
    let before = ledger.wallets.get_wallet(user_id).await.unwrap();

    let started = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({"seed": 7}))
        .await
        .unwrap();
    assert_eq!(started.game_type, GameType::Spin);

    ledger.clock.advance(Duration::seconds(42));
    let settled = ledger
        .games
        .complete_session(user_id, started.session_id, 500, Funds::gems(10), Some(true))
        .await
        .unwrap();

    assert_eq!(settled.wallet.gems, before.gems + 10);
    assert_eq!(settled.wallet.diamonds, before.diamonds);
    assert_eq!(settled.wallet.balance, before.balance);
    assert_eq!(settled.total_score, 500);

    let summary = ledger
        .scores
        .score_stats(user_id, Some(GameType::Spin))
        .await
        .unwrap();
    assert_eq!(summary.stats.len(), 1);
    assert_eq!(summary.stats[0].total_score, 500);
    assert_eq!(summary.stats[0].games_played, 1);
    assert_eq!(summary.stats[0].wins, 1);
    assert_eq!(summary.stats[0].win_rate, 100.0);

    let sessions = ledger
        .games
        .recent_sessions(user_id, None, 10)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
    assert_eq!(sessions[0].duration, 42);
    assert_eq!(sessions[0].earned, Funds::gems(10));
    assert_eq!(sessions[0].game_data, json!({"seed": 7}));
}

#[tokio::test]
async fn test_second_completion_is_conflict_without_double_credit() {
    let ledger = Ledger::new();
    let user_id = ledger.register("retrier").await;
    let started = ledger
        .games
        .start_session(user_id, GameType::Drop, json!(null))
        .await
        .unwrap();

    let rewards = Funds::new(Decimal::from_str("0.25").unwrap(), 5, 1);
    let first = ledger
        .games
        .complete_session(user_id, started.session_id, 120, rewards, None)
        .await
        .unwrap();

    let err = ledger
        .games
        .complete_session(user_id, started.session_id, 120, rewards, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadyFinished { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let wallet = ledger.wallets.get_wallet(user_id).await.unwrap();
    assert_eq!(wallet, first.wallet);

    let summary = ledger.scores.score_stats(user_id, None).await.unwrap();
    assert_eq!(summary.total_score, 120);
    assert_eq!(summary.total_games, 1);
}

#[tokio::test]
async fn test_abandoned_session_is_terminal() {
    let ledger = Ledger::new();
    let user_id = ledger.register("quitter").await;
    let started = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap();

    let abandoned = ledger
        .games
        .abandon_session(user_id, started.session_id)
        .await
        .unwrap();
    assert_eq!(abandoned.status, SessionStatus::Abandoned);
    assert!(abandoned.earned.is_zero());

    let err = ledger
        .games
        .complete_session(user_id, started.session_id, 10, Funds::gems(3), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = ledger
        .games
        .abandon_session(user_id, started.session_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Abandoned sessions never reach the score ledger
    let summary = ledger.scores.score_stats(user_id, None).await.unwrap();
    assert!(summary.stats.is_empty());
}

#[tokio::test]
async fn test_foreign_session_reported_missing() {
    let ledger = Ledger::new();
    let owner = ledger.register("owner").await;
    let intruder = ledger.register("intruder").await;
    let started = ledger
        .games
        .start_session(owner, GameType::Spin, json!({}))
        .await
        .unwrap();

    let err = ledger
        .games
        .complete_session(intruder, started.session_id, 999, Funds::gems(50), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SessionNotFound(_)));
    assert_eq!(err.client_message(), "Game session not found");

    let wallet = ledger.wallets.get_wallet(intruder).await.unwrap();
    assert_eq!(wallet.gems, 100);
}

#[tokio::test]
async fn test_validation_happens_before_any_write() {
    let ledger = Ledger::new();
    let user_id = ledger.register("validator").await;
    let started = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap();

    let err = ledger
        .games
        .complete_session(user_id, started.session_id, -1, Funds::zero(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidScore(-1)));

    let err = ledger
        .games
        .complete_session(user_id, started.session_id, 10, Funds::gems(-5), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let too_precise = Funds::token(Decimal::from_str("0.0000000001").unwrap());
    let err = ledger
        .games
        .complete_session(user_id, started.session_id, 10, too_precise, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Session is still open after rejected attempts
    ledger
        .games
        .complete_session(user_id, started.session_id, 10, Funds::gems(1), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_inactive_user_cannot_start() {
    let ledger = Ledger::new();
    let user_id = ledger.register("sleeper").await;
    ledger.users.set_active(user_id, false).await.unwrap();

    let err = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    ledger.users.set_active(user_id, true).await.unwrap();
    ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_step_rolls_back_whole_settlement() {
    for point in [
        FailPoint::CreditWallet,
        FailPoint::EnsureScore,
        FailPoint::SaveScore,
        FailPoint::FinishSession,
        FailPoint::Commit,
    ] {
        let ledger = Ledger::new();
        let user_id = ledger.register("unlucky").await;
        let started = ledger
            .games
            .start_session(user_id, GameType::Drop, json!({}))
            .await
            .unwrap();

        ledger.store.fail_once(point);
        let err = ledger
            .games
            .complete_session(user_id, started.session_id, 300, Funds::diamonds(4), Some(false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal, "{point:?}");
        assert_eq!(err.client_message(), "Internal server error");

        let wallet = ledger.wallets.get_wallet(user_id).await.unwrap();
        assert_eq!(wallet.diamonds, 10, "{point:?} leaked a credit");
        let summary = ledger.scores.score_stats(user_id, None).await.unwrap();
        assert!(summary.stats.is_empty(), "{point:?} leaked a score row");

        // The retry settles normally
        let settled = ledger
            .games
            .complete_session(user_id, started.session_id, 300, Funds::diamonds(4), Some(false))
            .await
            .unwrap();
        assert_eq!(settled.wallet.diamonds, 14);
        assert_eq!(settled.total_score, 300);
    }
}

#[tokio::test]
async fn test_concurrent_completions_settle_once() {
    let ledger = Ledger::new();
    let user_id = ledger.register("racer").await;
    let started = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let games = ledger.games.clone();
            let session_id = started.session_id;
            tokio::spawn(async move {
                games
                    .complete_session(user_id, session_id, 75, Funds::gems(20), Some(true))
                    .await
            })
        })
        .collect();

    let mut settled = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => settled += 1,
            Err(e) if e.kind() == ErrorKind::Conflict => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(settled, 1);
    assert_eq!(conflicts, 7);

    let wallet = ledger.wallets.get_wallet(user_id).await.unwrap();
    assert_eq!(wallet.gems, 120);
    let summary = ledger.scores.score_stats(user_id, None).await.unwrap();
    assert_eq!(summary.total_score, 75);
    assert_eq!(summary.total_games, 1);
}

#[tokio::test]
async fn test_scores_accumulate_per_game_type() {
    let ledger = Ledger::new();
    let user_id = ledger.register("allrounder").await;

    for (game_type, score, is_win) in [
        (GameType::Spin, 100, Some(true)),
        (GameType::Spin, 50, Some(false)),
        (GameType::Drop, 30, None),
    ] {
        let started = ledger
            .games
            .start_session(user_id, game_type, json!({}))
            .await
            .unwrap();
        ledger.clock.advance(Duration::minutes(1));
        ledger
            .games
            .complete_session(user_id, started.session_id, score, Funds::zero(), is_win)
            .await
            .unwrap();
    }

    let summary = ledger.scores.score_stats(user_id, None).await.unwrap();
    assert_eq!(summary.total_score, 180);
    assert_eq!(summary.total_games, 3);

    let spin = &ledger
        .scores
        .score_stats(user_id, Some(GameType::Spin))
        .await
        .unwrap()
        .stats[0];
    assert_eq!(spin.current_score, 50);
    assert_eq!(spin.total_score, 150);
    assert_eq!((spin.wins, spin.losses), (1, 1));
    assert_eq!(spin.win_rate, 50.0);

    let drops = ledger
        .games
        .recent_sessions(user_id, Some(GameType::Drop), 10)
        .await
        .unwrap();
    assert_eq!(drops.len(), 1);
}

#[tokio::test]
async fn test_achievements_require_score_row() {
    let ledger = Ledger::new();
    let user_id = ledger.register("collector").await;

    let err = ledger
        .scores
        .add_achievement(user_id, GameType::Spin, "first_spin")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let started = ledger
        .games
        .start_session(user_id, GameType::Spin, json!({}))
        .await
        .unwrap();
    ledger
        .games
        .complete_session(user_id, started.session_id, 1, Funds::zero(), None)
        .await
        .unwrap();

    ledger
        .scores
        .add_achievement(user_id, GameType::Spin, "first_spin")
        .await
        .unwrap();
    let row = ledger
        .scores
        .add_achievement(user_id, GameType::Spin, "first_spin")
        .await
        .unwrap();
    assert_eq!(row.achievements, vec!["first_spin".to_string()]);

    let err = ledger
        .scores
        .add_achievement(user_id, GameType::Spin, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
