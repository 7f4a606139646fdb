//! Pure ranking rules.
//!
//! Candidates are ordered by `total_score` descending. Equal totals are
//! ordered by `user_id` ascending so that pages are stable across calls.
//! A user's position counts only strictly higher totals, so tied users share
//! a position while still appearing in a fixed order in the listing.

use std::cmp::Ordering;

use super::models::{CandidateFilter, ScoreWithUser};
use crate::{UserId, score::Score};

/// Listing order of two candidates
pub fn compare(a: &Score, b: &Score) -> Ordering {
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Filter to the candidate set and sort into listing order
pub fn rank_candidates(
    rows: impl IntoIterator<Item = ScoreWithUser>,
    filter: &CandidateFilter,
) -> Vec<ScoreWithUser> {
    let mut ranked: Vec<ScoreWithUser> = rows
        .into_iter()
        .filter(|row| filter.admits(&row.score))
        .collect();
    ranked.sort_by(|a, b| compare(&a.score, &b.score));
    ranked
}

/// The `[offset, offset + limit)` slice, empty when out of range
pub fn window<T>(items: &[T], limit: i64, offset: i64) -> &[T] {
    let start = usize::try_from(offset).unwrap_or(0).min(items.len());
    let len = usize::try_from(limit).unwrap_or(0);
    let end = start.saturating_add(len).min(items.len());
    &items[start..end]
}

/// 1-based position of `user_id` among `candidates`
///
/// `None` when the user is not a candidate.
pub fn position_of(candidates: &[Score], user_id: UserId) -> Option<i64> {
    let own = candidates.iter().find(|s| s.user_id == user_id)?;
    let higher = candidates
        .iter()
        .filter(|s| s.total_score > own.total_score)
        .count() as i64;
    Some(higher + 1)
}

/// Clamp a requested page size into `1..=max`
pub fn clamp_limit(limit: i64, max: i64) -> i64 {
    limit.clamp(1, max)
}
