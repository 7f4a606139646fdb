//! Bonus data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{BonusId, UserId, wallet::Funds, wallet::Wallet};

/// Maximum title length of a bonus
pub const MAX_TITLE_LEN: usize = 255;

/// Origin of a bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusType {
    Daily,
    Weekly,
    Achievement,
    Admin,
}

impl BonusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusType::Daily => "daily",
            BonusType::Weekly => "weekly",
            BonusType::Achievement => "achievement",
            BonusType::Admin => "admin",
        }
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BonusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(BonusType::Daily),
            "weekly" => Ok(BonusType::Weekly),
            "achievement" => Ok(BonusType::Achievement),
            "admin" => Ok(BonusType::Admin),
            other => Err(format!("unknown bonus type '{other}'")),
        }
    }
}

/// A reward granted to one user, claimable once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub id: BonusId,
    pub user_id: UserId,
    pub bonus_type: BonusType,
    pub title: String,
    pub description: Option<String>,
    pub amount: Funds,
    pub is_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Bonus {
    /// A bonus is expired once its deadline is reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.is_claimed && !self.is_expired(now)
    }
}

/// Admin input for new bonus rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBonus {
    pub bonus_type: BonusType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Funds,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Recipients of a bonus broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusAudience {
    Users(Vec<UserId>),
    AllUsers,
}

/// Outcome of a broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusBroadcast {
    pub created: usize,
    pub bonus_ids: Vec<BonusId>,
}

/// Outcome of a successful claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusClaim {
    pub bonus: Bonus,
    pub wallet: Wallet,
}

/// Result ordering for bonus reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BonusOrder {
    /// `created_at` descending
    #[default]
    Newest,
    /// `claimed_at` descending
    RecentlyClaimed,
}

/// Filter for bonus reads
#[derive(Debug, Clone, Default)]
pub struct BonusFilter {
    pub user_id: Option<UserId>,
    pub bonus_type: Option<BonusType>,
    pub claimed: Option<bool>,
    /// Only unclaimed bonuses not yet expired at this instant
    pub available_at: Option<DateTime<Utc>>,
    pub order: BonusOrder,
}

impl BonusFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Whether a bonus passes every set criterion
    pub fn matches(&self, bonus: &Bonus) -> bool {
        self.user_id.is_none_or(|id| bonus.user_id == id)
            && self.bonus_type.is_none_or(|t| bonus.bonus_type == t)
            && self.claimed.is_none_or(|c| bonus.is_claimed == c)
            && self.available_at.is_none_or(|now| bonus.is_available(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 28, 12, 0, 0).unwrap()
    }

    fn bonus(expires_at: Option<DateTime<Utc>>) -> Bonus {
        Bonus {
            id: 1,
            user_id: 1,
            bonus_type: BonusType::Daily,
            title: "Daily".to_string(),
            description: None,
            amount: Funds::gems(50),
            is_claimed: false,
            claimed_at: None,
            expires_at,
            metadata: serde_json::Value::Null,
            created_at: now() - Duration::days(1),
        }
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        assert!(bonus(Some(now())).is_expired(now()));
        assert!(bonus(Some(now() - Duration::seconds(1))).is_expired(now()));
        assert!(!bonus(Some(now() + Duration::seconds(1))).is_expired(now()));
        assert!(!bonus(None).is_expired(now()));
    }

    #[test]
    fn test_filter_available() {
        let filter = BonusFilter {
            available_at: Some(now()),
            ..BonusFilter::for_user(1)
        };

        assert!(filter.matches(&bonus(None)));
        assert!(!filter.matches(&bonus(Some(now()))));

        let mut claimed = bonus(None);
        claimed.is_claimed = true;
        assert!(!filter.matches(&claimed));

        assert!(!BonusFilter::for_user(2).matches(&bonus(None)));
    }

    #[test]
    fn test_bonus_type_parse() {
        assert_eq!("admin".parse::<BonusType>(), Ok(BonusType::Admin));
        assert!("monthly".parse::<BonusType>().is_err());
    }
}
