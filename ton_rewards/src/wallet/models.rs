//! Wallet data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BonusId, SessionId, UserId, bonus::BonusType, game::GameType, leaderboard::Period};

/// Maximum fractional digits of a token amount
pub const TOKEN_SCALE: u32 = 9;

/// Largest token amount representable by NUMERIC(18,9)
pub const MAX_TOKEN: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, TOKEN_SCALE);

/// Maximum length of an admin credit reason
pub const MAX_REASON_LEN: usize = 255;

/// One of the three wallet currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Ton,
    Gems,
    Diamonds,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Currency::Ton => "ton",
            Currency::Gems => "gems",
            Currency::Diamonds => "diamonds",
        };
        write!(f, "{name}")
    }
}

/// Reasons a [`Funds`] bundle is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FundsError {
    #[error("{0} amount must not be negative")]
    Negative(Currency),

    #[error("ton amount has more than 9 decimal places")]
    TooPrecise,

    #[error("ton amount exceeds the maximum balance")]
    TooLarge,
}

/// Amounts in all three currencies
///
/// Used both as a reward bundle and as a debit request. Missing fields
/// deserialize as zero; unknown fields are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Funds {
    #[serde(alias = "ton")]
    pub token: Decimal,
    pub gems: i64,
    pub diamonds: i64,
}

impl Funds {
    pub const fn zero() -> Self {
        Self {
            token: Decimal::ZERO,
            gems: 0,
            diamonds: 0,
        }
    }

    pub fn token(amount: Decimal) -> Self {
        Self {
            token: amount,
            ..Self::zero()
        }
    }

    pub fn gems(amount: i64) -> Self {
        Self {
            gems: amount,
            ..Self::zero()
        }
    }

    pub fn diamonds(amount: i64) -> Self {
        Self {
            diamonds: amount,
            ..Self::zero()
        }
    }

    pub fn new(token: Decimal, gems: i64, diamonds: i64) -> Self {
        Self {
            token,
            gems,
            diamonds,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.token.is_zero() && self.gems == 0 && self.diamonds == 0
    }

    /// True if at least one amount is strictly positive
    pub fn has_positive(&self) -> bool {
        self.token > Decimal::ZERO || self.gems > 0 || self.diamonds > 0
    }

    /// Check sign, precision and range
    pub fn validate(&self) -> Result<(), FundsError> {
        if self.token.is_sign_negative() && !self.token.is_zero() {
            return Err(FundsError::Negative(Currency::Ton));
        }
        if self.gems < 0 {
            return Err(FundsError::Negative(Currency::Gems));
        }
        if self.diamonds < 0 {
            return Err(FundsError::Negative(Currency::Diamonds));
        }
        if self.token.normalize().scale() > TOKEN_SCALE {
            return Err(FundsError::TooPrecise);
        }
        if self.token > MAX_TOKEN {
            return Err(FundsError::TooLarge);
        }
        Ok(())
    }

    /// Component-wise sum, or `None` on integer overflow
    pub fn checked_add(&self, other: &Funds) -> Option<Funds> {
        Some(Funds {
            token: self.token.checked_add(other.token)?,
            gems: self.gems.checked_add(other.gems)?,
            diamonds: self.diamonds.checked_add(other.diamonds)?,
        })
    }

    /// First currency in which `self` cannot cover `required`
    ///
    /// Returns `(currency, available, required)`.
    pub fn shortfall(&self, required: &Funds) -> Option<(Currency, Decimal, Decimal)> {
        if self.token < required.token {
            return Some((Currency::Ton, self.token, required.token));
        }
        if self.gems < required.gems {
            return Some((
                Currency::Gems,
                Decimal::from(self.gems),
                Decimal::from(required.gems),
            ));
        }
        if self.diamonds < required.diamonds {
            return Some((
                Currency::Diamonds,
                Decimal::from(self.diamonds),
                Decimal::from(required.diamonds),
            ));
        }
        None
    }
}

/// A user's wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Decimal,
    pub gems: i64,
    pub diamonds: i64,
    pub ton_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Balances as a [`Funds`] bundle
    pub fn funds(&self) -> Funds {
        Funds {
            token: self.balance,
            gems: self.gems,
            diamonds: self.diamonds,
        }
    }
}

/// Result of a conditional debit at the store level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied(Wallet),
    Insufficient(Wallet),
    Missing,
}

/// Result of an admin credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredit {
    pub wallet: Wallet,
    /// Id of the claimed `admin` bonus recording the credit
    pub bonus_id: BonusId,
}

/// Source of a wallet history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventKind {
    GameReward,
    Bonus,
}

/// One entry of the wallet transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Session id or bonus id, depending on `kind`
    pub id: i64,
    pub kind: LedgerEventKind,
    pub game_type: Option<GameType>,
    pub bonus_type: Option<BonusType>,
    pub amount: Funds,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn game_reward(
        session_id: SessionId,
        game_type: GameType,
        amount: Funds,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: session_id,
            kind: LedgerEventKind::GameReward,
            game_type: Some(game_type),
            bonus_type: None,
            amount,
            description: format!("{} game reward", game_type.display_name()),
            timestamp,
        }
    }
}

/// Earnings from completed sessions within a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsSummary {
    pub period: Period,
    pub total_earned: Funds,
    pub games_played: i64,
    pub total_score: i64,
    pub average_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_max_token_literal() {
        assert_eq!(MAX_TOKEN, dec("999999999.999999999"));
    }

    #[test]
    fn test_validate_accepts_nine_decimals() {
        assert!(Funds::token(dec("0.000000001")).validate().is_ok());
        // Trailing zeros past the ninth digit are not extra precision
        assert!(Funds::token(dec("1.5000000000")).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_ten_decimals() {
        assert_eq!(
            Funds::token(dec("0.0000000001")).validate(),
            Err(FundsError::TooPrecise)
        );
    }

    #[test]
    fn test_validate_rejects_negative_amounts() {
        assert_eq!(
            Funds::gems(-1).validate(),
            Err(FundsError::Negative(Currency::Gems))
        );
        assert_eq!(
            Funds::token(dec("-0.5")).validate(),
            Err(FundsError::Negative(Currency::Ton))
        );
        assert_eq!(
            Funds::diamonds(-3).validate(),
            Err(FundsError::Negative(Currency::Diamonds))
        );
    }

    #[test]
    fn test_validate_rejects_overflowing_token() {
        assert_eq!(
            Funds::token(dec("1000000000")).validate(),
            Err(FundsError::TooLarge)
        );
    }

    #[test]
    fn test_shortfall_names_first_short_currency() {
        let balance = Funds::new(dec("1"), 5, 0);
        let (currency, available, required) =
            balance.shortfall(&Funds::new(dec("0.5"), 10, 1)).unwrap();

        assert_eq!(currency, Currency::Gems);
        assert_eq!(available, Decimal::from(5));
        assert_eq!(required, Decimal::from(10));
        assert!(balance.shortfall(&Funds::new(dec("1"), 5, 0)).is_none());
    }

    #[test]
    fn test_funds_deserialize_defaults_and_unknown_keys() {
        let funds: Funds = serde_json::from_str(r#"{"gems": 5}"#).unwrap();
        assert_eq!(funds, Funds::gems(5));

        let funds: Funds = serde_json::from_str(r#"{"ton": "0.25"}"#).unwrap();
        assert_eq!(funds.token, dec("0.25"));

        assert!(serde_json::from_str::<Funds>(r#"{"gold": 5}"#).is_err());
    }
}
