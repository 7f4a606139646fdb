//! Time-limited bonuses, claimable once.
//!
//! A bonus goes from unclaimed to claimed exactly once. Expiry is derived
//! from `expires_at` at read time and never stored. Claiming credits the
//! owner's wallet in the same transaction that flips the claim flag.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{BonusError, BonusResult};
pub use manager::BonusManager;
pub use models::{
    Bonus, BonusAudience, BonusBroadcast, BonusClaim, BonusFilter, BonusOrder, BonusType,
    NewBonus,
};
