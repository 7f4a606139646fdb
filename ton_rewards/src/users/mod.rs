//! Users and their seeded wallets.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{UserError, UserResult};
pub use manager::{DEFAULT_STARTING_FUNDS, UserManager};
pub use models::{NewUser, User};
