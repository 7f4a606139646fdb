//! Application settings behind an explicit configuration service.
//!
//! Settings are read and written only by the config handlers; reward
//! settlement never consults them.

pub mod errors;
pub mod service;
pub mod settings;

pub use errors::{ConfigError, ConfigResult};
pub use service::{ConfigService, InMemoryConfigService};
pub use settings::{AppConfigManager, AppSettings, SETTINGS_TTL, SettingsPatch};
