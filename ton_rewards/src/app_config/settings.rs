//! Client-facing application settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use super::{
    errors::{ConfigError, ConfigResult},
    service::ConfigService,
};
use crate::clock::Clock;

/// Key of the cached settings view
const SETTINGS_KEY: &str = "app_config";

/// Key of admin overrides; kept without TTL so updates never revert
const OVERRIDES_KEY: &str = "app_config.overrides";

/// Lifetime of the cached settings view
pub const SETTINGS_TTL: Duration = Duration::from_secs(3600);

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Settings served to game clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Seconds between spins
    pub spin_wheel_cooldown: i64,
    pub max_spins_per_day: i64,
    /// Seconds per drop round
    pub drop_game_duration: i64,
    pub hourly_claim_amount: i64,
    pub bonus_claim_amount: i64,
    pub min_payout_amount: i64,
    pub payout_day: String,
    pub show_offerwall: bool,
    pub show_telegram_mini_apps: bool,
    pub show_bonus_claim: bool,
    pub app_version: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            spin_wheel_cooldown: 300,
            max_spins_per_day: 10,
            drop_game_duration: 30,
            hourly_claim_amount: 100,
            bonus_claim_amount: 250,
            min_payout_amount: 100_000,
            payout_day: "Tuesday".to_string(),
            show_offerwall: false,
            show_telegram_mini_apps: true,
            show_bonus_claim: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            last_updated: None,
        }
    }
}

/// Partial admin update; absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_wheel_cooldown: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_spins_per_day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_game_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_claim_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_claim_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_payout_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_offerwall: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_telegram_mini_apps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_bonus_claim: Option<bool>,
}

fn check_range(field: &'static str, value: Option<i64>, min: i64, max: i64) -> ConfigResult<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ConfigError::OutOfRange { field, min, max }),
        _ => Ok(()),
    }
}

impl SettingsPatch {
    /// Range checks of the admin update form
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("spinWheelCooldown", self.spin_wheel_cooldown, 60, 86_400)?;
        check_range("maxSpinsPerDay", self.max_spins_per_day, 1, 100)?;
        check_range("dropGameDuration", self.drop_game_duration, 10, 300)?;
        check_range("hourlyClaimAmount", self.hourly_claim_amount, 1, 10_000)?;
        check_range("bonusClaimAmount", self.bonus_claim_amount, 1, 10_000)?;
        check_range("minPayoutAmount", self.min_payout_amount, 1_000, i64::MAX)?;

        if let Some(day) = &self.payout_day {
            if !WEEKDAYS.contains(&day.as_str()) {
                return Err(ConfigError::InvalidPayoutDay(day.clone()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields of `newer` win over fields of `self`
    pub fn merge(self, newer: SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            spin_wheel_cooldown: newer.spin_wheel_cooldown.or(self.spin_wheel_cooldown),
            max_spins_per_day: newer.max_spins_per_day.or(self.max_spins_per_day),
            drop_game_duration: newer.drop_game_duration.or(self.drop_game_duration),
            hourly_claim_amount: newer.hourly_claim_amount.or(self.hourly_claim_amount),
            bonus_claim_amount: newer.bonus_claim_amount.or(self.bonus_claim_amount),
            min_payout_amount: newer.min_payout_amount.or(self.min_payout_amount),
            payout_day: newer.payout_day.or(self.payout_day),
            show_offerwall: newer.show_offerwall.or(self.show_offerwall),
            show_telegram_mini_apps: newer.show_telegram_mini_apps.or(self.show_telegram_mini_apps),
            show_bonus_claim: newer.show_bonus_claim.or(self.show_bonus_claim),
        }
    }

    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(v) = self.spin_wheel_cooldown {
            settings.spin_wheel_cooldown = v;
        }
        if let Some(v) = self.max_spins_per_day {
            settings.max_spins_per_day = v;
        }
        if let Some(v) = self.drop_game_duration {
            settings.drop_game_duration = v;
        }
        if let Some(v) = self.hourly_claim_amount {
            settings.hourly_claim_amount = v;
        }
        if let Some(v) = self.bonus_claim_amount {
            settings.bonus_claim_amount = v;
        }
        if let Some(v) = self.min_payout_amount {
            settings.min_payout_amount = v;
        }
        if let Some(v) = &self.payout_day {
            settings.payout_day = v.clone();
        }
        if let Some(v) = self.show_offerwall {
            settings.show_offerwall = v;
        }
        if let Some(v) = self.show_telegram_mini_apps {
            settings.show_telegram_mini_apps = v;
        }
        if let Some(v) = self.show_bonus_claim {
            settings.show_bonus_claim = v;
        }
    }
}

/// Reads and updates [`AppSettings`] through a [`ConfigService`]
#[derive(Clone)]
pub struct AppConfigManager {
    service: Arc<dyn ConfigService>,
    clock: Arc<dyn Clock>,
    defaults: AppSettings,
}

impl AppConfigManager {
    pub fn new(service: Arc<dyn ConfigService>, clock: Arc<dyn Clock>) -> Self {
        Self::with_defaults(service, clock, AppSettings::default())
    }

    pub fn with_defaults(
        service: Arc<dyn ConfigService>,
        clock: Arc<dyn Clock>,
        defaults: AppSettings,
    ) -> Self {
        Self {
            service,
            clock,
            defaults,
        }
    }

    fn overrides(&self) -> ConfigResult<SettingsPatch> {
        match self.service.get(OVERRIDES_KEY) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(SettingsPatch::default()),
        }
    }

    fn rebuild(&self, overrides: &SettingsPatch) -> ConfigResult<AppSettings> {
        let mut settings = self.defaults.clone();
        overrides.apply(&mut settings);
        settings.last_updated = Some(self.clock.now());

        self.service
            .set(SETTINGS_KEY, serde_json::to_value(&settings)?, Some(SETTINGS_TTL));
        Ok(settings)
    }

    /// Current settings, served from the cached view when present
    pub fn get_settings(&self) -> ConfigResult<AppSettings> {
        if let Some(value) = self.service.get(SETTINGS_KEY) {
            return Ok(serde_json::from_value(value)?);
        }
        self.rebuild(&self.overrides()?)
    }

    /// Validate and persist a partial update, returning the new settings
    ///
    /// # Errors
    ///
    /// * `ConfigError::OutOfRange` - A numeric field outside its bounds
    /// * `ConfigError::InvalidPayoutDay` - Not a weekday name
    pub fn update_settings(&self, patch: SettingsPatch) -> ConfigResult<AppSettings> {
        patch.validate()?;

        let overrides = self.overrides()?.merge(patch);
        self.service
            .set(OVERRIDES_KEY, serde_json::to_value(&overrides)?, None);

        log::info!("App settings updated: {}", serde_json::to_string(&overrides)?);
        self.rebuild(&overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app_config::InMemoryConfigService, clock::ManualClock};
    use chrono::TimeZone;

    fn manager() -> (AppConfigManager, Arc<InMemoryConfigService>) {
        let service = Arc::new(InMemoryConfigService::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 8, 28, 9, 0, 0).unwrap());
        (
            AppConfigManager::new(service.clone(), Arc::new(clock)),
            service,
        )
    }

    #[test]
    fn test_defaults() {
        let (manager, _) = manager();
        let settings = manager.get_settings().unwrap();

        assert_eq!(settings.spin_wheel_cooldown, 300);
        assert_eq!(settings.max_spins_per_day, 10);
        assert_eq!(settings.min_payout_amount, 100_000);
        assert_eq!(settings.payout_day, "Tuesday");
        assert!(!settings.show_offerwall);
        assert!(settings.last_updated.is_some());
    }

    #[test]
    fn test_update_survives_view_expiry() {
        let (manager, service) = manager();
        let patch = SettingsPatch {
            max_spins_per_day: Some(20),
            payout_day: Some("Friday".to_string()),
            ..SettingsPatch::default()
        };

        let updated = manager.update_settings(patch).unwrap();
        assert_eq!(updated.max_spins_per_day, 20);

        service.remove(SETTINGS_KEY);
        let reloaded = manager.get_settings().unwrap();
        assert_eq!(reloaded.max_spins_per_day, 20);
        assert_eq!(reloaded.payout_day, "Friday");
        assert_eq!(reloaded.spin_wheel_cooldown, 300);
    }

    #[test]
    fn test_updates_accumulate() {
        let (manager, _) = manager();
        manager
            .update_settings(SettingsPatch {
                show_offerwall: Some(true),
                ..SettingsPatch::default()
            })
            .unwrap();
        let settings = manager
            .update_settings(SettingsPatch {
                bonus_claim_amount: Some(500),
                ..SettingsPatch::default()
            })
            .unwrap();

        assert!(settings.show_offerwall);
        assert_eq!(settings.bonus_claim_amount, 500);
    }

    #[test]
    fn test_validation() {
        let bad = [
            SettingsPatch {
                spin_wheel_cooldown: Some(59),
                ..SettingsPatch::default()
            },
            SettingsPatch {
                max_spins_per_day: Some(101),
                ..SettingsPatch::default()
            },
            SettingsPatch {
                drop_game_duration: Some(5),
                ..SettingsPatch::default()
            },
            SettingsPatch {
                min_payout_amount: Some(999),
                ..SettingsPatch::default()
            },
            SettingsPatch {
                payout_day: Some("tuesday".to_string()),
                ..SettingsPatch::default()
            },
        ];
        for patch in bad {
            assert!(patch.validate().is_err(), "{patch:?} should be rejected");
        }

        let (manager, _) = manager();
        let err = manager
            .update_settings(SettingsPatch {
                hourly_claim_amount: Some(0),
                ..SettingsPatch::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "hourlyClaimAmount",
                ..
            }
        ));
        assert_eq!(manager.get_settings().unwrap().hourly_claim_amount, 100);
    }

    #[test]
    fn test_patch_rejects_unknown_keys() {
        let parsed: Result<SettingsPatch, _> =
            serde_json::from_str(r#"{"maxSpinsPerDay": 5, "appVersion": "9.9.9"}"#);
        assert!(parsed.is_err());

        let parsed: SettingsPatch = serde_json::from_str(r#"{"showBonusClaim": false}"#).unwrap();
        assert_eq!(parsed.show_bonus_claim, Some(false));
        assert!(!parsed.is_empty());
    }
}
