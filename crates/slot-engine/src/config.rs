//! Engine configuration.
//!
//! The operating timezone is set once per engine and applies to every
//! provider. Values come from defaults, then `SLOT_ENGINE_*` environment
//! variables.

use chrono::Duration;
use chrono_tz::Tz;

use crate::error::SlotError;
use crate::temporal::{parse_timezone, DEFAULT_OPERATING_TIMEZONE};

pub const ENV_TIMEZONE: &str = "SLOT_ENGINE_TIMEZONE";
pub const ENV_HOLD_TTL_MINUTES: &str = "SLOT_ENGINE_HOLD_TTL_MINUTES";
pub const ENV_AVAILABILITY_DAYS: &str = "SLOT_ENGINE_AVAILABILITY_DAYS";

pub const DEFAULT_HOLD_TTL_MINUTES: i64 = 15;
pub const DEFAULT_AVAILABILITY_DAYS: u32 = 14;
/// Upper bound on a single availability query.
pub const MAX_AVAILABILITY_DAYS: u32 = 366;
/// Longest a hold may block capacity (7 days).
pub const MAX_HOLD_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub operating_timezone: Tz,
    /// How long a PENDING hold blocks capacity before it lapses.
    pub hold_ttl: Duration,
    /// Default length of an availability query.
    pub availability_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operating_timezone: chrono_tz::America::New_York,
            hold_ttl: Duration::minutes(DEFAULT_HOLD_TTL_MINUTES),
            availability_days: DEFAULT_AVAILABILITY_DAYS,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whichever `SLOT_ENGINE_*` variables are set.
    pub fn from_env() -> Result<Self, SlotError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SlotError> {
        let mut config = Self::default();
        if let Some(tz) = lookup(ENV_TIMEZONE) {
            config.operating_timezone = parse_timezone(tz.trim())?;
        }
        if let Some(ttl) = lookup(ENV_HOLD_TTL_MINUTES) {
            let minutes: i64 = ttl.trim().parse().map_err(|_| {
                SlotError::InvalidConfig(format!("{ENV_HOLD_TTL_MINUTES}: '{ttl}' is not a number"))
            })?;
            config.hold_ttl = hold_ttl_from_minutes(minutes)?;
        }
        if let Some(days) = lookup(ENV_AVAILABILITY_DAYS) {
            config.availability_days = days.trim().parse().map_err(|_| {
                SlotError::InvalidConfig(format!("{ENV_AVAILABILITY_DAYS}: '{days}' is not a number"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SlotError> {
        if self.hold_ttl <= Duration::zero() {
            return Err(SlotError::InvalidConfig(
                "hold TTL must be positive".to_string(),
            ));
        }
        if self.hold_ttl > Duration::minutes(MAX_HOLD_TTL_MINUTES) {
            return Err(SlotError::InvalidConfig(format!(
                "hold TTL must be at most {MAX_HOLD_TTL_MINUTES} minutes, got {}",
                self.hold_ttl.num_minutes()
            )));
        }
        if self.availability_days == 0 || self.availability_days > MAX_AVAILABILITY_DAYS {
            return Err(SlotError::InvalidConfig(format!(
                "availability days must be within 1..={MAX_AVAILABILITY_DAYS}, got {}",
                self.availability_days
            )));
        }
        Ok(())
    }
}

/// A hold TTL of `minutes`, rejecting values chrono cannot represent.
pub fn hold_ttl_from_minutes(minutes: i64) -> Result<Duration, SlotError> {
    Duration::try_minutes(minutes).ok_or_else(|| {
        SlotError::InvalidConfig(format!("hold TTL of {minutes} minutes is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c, EngineConfig::default());
        assert_eq!(c.operating_timezone.name(), DEFAULT_OPERATING_TIMEZONE);
        assert_eq!(c.hold_ttl, Duration::minutes(15));
        assert_eq!(c.availability_days, 14);
    }

    #[test]
    fn test_overrides() {
        let c = EngineConfig::from_lookup(lookup(&[
            (ENV_TIMEZONE, "Europe/Istanbul"),
            (ENV_HOLD_TTL_MINUTES, "30"),
            (ENV_AVAILABILITY_DAYS, " 7 "),
        ]))
        .unwrap();
        assert_eq!(c.operating_timezone, chrono_tz::Europe::Istanbul);
        assert_eq!(c.hold_ttl, Duration::minutes(30));
        assert_eq!(c.availability_days, 7);
    }

    #[test]
    fn test_bad_timezone() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_TIMEZONE, "Mars/Olympus")])).unwrap_err();
        assert!(err.to_string().contains("Invalid timezone"), "got: {err}");
    }

    #[test]
    fn test_bad_numbers() {
        let err =
            EngineConfig::from_lookup(lookup(&[(ENV_HOLD_TTL_MINUTES, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_HOLD_TTL_MINUTES), "got: {err}");
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_HOLD_TTL_MINUTES, "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_AVAILABILITY_DAYS, "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_AVAILABILITY_DAYS, "400")])).is_err());

        let err = EngineConfig::from_lookup(lookup(&[(ENV_HOLD_TTL_MINUTES, "9223372036854775807")]))
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidConfig(_)), "got: {err}");
    }

    #[test]
    fn test_hold_ttl_upper_bound() {
        let week = EngineConfig::from_lookup(lookup(&[(ENV_HOLD_TTL_MINUTES, "10080")])).unwrap();
        assert_eq!(week.hold_ttl, Duration::days(7));
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_HOLD_TTL_MINUTES, "10081")])).is_err());

        let huge = EngineConfig {
            hold_ttl: Duration::days(1_000_000_000),
            ..EngineConfig::default()
        };
        assert!(matches!(huge.validate(), Err(SlotError::InvalidConfig(_))));
    }
}
