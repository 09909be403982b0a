//! Drive tuning parameters.
//!
//! `MixConfig` is loaded once at startup and read-only afterwards. Turn scaling
//! reduces the maximum amount of turn as throttle increases, which keeps the
//! robot stable at speed and makes it feel closer to driving a car. Heavy
//! scaling is used while driving slow, light scaling during normal driving.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Control loop period in seconds (50 Hz).
pub const CONTROL_PERIOD_SECS: f64 = 0.02;

/// Full output range a track can swing through, from -1.0 to +1.0.
const FULL_RANGE: f64 = 2.0;

/// Default time for a track to swing across the full output range.
const DEFAULT_FULL_RANGE_SECS: f64 = 1.5;

/// Errors found while validating a `MixConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// A parameter is NaN or infinite.
    NotFinite(&'static str),
    /// A parameter lies outside its accepted range.
    OutOfRange { field: &'static str, value: f64 },
    /// `max_speed_change` must be strictly positive.
    NonPositiveSlewRate(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::NotFinite(field) => write!(f, "{} is not a finite number", field),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{} = {} is out of range", field, value)
            }
            ConfigError::NonPositiveSlewRate(v) => {
                write!(f, "max_speed_change must be > 0, got {}", v)
            }
        }
    }
}

/// Tuning for input shaping, throttle/turn mixing and slew limiting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Turn reduction at full throttle during normal driving.
    pub low_turn_scale: f64,
    /// Turn reduction at full throttle while in slow mode.
    pub high_turn_scale: f64,
    /// Throttle and turn multiplier while in slow mode.
    pub slow_drive_speed_factor: f64,
    /// Dead zone of the throttle stick.
    pub throttle_dead_zone: f64,
    /// Dead zone of the turn stick.
    pub turn_dead_zone: f64,
    /// Curve power applied to throttle.
    pub throttle_filter_power: f64,
    /// Curve power applied to turn.
    pub turn_filter_power: f64,
    /// Largest change of either track speed in one control cycle.
    pub max_speed_change: f64,
    /// Publish shaping and mixing values to the telemetry sink.
    pub debug_turning: bool,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            low_turn_scale: 0.3,
            high_turn_scale: 0.2,
            slow_drive_speed_factor: 0.7,
            throttle_dead_zone: 0.05,
            turn_dead_zone: 0.05,
            throttle_filter_power: 0.4,
            turn_filter_power: 0.4,
            max_speed_change: max_change_per_cycle(DEFAULT_FULL_RANGE_SECS, CONTROL_PERIOD_SECS),
            debug_turning: false,
        }
    }
}

/// Per-cycle change that sweeps the full range in `full_range_secs`.
fn max_change_per_cycle(
    full_range_secs: f64,
    period_secs: f64,
) -> f64 {
    FULL_RANGE * period_secs / full_range_secs
}

impl MixConfig {
    /// Derive `max_speed_change` from the minimum time a track may take to go
    /// from -1.0 to +1.0, with the control loop running every `period_secs`.
    pub fn with_full_range_time(
        mut self,
        full_range_secs: f64,
        period_secs: f64,
    ) -> Self {
        self.max_speed_change = max_change_per_cycle(full_range_secs, period_secs);
        self
    }

    /// Turn scale for the current drive mode.
    pub fn turn_scale(
        &self,
        slow_mode: bool,
    ) -> f64 {
        if slow_mode {
            self.high_turn_scale
        } else {
            self.low_turn_scale
        }
    }

    /// Check the values the mixer and rate limiter rely on.
    ///
    /// Shaping parameters are clamped at use and only need to be finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("low_turn_scale", self.low_turn_scale),
            ("high_turn_scale", self.high_turn_scale),
            ("slow_drive_speed_factor", self.slow_drive_speed_factor),
            ("throttle_dead_zone", self.throttle_dead_zone),
            ("turn_dead_zone", self.turn_dead_zone),
            ("throttle_filter_power", self.throttle_filter_power),
            ("turn_filter_power", self.turn_filter_power),
            ("max_speed_change", self.max_speed_change),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite(field));
            }
        }

        for (field, value) in [
            ("low_turn_scale", self.low_turn_scale),
            ("high_turn_scale", self.high_turn_scale),
            ("slow_drive_speed_factor", self.slow_drive_speed_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        for (field, value) in [
            ("throttle_dead_zone", self.throttle_dead_zone),
            ("turn_dead_zone", self.turn_dead_zone),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        if self.max_speed_change <= 0.0 {
            return Err(ConfigError::NonPositiveSlewRate(self.max_speed_change));
        }

        tracing::debug!(
            max_speed_change = self.max_speed_change,
            "drive config validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(
        a: f64,
        b: f64,
    ) -> bool {
        libm::fabs(a - b) < 1e-12
    }

    #[test]
    fn test_default_matches_tuning() {
        let cfg = MixConfig::default();
        assert_eq!(cfg.low_turn_scale, 0.3);
        assert_eq!(cfg.high_turn_scale, 0.2);
        assert_eq!(cfg.slow_drive_speed_factor, 0.7);
        assert!(close(cfg.max_speed_change, 2.0 * 0.02 / 1.5));
        assert!(!cfg.debug_turning);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_full_range_time() {
        let cfg = MixConfig::default().with_full_range_time(1.0, CONTROL_PERIOD_SECS);
        assert!(close(cfg.max_speed_change, 0.04));
        let cfg = cfg.with_full_range_time(1.5, 0.02);
        assert!(close(cfg.max_speed_change, 0.04 / 1.5));
    }

    #[test]
    fn test_turn_scale_by_mode() {
        let cfg = MixConfig::default();
        assert_eq!(cfg.turn_scale(false), 0.3);
        assert_eq!(cfg.turn_scale(true), 0.2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = MixConfig {
            throttle_filter_power: f64::NAN,
            ..MixConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotFinite("throttle_filter_power"))
        );

        let cfg = MixConfig {
            max_speed_change: 0.0,
            ..MixConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveSlewRate(0.0)));

        let cfg = MixConfig {
            turn_dead_zone: 1.0,
            ..MixConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "turn_dead_zone",
                value: 1.0
            })
        );

        let cfg = MixConfig {
            low_turn_scale: 1.3,
            ..MixConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "low_turn_scale",
                ..
            })
        ));
    }
}
