//! Utility re-exports for the skid-steer drive.
//!
//! - `config`: tuning parameters for shaping, mixing and slew limiting
//! - `controllers`: drive session, rate limiter and PWM drivetrain
//! - `math`: input shaping and the throttle/turn mixer

pub mod config;
pub mod controllers;
pub mod math;

pub use config::{ConfigError, MixConfig};
pub use controllers::DriveController;
pub use embassy_time::*;
pub use math::mixing::{mix, DriveCommand};
