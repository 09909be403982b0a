//! Driver-assist mixer for skid-steer (tank-drive) robots on no-std platforms.
//!
//! Joystick throttle and turn axes are shaped, mixed into car-like left/right
//! track speeds and slew-rate limited before reaching the drivetrain.
//!
//! For a runnable host simulation, see the `skid-app/sim-host` crate.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod utils;
