//! Math utilities for the skid-steer drive.
//!
//! `shaping` turns raw stick positions into control values, `mixing` turns
//! throttle and turn into left/right track speeds.

pub mod mixing;
pub mod shaping;
