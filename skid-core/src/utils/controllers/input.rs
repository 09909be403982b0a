//! Operator input for the drive.
//!
//! The drive reads throttle from the left stick Y axis and turn from the right
//! stick X axis, with a button on the left stick holding slow mode.

use serde::{Deserialize, Serialize};

/// Source of raw stick axes and the slow-mode button.
///
/// Axis values are in [-1.0, 1.0] with stick forward and stick right positive.
pub trait OperatorInput {
    /// Raw throttle, forward positive.
    fn throttle(&self) -> f64;
    /// Raw turn, right positive.
    fn turn(&self) -> f64;
    /// Whether the drive-slow button is held.
    fn slow_mode(&self) -> bool;
}

/// One sample of the two drive sticks.
///
/// Field names are kept short for the JSON command format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickReading {
    /// Left stick Y as reported by the hardware (stick forward is negative).
    pub ly: f64,
    /// Right stick X.
    pub rx: f64,
    /// Drive-slow button.
    #[serde(default)]
    pub s: bool,
}

impl JoystickReading {
    pub fn new(
        ly: f64,
        rx: f64,
        s: bool,
    ) -> Self {
        Self { ly, rx, s }
    }

    /// Neutral sticks, slow mode released.
    pub const NEUTRAL: Self = Self {
        ly: 0.0,
        rx: 0.0,
        s: false,
    };
}

impl OperatorInput for JoystickReading {
    fn throttle(&self) -> f64 {
        // invert so stick forward is +1.0, without turning 0.0 into -0.0
        if self.ly != 0.0 {
            -self.ly
        } else {
            0.0
        }
    }

    fn turn(&self) -> f64 {
        self.rx
    }

    fn slow_mode(&self) -> bool {
        self.s
    }
}
