//! Throttle/turn mixing for skid-steer drivetrains.
//!
//! Throttle sets the base forward or backward speed and turn reduces the speed
//! of the slower (inner) track. The reduction itself shrinks as throttle grows:
//!
//! ```text
//! range     = 1 - turn_scale * |throttle|
//! slow_side = |throttle| - |turn| * range
//! ```
//!
//! With `turn_scale = 0.3`, full throttle and full turn give a fast side of
//! +1.0 and a slow side of +0.3, a reasonably tight arc.
//!
//! Direction of rotation follows the sign product of throttle and turn:
//!
//! | throttle | turn  | rotation          | fast side |
//! |----------|-------|-------------------|-----------|
//! | forward  | right | clockwise         | left      |
//! | forward  | left  | counter-clockwise | right     |
//! | back     | right | counter-clockwise | right     |
//! | back     | left  | clockwise         | left      |

use libm;

use super::shaping::direction_sign;
use crate::utils::config::MixConfig;

/// Left/right track speeds, each in [-1.0, 1.0].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub left: f64,
    pub right: f64,
}

impl DriveCommand {
    /// Both tracks stopped.
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(
        left: f64,
        right: f64,
    ) -> Self {
        Self { left, right }
    }

    /// Clamp both tracks into [-1.0, 1.0].
    pub fn clamped(self) -> Self {
        Self {
            left: self.left.clamp(-1.0, 1.0),
            right: self.right.clamp(-1.0, 1.0),
        }
    }
}

/// Mix shaped throttle and turn into target track speeds.
///
/// A zero turn drives both tracks at exactly `throttle`. A zero throttle with
/// any turn spins in place with equal and opposite track speeds.
pub fn mix(
    throttle: f64,
    turn: f64,
    slow_mode: bool,
    cfg: &MixConfig,
) -> DriveCommand {
    if turn == 0.0 {
        return DriveCommand::new(throttle, throttle).clamped();
    }

    let throttle_sign = direction_sign(throttle);
    let spin_sign = throttle_sign * direction_sign(turn);

    let throttle_mag = libm::fabs(throttle);
    let turn_mag = libm::fabs(turn);

    let range = 1.0 - cfg.turn_scale(slow_mode) * throttle_mag;
    let slow_side = (throttle_mag - turn_mag * range) * throttle_sign;
    let mut fast_side = throttle;

    if libm::fabs(fast_side) < libm::fabs(slow_side) {
        if throttle_mag == 0.0 {
            // no throttle: pure spin
            fast_side = -slow_side;
        } else {
            // Low throttle with more turn would otherwise drive the fast side
            // against the throttle direction. Tends to spin more at slow
            // throttle.
            fast_side = if fast_side > 0.0 {
                libm::fabs(slow_side)
            } else {
                -libm::fabs(slow_side)
            };
        }
    }

    let cmd = if spin_sign > 0.0 {
        DriveCommand::new(fast_side, slow_side)
    } else {
        DriveCommand::new(slow_side, fast_side)
    };
    tracing::trace!(?cmd, throttle, turn, slow_mode, "mixed track speeds");
    cmd.clamped()
}
