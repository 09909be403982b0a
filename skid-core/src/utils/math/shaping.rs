//! Joystick input shaping.
//!
//! Every shaper first applies a dead zone: stick magnitudes below the dead zone
//! read as zero and the remaining travel is rescaled so the dead zone edge maps
//! to 0.0 and full deflection still maps to 1.0. The shapers then bend the
//! response curve and put the original sign back.
//!
//! # Example
//! ```rust
//! use skid_core::utils::math::shaping::shape;
//! // Powers below 1.0 give more sensitivity near center.
//! let throttle = shape(0.5, 0.05, 0.4);
//! assert!(throttle > 0.5);
//! assert_eq!(shape(1.0, 0.05, 0.4), 1.0);
//! ```

use libm;

/// Smallest accepted curve power.
pub const MIN_POWER: f64 = 0.1;
/// Largest accepted curve power.
pub const MAX_POWER: f64 = 5.0;

/// Largest dead zone still leaving usable stick travel.
const MAX_DEAD_ZONE: f64 = 1.0 - f64::EPSILON;

/// Sign of `x` as -1.0, 0.0 or +1.0.
///
/// Negative zero and NaN both map to 0.0.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Sign of `x` with zero counted as positive.
///
/// Only the mixer uses this, to pick a spin direction for a stick sitting
/// exactly on center. Shaping keeps plain [`sign`] semantics.
pub fn direction_sign(x: f64) -> f64 {
    if sign(x) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Split `raw` into its sign and its dead-zone-rescaled magnitude.
fn dead_zone_magnitude(
    raw: f64,
    dead_zone: f64,
) -> (f64, f64) {
    let s = direction_sign(raw);
    // past-full-scale axes read as full deflection, NaN as center
    let mag = if raw.is_nan() {
        0.0
    } else {
        libm::fabs(raw).min(1.0)
    };
    let dead_zone = libm::fabs(dead_zone).min(MAX_DEAD_ZONE);

    if mag < dead_zone || mag == 0.0 {
        (s, 0.0)
    } else {
        (s, mag * ((mag - dead_zone) / (1.0 - dead_zone)))
    }
}

/// Reattach `s` to a shaped magnitude, keeping zero as positive zero.
fn signed(
    s: f64,
    mag: f64,
) -> f64 {
    if mag == 0.0 {
        0.0
    } else {
        s * mag
    }
}

/// Dead zone followed by a power curve.
///
/// `power` is taken by magnitude and clamped to
/// [`MIN_POWER`]..=[`MAX_POWER`]. Powers below 1.0 give a logarithmic curve
/// with more response near center, powers above 1.0 a traditional curve with
/// less.
pub fn shape(
    raw: f64,
    dead_zone: f64,
    power: f64,
) -> f64 {
    let power = libm::fabs(power).clamp(MIN_POWER, MAX_POWER);
    let (s, mag) = dead_zone_magnitude(raw, dead_zone);
    signed(s, libm::pow(mag, power))
}

/// Dead zone followed by a blend of a linear and a powered response.
///
/// `filter_factor` picks the blend (0.0 is linear, 1.0 is fully powered) and is
/// clamped to [0, 1]. `scale` is the exponent of the powered part; negative
/// values are treated as 0. A gamepad feels good around `filter_factor = 0.2`,
/// `scale = 1.5`.
pub fn filter_input(
    raw: f64,
    dead_zone: f64,
    filter_factor: f64,
    scale: f64,
) -> f64 {
    let filter_factor = filter_factor.clamp(0.0, 1.0);
    let scale = scale.max(0.0);
    let (s, mag) = dead_zone_magnitude(raw, dead_zone);
    if mag == 0.0 {
        return 0.0;
    }
    let out = filter_factor * libm::pow(mag, scale) + (1.0 - filter_factor) * mag;
    signed(s, out)
}

/// Dead zone only, no curve.
pub fn apply_dead_zone(
    raw: f64,
    dead_zone: f64,
) -> f64 {
    let (s, mag) = dead_zone_magnitude(raw, dead_zone);
    signed(s, mag)
}
