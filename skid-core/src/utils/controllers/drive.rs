//! Slew-rate limited output stage for the tank drive.
//!
//! Each control cycle the stage shapes the raw stick axes, mixes them into
//! target track speeds and moves the last commanded speeds toward the targets
//! by at most `max_speed_change`. Switching from spinning one way to the other,
//! or from full forward to full reverse, therefore never happens instantly.

use crate::utils::{
    config::MixConfig,
    math::{
        mixing::{mix, DriveCommand},
        shaping::shape,
    },
};

/// Sink for left/right motor power.
pub trait Drivetrain {
    type Error;

    /// Command motor power directly, each side in [-1.0, 1.0].
    fn drive_raw(
        &mut self,
        left: f64,
        right: f64,
    ) -> Result<(), Self::Error>;

    /// Stop both motors.
    fn stop(&mut self) -> Result<(), Self::Error> {
        self.drive_raw(0.0, 0.0)
    }
}

/// Key/value sink for debug values. Never feeds back into control.
pub trait Telemetry {
    fn put_number(
        &mut self,
        key: &'static str,
        value: f64,
    );
}

/// Telemetry sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn put_number(
        &mut self,
        _key: &'static str,
        _value: f64,
    ) {
    }
}

/// Last commanded track speeds.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotorState {
    pub last_left: f64,
    pub last_right: f64,
}

impl MotorState {
    /// Move toward `target` by at most `max_change` per side and store the
    /// result.
    ///
    /// `max_change` is taken by magnitude; NaN holds the current speeds.
    pub fn step(
        &mut self,
        target: DriveCommand,
        max_change: f64,
    ) -> DriveCommand {
        let max_change = if max_change.is_nan() {
            0.0
        } else {
            libm::fabs(max_change)
        };
        let left_diff = (self.last_left - target.left).clamp(-max_change, max_change);
        let right_diff = (self.last_right - target.right).clamp(-max_change, max_change);

        self.last_left -= left_diff;
        self.last_right -= right_diff;
        self.command()
    }

    /// The stored speeds as a command.
    pub fn command(&self) -> DriveCommand {
        DriveCommand::new(self.last_left, self.last_right)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Stateful output stage, one per drive session.
pub struct RateLimiter<D, T> {
    cfg: MixConfig,
    state: MotorState,
    drivetrain: D,
    telemetry: T,
}

impl<D, T> RateLimiter<D, T>
where
    D: Drivetrain,
    T: Telemetry,
{
    /// Create a stage at rest. `cfg` is expected to have passed
    /// [`MixConfig::validate`].
    pub fn new(
        cfg: MixConfig,
        drivetrain: D,
        telemetry: T,
    ) -> Self {
        Self {
            cfg,
            state: MotorState::default(),
            drivetrain,
            telemetry,
        }
    }

    pub fn config(&self) -> &MixConfig {
        &self.cfg
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    pub fn drivetrain_mut(&mut self) -> &mut D {
        &mut self.drivetrain
    }

    fn publish(
        &mut self,
        key: &'static str,
        value: f64,
    ) {
        if self.cfg.debug_turning {
            self.telemetry.put_number(key, value);
        }
    }

    /// Run one control cycle and send the limited output to the drivetrain.
    pub fn tick(
        &mut self,
        raw_throttle: f64,
        raw_turn: f64,
        slow_mode: bool,
    ) -> Result<DriveCommand, D::Error> {
        let cfg = self.cfg;
        let mut throttle = shape(
            raw_throttle,
            cfg.throttle_dead_zone,
            cfg.throttle_filter_power,
        );
        let mut turn = shape(raw_turn, cfg.turn_dead_zone, cfg.turn_filter_power);
        self.publish("Throttle", throttle);
        self.publish("Turn", turn);

        if slow_mode {
            throttle *= cfg.slow_drive_speed_factor;
            turn *= cfg.slow_drive_speed_factor;
        }

        let target = mix(throttle, turn, slow_mode, &cfg);
        self.publish("targetLeftSpeed", target.left);
        self.publish("targetRightSpeed", target.right);

        // only commit the step once the drivetrain has taken it
        let mut next = self.state;
        let adjusted = next.step(target, cfg.max_speed_change);
        self.publish("AdjustedLeft", adjusted.left);
        self.publish("AdjustedRight", adjusted.right);

        self.drivetrain.drive_raw(adjusted.left, adjusted.right)?;
        self.state = next;
        Ok(adjusted)
    }

    /// Zero the stored speeds and stop the motors.
    pub fn reset(&mut self) -> Result<(), D::Error> {
        self.state.clear();
        self.drivetrain.stop()
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<(f64, f64)>,
    }

    impl Drivetrain for Recorder {
        type Error = core::convert::Infallible;

        fn drive_raw(
            &mut self,
            left: f64,
            right: f64,
        ) -> Result<(), Self::Error> {
            self.sent.push((left, right));
            Ok(())
        }
    }

    /// Drivetrain whose writes fail while `fail_next` is set.
    #[derive(Default)]
    struct Flaky {
        sent: Vec<(f64, f64)>,
        fail_next: bool,
    }

    impl Drivetrain for Flaky {
        type Error = ();

        fn drive_raw(
            &mut self,
            left: f64,
            right: f64,
        ) -> Result<(), Self::Error> {
            if core::mem::take(&mut self.fail_next) {
                return Err(());
            }
            self.sent.push((left, right));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Keys(Vec<&'static str>);

    impl Telemetry for Keys {
        fn put_number(
            &mut self,
            key: &'static str,
            _value: f64,
        ) {
            self.0.push(key);
        }
    }

    fn close(
        a: f64,
        b: f64,
    ) -> bool {
        libm::fabs(a - b) < 1e-9
    }

    fn cfg(max_speed_change: f64) -> MixConfig {
        MixConfig {
            max_speed_change,
            ..MixConfig::default()
        }
    }

    #[test]
    fn test_step_moves_by_max_change() {
        let mut state = MotorState {
            last_left: 1.0,
            last_right: 1.0,
        };
        let out = state.step(DriveCommand::new(-1.0, -1.0), 0.04);
        assert!(close(out.left, 0.96));
        assert!(close(out.right, 0.96));
        assert_eq!(state.command(), out);
    }

    #[test]
    fn test_step_reaches_close_target() {
        let mut state = MotorState::default();
        let out = state.step(DriveCommand::new(0.01, -0.02), 0.04);
        assert!(close(out.left, 0.01));
        assert!(close(out.right, -0.02));
    }

    #[test]
    fn test_step_bound_and_convergence() {
        let max = 0.04;
        let mut state = MotorState {
            last_left: -1.0,
            last_right: 1.0,
        };
        let target = DriveCommand::new(1.0, -1.0);
        let ticks = libm::ceil(2.0 / max) as usize;
        for _ in 0..ticks {
            let before = state;
            let out = state.step(target, max);
            assert!(libm::fabs(out.left - before.last_left) <= max + 1e-12);
            assert!(libm::fabs(out.right - before.last_right) <= max + 1e-12);
        }
        assert!(close(state.last_left, 1.0));
        assert!(close(state.last_right, -1.0));
    }

    #[test]
    fn test_tick_limits_full_stick_jump() {
        let mut stage = RateLimiter::new(cfg(0.04), Recorder::default(), NullTelemetry);
        let out = stage.tick(1.0, 0.0, false).unwrap();
        assert!(close(out.left, 0.04));
        assert!(close(out.right, 0.04));
        assert_eq!(stage.drivetrain().sent.len(), 1);

        for _ in 0..30 {
            stage.tick(1.0, 0.0, false).unwrap();
        }
        // flip to full reverse: one tick only moves one step back
        let before = stage.state();
        let out = stage.tick(-1.0, 0.0, false).unwrap();
        assert!(close(before.last_left - out.left, 0.04));
        assert!(close(before.last_right - out.right, 0.04));
    }

    #[test]
    fn test_step_tolerates_bad_max_change() {
        let mut state = MotorState::default();
        let out = state.step(DriveCommand::new(1.0, -1.0), -0.04);
        assert!(close(out.left, 0.04));
        assert!(close(out.right, -0.04));

        let out = state.step(DriveCommand::new(1.0, -1.0), f64::NAN);
        assert!(close(out.left, 0.04));
        assert!(close(out.right, -0.04));
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let mut stage = RateLimiter::new(cfg(0.04), Flaky::default(), NullTelemetry);
        stage.tick(1.0, 0.0, false).unwrap();

        stage.drivetrain_mut().fail_next = true;
        assert!(stage.tick(1.0, 0.0, false).is_err());
        assert!(close(stage.state().last_left, 0.04));

        stage.tick(1.0, 0.0, false).unwrap();
        let sent = &stage.drivetrain().sent;
        assert_eq!(sent.len(), 2);
        assert!(libm::fabs(sent[1].0 - sent[0].0) <= 0.04 + 1e-12);
        assert!(libm::fabs(sent[1].1 - sent[0].1) <= 0.04 + 1e-12);
    }

    #[test]
    fn test_tick_applies_slow_mode() {
        let mut stage = RateLimiter::new(cfg(2.0), Recorder::default(), NullTelemetry);
        let out = stage.tick(1.0, 0.0, true).unwrap();
        assert!(close(out.left, 0.7));
        assert!(close(out.right, 0.7));

        // slow mode spin uses the scaled turn
        let out = stage.tick(0.0, 1.0, true).unwrap();
        assert!(close(out.left, 0.7));
        assert!(close(out.right, -0.7));
    }

    #[test]
    fn test_tick_dead_zone_holds_still() {
        let mut stage = RateLimiter::new(cfg(0.04), Recorder::default(), NullTelemetry);
        let out = stage.tick(0.03, -0.04, false).unwrap();
        assert_eq!(out, DriveCommand::STOP);
    }

    #[test]
    fn test_reset_zeroes_state_and_motors() {
        let mut stage = RateLimiter::new(cfg(0.5), Recorder::default(), NullTelemetry);
        stage.tick(1.0, 0.5, false).unwrap();
        stage.tick(1.0, 0.5, false).unwrap();
        assert_ne!(stage.state(), MotorState::default());

        stage.reset().unwrap();
        assert_eq!(stage.state(), MotorState::default());
        assert_eq!(stage.drivetrain().sent.last(), Some(&(0.0, 0.0)));

        // restart ramps from zero again
        let out = stage.tick(1.0, 0.0, false).unwrap();
        assert!(close(out.left, 0.5));
    }

    #[test]
    fn test_telemetry_only_when_debugging() {
        let mut stage = RateLimiter::new(cfg(0.04), Recorder::default(), Keys::default());
        stage.tick(0.5, 0.5, false).unwrap();
        assert!(stage.telemetry.0.is_empty());

        let debug = MixConfig {
            debug_turning: true,
            ..cfg(0.04)
        };
        let mut stage = RateLimiter::new(debug, Recorder::default(), Keys::default());
        stage.tick(0.5, 0.5, false).unwrap();
        assert_eq!(
            stage.telemetry.0,
            [
                "Throttle",
                "Turn",
                "targetLeftSpeed",
                "targetRightSpeed",
                "AdjustedLeft",
                "AdjustedRight"
            ]
        );
    }
}
