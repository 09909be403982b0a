//! Module Exports
//!
//! - `drive`: slew-rate limited output stage and drivetrain/telemetry sinks
//! - `input`: operator stick input
//! - `pwm`: PCA9685 drivetrain for two DC track motors
//!
//! `DriveController` ties them into a drive session fed by `DRIVE_CHANNEL`.

pub mod drive;
pub mod input;
pub mod pwm;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Duration, Ticker};
use serde::{Deserialize, Serialize};

pub use drive::{Drivetrain, MotorState, NullTelemetry, RateLimiter, Telemetry};
pub use input::{JoystickReading, OperatorInput};
pub use pwm::{DrivetrainError, MotorChannels, PwmDrivetrain, PWM_ADDRESS};

use crate::utils::{config::MixConfig, math::mixing::DriveCommand};

/// Period of the drive control loop (50 Hz).
pub const CONTROL_PERIOD: Duration = Duration::from_millis(20);

/// Channel used to receive drive commands (`SystemCommand` messages).
pub static DRIVE_CHANNEL: Channel<CriticalSectionRawMutex, SystemCommand, 16> = Channel::new();

/// Drive session commands.
///
/// Serialized as JSON with tag `"dc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "dc", rename_all = "snake_case")] // dc = drive command
pub enum SystemCommand {
    /// Start a drive session.
    Start,
    /// End the session and stop the motors.
    Cancel,
    /// Latest joystick sample.
    J(JoystickReading),
}

/// Lifecycle of a drive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// Runs drive sessions: start, periodic ticks, cancel.
///
/// The session never finishes on its own; it runs until cancelled.
pub struct DriveController<D, T> {
    stage: RateLimiter<D, T>,
    session: SessionState,
    input: JoystickReading,
}

impl<D, T> DriveController<D, T>
where
    D: Drivetrain,
    D::Error: core::fmt::Debug,
    T: Telemetry,
{
    pub fn new(
        cfg: MixConfig,
        drivetrain: D,
        telemetry: T,
    ) -> Self {
        Self {
            stage: RateLimiter::new(cfg, drivetrain, telemetry),
            session: SessionState::Idle,
            input: JoystickReading::NEUTRAL,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn stage(&self) -> &RateLimiter<D, T> {
        &self.stage
    }

    /// Begin a session from rest. Starting a running session is a no-op.
    pub fn start(&mut self) {
        if self.session == SessionState::Running {
            tracing::debug!("drive session already running");
            return;
        }
        tracing::info!("drive session started");
        self.session = SessionState::Running;
    }

    /// End the session and zero the motors.
    ///
    /// The motors are zeroed even when no session is running.
    pub fn cancel(&mut self) -> Result<(), D::Error> {
        if self.session == SessionState::Running {
            tracing::info!("drive session cancelled");
        }
        self.session = SessionState::Idle;
        self.input = JoystickReading::NEUTRAL;
        self.stage.reset()
    }

    /// Store the latest stick sample for the next tick.
    pub fn update_input(
        &mut self,
        reading: JoystickReading,
    ) {
        self.input = reading;
    }

    /// Run one control cycle. Returns `None` while idle.
    pub fn tick(&mut self) -> Result<Option<DriveCommand>, D::Error> {
        if self.session == SessionState::Idle {
            return Ok(None);
        }
        let input = self.input;
        let cmd = self
            .stage
            .tick(input.throttle(), input.turn(), input.slow_mode())?;
        Ok(Some(cmd))
    }

    /// Execute an incoming `SystemCommand`.
    pub fn handle_command(
        &mut self,
        cmd: SystemCommand,
    ) -> Result<(), D::Error> {
        match cmd {
            SystemCommand::Start => self.start(),
            SystemCommand::Cancel => self.cancel()?,
            SystemCommand::J(reading) => self.update_input(reading),
        }
        Ok(())
    }

    /// Handle every command waiting on `DRIVE_CHANNEL`. Returns how many
    /// were taken.
    pub fn drain_commands(&mut self) -> usize {
        let mut taken = 0;
        while let Ok(cmd) = DRIVE_CHANNEL.try_receive() {
            tracing::debug!("Received drive command: {:?}", cmd);
            if let Err(e) = self.handle_command(cmd) {
                tracing::error!("drive command failed: {:?}", e);
            }
            taken += 1;
        }
        taken
    }

    /// Drive loop: drain `DRIVE_CHANNEL`, then tick once per `CONTROL_PERIOD`.
    pub async fn drive_ch(&mut self) -> ! {
        let mut ticker = Ticker::every(CONTROL_PERIOD);
        loop {
            self.drain_commands();

            match self.tick() {
                Ok(Some(cmd)) => tracing::trace!(?cmd, "drive output"),
                Ok(None) => {}
                Err(e) => tracing::error!("drivetrain write failed: {:?}", e),
            }
            ticker.next().await;
        }
    }
}
