//! PCA9685-backed drivetrain.
//!
//! Each track motor uses two PWM channels on the PCA9685: a phase channel
//! (fully on for reverse, off for forward) and an enable channel carrying the
//! duty cycle.

use embedded_hal::i2c::I2c;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::drive::Drivetrain;

/// Default I2C address of the motor PWM driver.
pub const PWM_ADDRESS: u8 = 0x55;

/// Prescale giving roughly 60 Hz PWM.
const PWM_PRESCALE: u8 = 100;

const MAX_DUTY: u16 = 4095;

/// Errors raised by the PWM drivetrain.
#[derive(Debug)]
pub enum DrivetrainError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
}

/// Phase/enable channel pair and mounting direction of one motor.
#[derive(Debug, Clone, Copy)]
pub struct MotorChannels {
    pub phase: Channel,
    pub enable: Channel,
    pub inverted: bool,
}

impl MotorChannels {
    pub const fn new(
        phase: Channel,
        enable: Channel,
    ) -> Self {
        Self {
            phase,
            enable,
            inverted: false,
        }
    }

    pub const fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }
}

/// Left/right motor pair driven through a PCA9685.
pub struct PwmDrivetrain<I2C> {
    pwm: Pca9685<I2C>,
    left: MotorChannels,
    right: MotorChannels,
    /// When set every command is replaced by zero power.
    pub debug: bool,
}

impl<I2C, E> PwmDrivetrain<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Wrap a PCA9685 with the default channel layout: left on C0/C1, right on
    /// C2/C3.
    pub fn new(pwm: Pca9685<I2C>) -> Self {
        Self::with_channels(
            pwm,
            MotorChannels::new(Channel::C0, Channel::C1),
            MotorChannels::new(Channel::C2, Channel::C3),
        )
    }

    pub fn with_channels(
        pwm: Pca9685<I2C>,
        left: MotorChannels,
        right: MotorChannels,
    ) -> Self {
        Self {
            pwm,
            left,
            right,
            debug: false,
        }
    }

    /// Create the PCA9685 at [`PWM_ADDRESS`] on `i2c`.
    pub fn from_bus(i2c: I2C) -> Result<Self, DrivetrainError<E>> {
        let pwm = Pca9685::new(i2c, PwmAddress::from(PWM_ADDRESS))
            .map_err(DrivetrainError::PwmError)?;
        Ok(Self::new(pwm))
    }

    /// Enable the PWM driver and set its prescale.
    pub fn configure(&mut self) -> Result<(), DrivetrainError<E>> {
        self.pwm.enable().map_err(DrivetrainError::PwmError)?;
        tracing::info!("PWM enabled");
        self.pwm
            .set_prescale(PWM_PRESCALE)
            .map_err(DrivetrainError::PwmError)?;
        tracing::info!("PWM prescale set to 60Hz");
        Ok(())
    }

    /// Release the underlying I2C bus.
    pub fn destroy(self) -> I2C {
        self.pwm.destroy()
    }

    fn apply(
        &mut self,
        motor: MotorChannels,
        speed: f64,
    ) -> Result<(), DrivetrainError<E>> {
        let speed = if motor.inverted { -speed } else { speed };
        let duty = libm::fabs(speed).min(1.0);
        let forward = speed >= 0.0;

        self.pwm
            .set_channel_on_off(motor.phase, 0, if forward { 0 } else { MAX_DUTY })
            .map_err(DrivetrainError::PwmError)?;
        self.pwm
            .set_channel_on_off(motor.enable, 0, (duty * MAX_DUTY as f64) as u16)
            .map_err(DrivetrainError::PwmError)?;
        Ok(())
    }
}

impl<I2C, E> Drivetrain for PwmDrivetrain<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = DrivetrainError<E>;

    fn drive_raw(
        &mut self,
        left: f64,
        right: f64,
    ) -> Result<(), Self::Error> {
        let (left, right) = if self.debug { (0.0, 0.0) } else { (left, right) };
        let (l, r) = (self.left, self.right);
        self.apply(l, left)?;
        self.apply(r, right)
    }
}
