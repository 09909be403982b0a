use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Timer};
use serde::Deserialize;
use skid_core::utils::controllers::{
    DRIVE_CHANNEL, DriveController, Drivetrain, JoystickReading, SystemCommand, Telemetry,
};
use skid_core::utils::MixConfig;
use skid_core::utils::config::CONTROL_PERIOD_SECS;
use static_cell::StaticCell;
use std::convert::Infallible;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON file with drive tuning (missing fields keep their defaults)
    #[clap(long)]
    config: Option<PathBuf>,
    /// JSON scenario: array of drive commands with a hold time in ms
    #[clap(long)]
    scenario: Option<PathBuf>,
    /// minimum seconds for a track to swing from full reverse to full forward
    #[clap(long)]
    full_range_secs: Option<f64>,
    /// publish shaping and mixing values
    #[clap(long)]
    debug_turning: bool,
}

/// One scenario step: a drive command held for `hold_ms` before the next.
#[derive(Debug, Deserialize)]
struct ScenarioStep {
    #[serde(flatten)]
    command: SystemCommand,
    #[serde(default)]
    hold_ms: u64,
}

/// Drivetrain that logs motor power to the console.
struct LogDrivetrain;

impl Drivetrain for LogDrivetrain {
    type Error = Infallible;

    fn drive_raw(
        &mut self,
        left: f64,
        right: f64,
    ) -> Result<(), Self::Error> {
        info!("drive_raw left={:+.3} right={:+.3}", left, right);
        Ok(())
    }
}

/// Telemetry that logs at debug level.
struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn put_number(
        &mut self,
        key: &'static str,
        value: f64,
    ) {
        debug!(key, value, "telemetry");
    }
}

fn step(
    command: SystemCommand,
    hold_ms: u64,
) -> ScenarioStep {
    ScenarioStep { command, hold_ms }
}

fn stick(
    ly: f64,
    rx: f64,
    s: bool,
) -> SystemCommand {
    SystemCommand::J(JoystickReading::new(ly, rx, s))
}

/// Start, full forward, hard reverse, spin in place, slow arc, cancel.
fn default_scenario() -> Vec<ScenarioStep> {
    vec![
        step(SystemCommand::Start, 0),
        step(stick(-1.0, 0.0, false), 1000),
        step(stick(1.0, 0.0, false), 1500),
        step(stick(0.0, 1.0, false), 800),
        step(stick(-0.6, -0.5, true), 1000),
        step(stick(0.0, 0.0, false), 600),
        step(SystemCommand::Cancel, 100),
    ]
}

fn load_config(opts: &Opts) -> Result<MixConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &opts.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => MixConfig::default(),
    };
    if let Some(secs) = opts.full_range_secs {
        cfg = cfg.with_full_range_time(secs, CONTROL_PERIOD_SECS);
    }
    cfg.debug_turning |= opts.debug_turning;
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

fn load_scenario(opts: &Opts) -> Result<Vec<ScenarioStep>, Box<dyn std::error::Error>> {
    match &opts.scenario {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(default_scenario()),
    }
}

#[embassy_executor::task]
async fn drive_task(mut ctrl: DriveController<LogDrivetrain, LogTelemetry>) -> ! {
    ctrl.drive_ch().await
}

#[embassy_executor::task]
async fn scenario_task(steps: Vec<ScenarioStep>) {
    for s in steps {
        info!("Scenario command: {:?}", s.command);
        DRIVE_CHANNEL.send(s.command).await;
        Timer::after(Duration::from_millis(s.hold_ms)).await;
    }
    // let the drive loop pick up the last command
    Timer::after(Duration::from_millis(50)).await;
    info!("Scenario finished");
    std::process::exit(0);
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    cfg: MixConfig,
    steps: Vec<ScenarioStep>,
) {
    info!(?cfg, "Starting drive loop at 50Hz");
    let ctrl = DriveController::new(cfg, LogDrivetrain, LogTelemetry);
    spawner.spawn(drive_task(ctrl)).unwrap();
    spawner.spawn(scenario_task(steps)).unwrap();
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let (cfg, steps) = match load_config(&opts).and_then(|cfg| Ok((cfg, load_scenario(&opts)?))) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, cfg, steps)).unwrap();
    });
}
