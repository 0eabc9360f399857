use anyhow::{anyhow, bail, Result};
use clap::{Parser, ValueEnum};
use lbr_advanced_demos::{logging, package_manifest::PackageManifest};
use lbr_controller::{
    admittance_controller::AdmittanceController,
    controller_config::ControllerConfig,
    kinematics::RobotDescription,
    robot_driver::{RobotDriver, SimulatedRobot},
    types::{CartesianVector, JntArray, SessionState, N_JNTS},
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Admittance control of a simulated KUKA LBR.
///
/// The estimated external wrench drives a virtual mass-damper-spring,
/// the robot follows it through the inverse jacobian.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Controller configuration, defaults to the included one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Robot description, defaults to the included LBR iiwa 7 R800
    #[arg(long, value_name = "PATH")]
    robot_description: Option<PathBuf>,

    /// External wrench on the tip as fx,fy,fz,tx,ty,tz
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    wrench: Vec<f64>,

    /// Initial joint positions in radians
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    initial_positions: Vec<f64>,

    /// Session state the simulated robot reports
    #[arg(long, value_enum, default_value_t = SessionStateArg::CommandingActive)]
    session_state: SessionStateArg,

    /// Sample time of the robot in seconds
    #[arg(long, default_value_t = 0.005)]
    sample_time: f64,

    /// Stop after this many seconds instead of waiting for Ctrl+c
    #[arg(long)]
    duration: Option<f64>,

    /// Print the package manifest and exit
    #[arg(long)]
    print_manifest: bool,

    /// Log as json
    #[arg(long)]
    json_logs: bool,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum SessionStateArg {
    Idle,
    MonitoringWait,
    MonitoringReady,
    CommandingWait,
    CommandingActive,
}

impl From<SessionStateArg> for SessionState {
    fn from(arg: SessionStateArg) -> Self {
        match arg {
            SessionStateArg::Idle => SessionState::Idle,
            SessionStateArg::MonitoringWait => SessionState::MonitoringWait,
            SessionStateArg::MonitoringReady => SessionState::MonitoringReady,
            SessionStateArg::CommandingWait => SessionState::CommandingWait,
            SessionStateArg::CommandingActive => SessionState::CommandingActive,
        }
    }
}

/// Elbow and wrist bent away from the stretched out singularity
const HOME_POSITIONS: [f64; N_JNTS] = [0.0, 0.5236, 0.0, -1.0472, 0.0, 1.0472, 0.0];

fn external_wrench(values: &[f64]) -> Result<CartesianVector> {
    match values.len() {
        0 => Ok(CartesianVector::zeros()),
        6 => Ok(CartesianVector::from_column_slice(values)),
        found => bail!("wrench needs 6 values, got {}", found),
    }
}

fn initial_positions(values: &[f64]) -> Result<JntArray> {
    match values.len() {
        0 => Ok(JntArray::from_column_slice(&HOME_POSITIONS)),
        N_JNTS => Ok(JntArray::from_column_slice(values)),
        found => bail!("initial positions need {} values, got {}", N_JNTS, found),
    }
}

fn parse_sample_time(seconds: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(sample_time) if !sample_time.is_zero() => Ok(sample_time),
        _ => bail!("sample time must be positive, got {}", seconds),
    }
}

fn parse_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        anyhow!(
            "duration must be between 0 and {:?}, got {}",
            Duration::MAX,
            seconds
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_manifest {
        println!("{}", PackageManifest::included()?.serialize_to_json()?);
        return Ok(());
    }

    logging::setup_tracing(args.verbose, args.json_logs)?;

    let sample_time = parse_sample_time(args.sample_time)?;
    let run_for = args.duration.map(parse_duration).transpose()?;

    let config = match &args.config {
        Some(path) => ControllerConfig::load_yaml(path)?,
        None => ControllerConfig::included()?,
    };
    let description = match &args.robot_description {
        Some(path) => RobotDescription::load_yaml(path)?,
        None => RobotDescription::included_iiwa7(),
    };

    let mut robot = SimulatedRobot::new(
        &config.robot_name,
        initial_positions(&args.initial_positions)?,
        args.sample_time,
    )
    .with_external_wrench(external_wrench(&args.wrench)?)
    .with_session_state(args.session_state.into());

    let mut controller = AdmittanceController::new(&config, &description)?;
    controller.configure()?;
    controller.activate(&robot.read_state().await?)?;
    info!("Admittance control active for {}", description.name);

    let keep_running = Arc::new(AtomicBool::new(true));

    tokio::spawn({
        let keep_running = keep_running.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Detected Ctrl+c");
            }
            keep_running.store(false, Ordering::Relaxed);
        }
    });

    let mut interval = time::interval(sample_time);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();
    let mut last_tick: Option<Instant> = None;
    let mut cycles: u64 = 0;

    while keep_running.load(Ordering::Relaxed) {
        let tick = interval.tick().await;
        if run_for.map_or(false, |run_for| started.elapsed() >= run_for) {
            break;
        }
        let period = last_tick
            .map(|last_tick| tick - last_tick)
            .filter(|period| !period.is_zero())
            .unwrap_or(sample_time);
        last_tick = Some(tick);

        let state = robot.read_state().await?;
        if let Some(command) = controller.update(&state, period)? {
            robot.write_command(&command).await?;
        }

        cycles += 1;
        if cycles % 200 == 0 {
            debug!(
                "Twist command {:?}, joint positions {:?}",
                controller.twist_command().as_slice(),
                robot.positions().as_slice()
            );
        }
    }

    controller.deactivate()?;
    info!(
        "Stopped after {} cycles at joint positions {:?}",
        cycles,
        robot.positions().as_slice()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["admittance_control_node"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.wrench.is_empty());
        assert_eq!(args.sample_time, 0.005);
        assert!(matches!(
            args.session_state,
            SessionStateArg::CommandingActive
        ));
    }

    #[test]
    fn test_cli_negative_wrench() {
        let args =
            Args::try_parse_from(["admittance_control_node", "--wrench", "-5,0,0,0,0,0.5"])
                .unwrap();
        assert_eq!(args.wrench, vec![-5.0, 0.0, 0.0, 0.0, 0.0, 0.5]);
        let wrench = external_wrench(&args.wrench).unwrap();
        assert_eq!(wrench[0], -5.0);
    }

    #[test]
    fn test_wrench_needs_six_values() {
        assert!(external_wrench(&[1.0, 2.0]).is_err());
        assert_eq!(external_wrench(&[]).unwrap(), CartesianVector::zeros());
    }

    #[test]
    fn test_initial_positions_default_to_home() {
        assert_eq!(
            initial_positions(&[]).unwrap(),
            JntArray::from_column_slice(&HOME_POSITIONS)
        );
        assert!(initial_positions(&[0.0; 3]).is_err());
    }

    #[test]
    fn test_sample_time_must_not_round_to_zero() {
        assert!((parse_sample_time(0.005).unwrap().as_secs_f64() - 0.005).abs() < 1e-9);
        assert!(parse_sample_time(1e-12).is_err());
        assert!(parse_sample_time(0.0).is_err());
        assert!(parse_sample_time(f64::NAN).is_err());
    }

    #[test]
    fn test_duration_must_fit() {
        assert_eq!(parse_duration(0.0).unwrap(), Duration::ZERO);
        assert!(parse_duration(1e30).is_err());
        assert!(parse_duration(-1.0).is_err());
    }

    #[test]
    fn test_cli_session_state() {
        let args =
            Args::try_parse_from(["admittance_control_node", "--session-state", "monitoring-ready"])
                .unwrap();
        assert_eq!(
            SessionState::from(args.session_state),
            SessionState::MonitoringReady
        );
    }
}
