// 50 Hz control loop with watchdog
// If teleop dies and commands go stale, the watchdog stops the drivetrain
// instead of replaying the last command forever.

use std::mem::discriminant;
use std::time::Instant;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{CMD_TIMEOUT, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_RT_TELEMETRY, TRACK_WIDTH, WHEEL_BASE};
use crate::messages::{DriveCommand, RuntimeHealth, SwerveTelemetry};
use crate::sim::{SimHarness, SimPoseEstimator};
use crate::swerve::{
    Angle, Gyro, ModuleIo, PoseEstimator, SamplingSource, Swerve, SwerveConfig, SwerveKinematics,
};

/// Drives one swerve drivetrain from latched wire commands, with a watchdog
/// over command freshness and per-tick odometry fault reporting.
pub struct Runtime<M, E, G, S> {
    swerve: Swerve<M, E, G, S>,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    started_at: Instant,
    health: RuntimeHealth,
}

impl<M, E, G, S> Runtime<M, E, G, S>
where
    M: ModuleIo,
    E: PoseEstimator,
    G: Gyro,
    S: SamplingSource,
{
    pub fn new(swerve: Swerve<M, E, G, S>) -> Self {
        Self {
            swerve,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            started_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Process one incoming command. A drive-mode change starts a new drive
    /// session (module operating mode + controller reset); one-shot commands
    /// apply immediately and are never latched.
    pub fn on_command(&mut self, cmd: DriveCommand) {
        info!("Received command: {:?}", &cmd);

        match cmd {
            DriveCommand::SetGyroHeading { heading_deg } => {
                self.swerve.set_gyro_heading(Angle::from_degrees(heading_deg));
                return;
            }
            DriveCommand::ResetPose { pose } => {
                self.swerve.reset_pose(pose.into_pose());
                return;
            }
            _ => {}
        }

        let same_mode = self
            .latest_cmd
            .as_ref()
            .is_some_and(|prev| discriminant(prev) == discriminant(&cmd));
        if !same_mode {
            self.swerve.initialize_drive(cmd.open_loop());
        }

        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// One control tick: odometry fusion feeder first, then the
    /// watchdog-guarded drive command.
    pub fn tick(&mut self) {
        let odometry_fault = match self.swerve.periodic() {
            Ok(()) => false,
            Err(e) => {
                warn!("Odometry tick failed: {}", e);
                true
            }
        };

        let now = self.started_at.elapsed().as_secs_f64();
        let cmd_age = self.cmd_received_at.elapsed();
        let stale = self.latest_cmd.is_none() || cmd_age > CMD_TIMEOUT;

        if stale {
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping drivetrain", cmd_age);
            }
            self.swerve.stop();
        } else if let Some(cmd) = self.latest_cmd.clone() {
            self.apply(cmd, now);
        }

        self.health = if odometry_fault {
            RuntimeHealth::OdometryFault
        } else if stale {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        };
    }

    fn apply(&mut self, cmd: DriveCommand, now: f64) {
        match cmd {
            DriveCommand::OrientationBased {
                x_power,
                y_power,
                rot_power,
                robot_centric,
            } => self
                .swerve
                .drive_orientation_based(x_power, y_power, rot_power, robot_centric, now),
            DriveCommand::WithTarget {
                x_power,
                y_power,
                target,
                robot_centric,
            } => self
                .swerve
                .drive_with_target(x_power, y_power, target.into_pose(), robot_centric, now),
            DriveCommand::ToPose { target } => self.swerve.drive_to_pose(target.into_pose(), now),
            DriveCommand::Stop => self.swerve.stop(),
            // Applied on receipt in on_command
            DriveCommand::SetGyroHeading { .. } | DriveCommand::ResetPose { .. } => {}
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn telemetry(&self) -> SwerveTelemetry {
        SwerveTelemetry {
            pose: self.swerve.pose().into(),
            odometry_pose: self.swerve.odometry_pose().into(),
            velocity: self.swerve.robot_relative_velocity().into(),
            target_states: self.swerve.target_states().map(Into::into),
            measured_states: self.swerve.measured_states().map(Into::into),
        }
    }
}

pub async fn run(
    hz: u64,
    samples_per_tick: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_RT_TELEMETRY).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let kinematics = SwerveKinematics::rectangular(WHEEL_BASE, TRACK_WIDTH);
    let harness = SimHarness::new(kinematics.clone(), samples_per_tick);
    let swerve = Swerve::new(
        SwerveConfig::default(),
        kinematics.clone(),
        harness.modules(),
        SimPoseEstimator::new(kinematics),
        harness.gyro(),
        harness.sampling_source(),
    );
    let mut runtime = Runtime::new(swerve);

    let period = std::time::Duration::from_millis(1000 / hz);
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        hz,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_RT_TELEMETRY, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking)
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Advance the simulated hardware so fresh odometry samples exist
        harness.step(period.as_secs_f64());

        // 3. Feeder + drive command (includes watchdog logic)
        runtime.tick();

        // 4. Publish telemetry and health
        pub_telemetry
            .put(serde_json::to_string(&runtime.telemetry())?)
            .await?;
        pub_health
            .put(serde_json::to_string(&runtime.health())?)
            .await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SIM_SAMPLES_PER_TICK;

    fn sim_runtime() -> (
        SimHarness,
        Runtime<
            crate::sim::SimModule,
            SimPoseEstimator,
            crate::sim::SimGyro,
            crate::sim::SimSamplingSource,
        >,
    ) {
        let kinematics = SwerveKinematics::rectangular(WHEEL_BASE, TRACK_WIDTH);
        let harness = SimHarness::new(kinematics.clone(), SIM_SAMPLES_PER_TICK);
        let swerve = Swerve::new(
            SwerveConfig::default(),
            kinematics.clone(),
            harness.modules(),
            SimPoseEstimator::new(kinematics),
            harness.gyro(),
            harness.sampling_source(),
        );
        (harness.clone(), Runtime::new(swerve))
    }

    #[test]
    fn test_watchdog_stale_until_first_command() {
        let (harness, mut runtime) = sim_runtime();
        harness.step(0.02);
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);

        runtime.on_command(DriveCommand::OrientationBased {
            x_power: 0.5,
            y_power: 0.0,
            rot_power: 0.0,
            robot_centric: true,
        });
        harness.step(0.02);
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert!(runtime.telemetry().velocity.vx > 1.9);
    }

    #[test]
    fn test_one_shot_commands_are_not_latched() {
        let (harness, mut runtime) = sim_runtime();
        runtime.on_command(DriveCommand::SetGyroHeading { heading_deg: 90.0 });

        // Still stale: a gyro reset is not a drive command
        harness.step(0.02);
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
    }
}
