// The swerve drivetrain. Commands flow caller -> velocity pipeline ->
// dynamics correction -> kinematics -> module dispatch; sensing flows
// sampling source -> fusion feeder -> pose estimator, once per tick before
// any command is issued.

use tracing::debug;

use super::controller::{HeadingController, PidGains, PositionController};
use super::dynamics::DynamicsCorrector;
use super::geometry::{Angle, Pose};
use super::kinematics::{
    ChassisSpeeds, FieldRelativeSpeeds, MODULE_COUNT, ModuleState, SwerveKinematics,
    desaturate_wheel_speeds,
};
use super::module::{ModuleDispatcher, ModuleIo, ModulePosition};
use super::odometry::{Gyro, OdometryError, OdometrySampleBundle, PoseEstimator, SamplingSource};
use crate::config;

/// Physical limits, tolerances and controller gains for one drivetrain.
#[derive(Debug, Clone)]
pub struct SwerveConfig {
    pub max_speed: f64,          // m/s
    pub max_rotation_speed: f64, // rad/s
    pub control_period: f64,     // s
    pub stillness_speed_tolerance: f64,
    pub stillness_rotation_tolerance: f64,
    pub heading_gains: PidGains,
    pub translation_gains: PidGains,
}

impl Default for SwerveConfig {
    fn default() -> Self {
        Self {
            max_speed: config::MAX_SPEED_MPS,
            max_rotation_speed: config::MAX_ROTATION_RADPS,
            control_period: config::CONTROL_PERIOD,
            stillness_speed_tolerance: config::STILLNESS_SPEED_TOLERANCE,
            stillness_rotation_tolerance: config::STILLNESS_ROTATION_TOLERANCE,
            heading_gains: PidGains {
                kp: config::HEADING_KP,
                ki: config::HEADING_KI,
                kd: config::HEADING_KD,
                max_output: config::HEADING_MAX_RADPS,
            },
            translation_gains: PidGains {
                kp: config::TRANSLATION_KP,
                ki: config::TRANSLATION_KI,
                kd: config::TRANSLATION_KD,
                max_output: config::TRANSLATION_MAX_MPS,
            },
        }
    }
}

/// Four-module swerve drivetrain. All collaborators are injected: module
/// handles, pose estimator, gyro and sampling source are trait objects the
/// caller owns the concrete types of, so the whole pipeline runs against
/// in-memory fakes in tests.
pub struct Swerve<M, E, G, S> {
    config: SwerveConfig,
    kinematics: SwerveKinematics,
    dispatcher: ModuleDispatcher<M>,
    corrector: DynamicsCorrector,
    heading_controller: HeadingController,
    x_controller: PositionController,
    y_controller: PositionController,
    estimator: E,
    gyro: G,
    samples: S,
}

impl<M, E, G, S> Swerve<M, E, G, S>
where
    M: ModuleIo,
    E: PoseEstimator,
    G: Gyro,
    S: SamplingSource,
{
    pub fn new(
        config: SwerveConfig,
        kinematics: SwerveKinematics,
        modules: [M; MODULE_COUNT],
        estimator: E,
        gyro: G,
        samples: S,
    ) -> Self {
        let corrector = DynamicsCorrector::new(config.control_period);
        let heading_controller = HeadingController::new(config.heading_gains);
        let x_controller = PositionController::new(config.translation_gains);
        let y_controller = PositionController::new(config.translation_gains);
        Self {
            config,
            kinematics,
            dispatcher: ModuleDispatcher::new(modules),
            corrector,
            heading_controller,
            x_controller,
            y_controller,
            estimator,
            gyro,
            samples,
        }
    }

    /// Start a new drive session: apply the operating mode to all modules
    /// and clear controller state, so no stale error carries across mode
    /// switches.
    pub fn initialize_drive(&mut self, open_loop: bool) {
        self.dispatcher.set_operating_mode(open_loop);
        self.heading_controller.reset();
        self.x_controller.reset();
        self.y_controller.reset();
    }

    /// Open-loop drive from proportional joystick powers, each in [-1, 1].
    /// Robot-centric powers are taken as robot-relative; otherwise they are
    /// field-relative and rotated by the current fused heading.
    pub fn drive_orientation_based(
        &mut self,
        x_power: f64,
        y_power: f64,
        rot_power: f64,
        robot_centric: bool,
        now: f64,
    ) {
        let vx = x_power * self.config.max_speed;
        let vy = y_power * self.config.max_speed;
        let omega = rot_power * self.config.max_rotation_speed;

        if robot_centric {
            self.drive_robot_relative(ChassisSpeeds::new(vx, vy, omega), now);
        } else {
            self.drive_field_relative(FieldRelativeSpeeds::new(vx, vy, omega), now);
        }
    }

    /// Translate on joystick powers while the heading controller turns the
    /// robot to face `target`. The controller output is already rad/s.
    pub fn drive_with_target(
        &mut self,
        x_power: f64,
        y_power: f64,
        target: Pose,
        robot_centric: bool,
        now: f64,
    ) {
        let current = self.estimator.current_pose();
        let target_angle = current.angle_to(&target);
        let omega = self.heading_controller.calculate(
            current.heading,
            target_angle,
            self.config.control_period,
        );

        let vx = x_power * self.config.max_speed;
        let vy = y_power * self.config.max_speed;

        if robot_centric {
            self.drive_robot_relative(ChassisSpeeds::new(vx, vy, omega), now);
        } else {
            self.drive_field_relative(FieldRelativeSpeeds::new(vx, vy, omega), now);
        }
    }

    /// Fully closed-loop drive to a field pose: one translation controller
    /// per axis plus the heading controller. Outputs are physical units, no
    /// power scaling.
    pub fn drive_to_pose(&mut self, target: Pose, now: f64) {
        let current = self.estimator.current_pose();
        let dt = self.config.control_period;

        let vx = self.x_controller.calculate(current.x(), target.x(), dt);
        let vy = self.y_controller.calculate(current.y(), target.y(), dt);
        let omega = self
            .heading_controller
            .calculate(current.heading, target.heading, dt);

        self.drive_field_relative(FieldRelativeSpeeds::new(vx, vy, omega), now);
    }

    /// Zero all wheel speeds without steering the modules.
    pub fn stop(&mut self) {
        self.dispatcher.stop();
    }

    /// Actual chassis velocity from measured module states (forward
    /// kinematics), robot-relative.
    pub fn robot_relative_velocity(&self) -> ChassisSpeeds {
        self.kinematics
            .to_chassis_speeds(&self.dispatcher.measured_states())
    }

    pub fn set_gyro_heading(&mut self, heading: Angle) {
        self.gyro.set_yaw(heading);
    }

    pub fn pose(&self) -> Pose {
        self.estimator.current_pose()
    }

    pub fn odometry_pose(&self) -> Pose {
        self.estimator.odometry_pose()
    }

    pub fn reset_pose(&mut self, pose: Pose) {
        self.estimator.reset_pose(pose);
    }

    pub fn target_states(&self) -> [ModuleState; MODULE_COUNT] {
        self.dispatcher.target_states()
    }

    pub fn measured_states(&self) -> [ModuleState; MODULE_COUNT] {
        self.dispatcher.measured_states()
    }

    /// Odometry fusion feeder. Runs once per control tick, before any
    /// command: drains every sample buffered since the last tick, builds one
    /// bundle per sample index in timestamp order, and forwards the whole
    /// batch to the pose estimator. A tick with no new samples is skipped.
    /// Mismatched buffer lengths or out-of-order timestamps fail the whole
    /// tick; nothing is forwarded.
    pub fn periodic(&mut self) -> Result<(), OdometryError> {
        let timestamps = self.samples.drain_timestamps();
        if timestamps.is_empty() {
            return Ok(());
        }

        let headings = self.samples.drain_heading_samples();
        if headings.len() != timestamps.len() {
            return Err(OdometryError::HeadingCountMismatch {
                headings: headings.len(),
                timestamps: timestamps.len(),
            });
        }

        for i in 1..timestamps.len() {
            if timestamps[i] < timestamps[i - 1] {
                return Err(OdometryError::NonMonotonicTimestamps { index: i });
            }
        }

        let mut positions: [Vec<ModulePosition>; MODULE_COUNT] =
            core::array::from_fn(|_| Vec::new());
        for (index, module) in self.dispatcher.modules_mut().iter_mut().enumerate() {
            let buffered = module.drain_odometry_positions();
            if buffered.len() != timestamps.len() {
                return Err(OdometryError::ModuleCountMismatch {
                    module: index,
                    positions: buffered.len(),
                    expected: timestamps.len(),
                });
            }
            positions[index] = buffered;
        }

        let bundles: Vec<OdometrySampleBundle> = timestamps
            .iter()
            .zip(&headings)
            .enumerate()
            .map(|(i, (&timestamp, &heading))| OdometrySampleBundle {
                timestamp,
                positions: core::array::from_fn(|m| positions[m][i]),
                heading,
            })
            .collect();

        debug!(samples = bundles.len(), "forwarding odometry bundles");
        self.estimator.update_with_samples(&bundles);
        Ok(())
    }

    fn drive_field_relative(&mut self, speeds: FieldRelativeSpeeds, now: f64) {
        let heading = self.estimator.current_pose().heading;
        self.drive_robot_relative(speeds.into_robot_relative(heading), now);
    }

    fn drive_robot_relative(&mut self, speeds: ChassisSpeeds, now: f64) {
        let speeds = self.corrector.correct(speeds, now);

        // Near-zero commands stop the modules in place instead of steering
        // them toward meaningless near-zero angles.
        if speeds.is_still(
            self.config.stillness_speed_tolerance,
            self.config.stillness_rotation_tolerance,
        ) {
            self.dispatcher.stop();
            return;
        }

        let mut states = self.kinematics.to_module_states(&speeds);
        desaturate_wheel_speeds(&mut states, self.config.max_speed);
        self.dispatcher.set_targets(states);
    }
}
