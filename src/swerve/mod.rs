// Swerve drivetrain core
//
// Provides:
// - chassis <-> module kinematics with wheel-speed desaturation
// - discretization and skew dynamics corrections
// - the velocity command pipeline and the odometry fusion feeder
// - heading/position hold controllers

pub mod controller;
pub mod drive;
pub mod dynamics;
pub mod geometry;
pub mod kinematics;
pub mod module;
pub mod odometry;

pub use controller::{HeadingController, Pid, PidGains, PositionController};
pub use drive::{Swerve, SwerveConfig};
pub use dynamics::DynamicsCorrector;
pub use geometry::{Angle, Pose};
pub use kinematics::{
    ChassisSpeeds, FieldRelativeSpeeds, MODULE_COUNT, ModuleState, SwerveKinematics,
    desaturate_wheel_speeds,
};
pub use module::{ModuleDispatcher, ModuleIo, ModulePosition};
pub use odometry::{Gyro, OdometryError, OdometrySampleBundle, PoseEstimator, SamplingSource};
