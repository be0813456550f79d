// Swerve drivetrain control runtime
//
// - `swerve`: the drivetrain core (kinematics, dynamics correction,
//   velocity command pipeline, odometry fusion feeder, controllers)
// - `sim`: in-memory hardware backend for running without a robot
// - `runtime`: 50 Hz zenoh-driven control loop with watchdog

pub mod config;
pub mod messages;
pub mod runtime;
pub mod sim;
pub mod swerve;
