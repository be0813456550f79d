// Wire types exchanged with teleop/autonomous clients over zenoh. Angles
// are degrees on the wire, radians inside the core.

use serde::{Deserialize, Serialize};

use crate::swerve::{Angle, ChassisSpeeds, MODULE_COUNT, ModuleState, Pose};

/// Field pose on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PoseMsg {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

impl PoseMsg {
    pub fn into_pose(self) -> Pose {
        Pose::new(self.x, self.y, Angle::from_degrees(self.heading_deg))
    }
}

impl From<Pose> for PoseMsg {
    fn from(pose: Pose) -> Self {
        Self {
            x: pose.x(),
            y: pose.y(),
            heading_deg: pose.heading.degrees(),
        }
    }
}

/// Command from teleop/scripts -> runtime. Powers are proportional, each in
/// [-1, 1]; the runtime scales them against the configured speed limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DriveCommand {
    OrientationBased {
        x_power: f64,
        y_power: f64,
        rot_power: f64,
        robot_centric: bool,
    },
    WithTarget {
        x_power: f64,
        y_power: f64,
        target: PoseMsg,
        robot_centric: bool,
    },
    ToPose {
        target: PoseMsg,
    },
    Stop,
    /// One-shot: applied immediately on receipt, never latched.
    SetGyroHeading {
        heading_deg: f64,
    },
    /// One-shot: applied immediately on receipt, never latched.
    ResetPose {
        pose: PoseMsg,
    },
}

impl DriveCommand {
    /// Whether this drive mode runs the modules open-loop. Teleop power
    /// modes do; the fully closed-loop pose hold does not.
    pub fn open_loop(&self) -> bool {
        !matches!(self, DriveCommand::ToPose { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ModuleStateMsg {
    pub angle_deg: f64,
    pub speed_mps: f64,
}

impl From<ModuleState> for ModuleStateMsg {
    fn from(state: ModuleState) -> Self {
        Self {
            angle_deg: state.angle.degrees(),
            speed_mps: state.speed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ChassisSpeedsMsg {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl From<ChassisSpeeds> for ChassisSpeedsMsg {
    fn from(speeds: ChassisSpeeds) -> Self {
        Self {
            vx: speeds.vx,
            vy: speeds.vy,
            omega: speeds.omega,
        }
    }
}

/// Telemetry published by the runtime every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwerveTelemetry {
    pub pose: PoseMsg,
    pub odometry_pose: PoseMsg,
    pub velocity: ChassisSpeedsMsg,
    pub target_states: [ModuleStateMsg; MODULE_COUNT],
    pub measured_states: [ModuleStateMsg; MODULE_COUNT],
}

/// Health status published by the runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    OdometryFault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_command_wire_format() {
        let json = r#"{"mode":"orientation_based","x_power":1.0,"y_power":0.0,"rot_power":-0.5,"robot_centric":true}"#;
        let cmd: DriveCommand = serde_json::from_str(json).unwrap();
        match cmd {
            DriveCommand::OrientationBased {
                x_power,
                rot_power,
                robot_centric,
                ..
            } => {
                assert_eq!(x_power, 1.0);
                assert_eq!(rot_power, -0.5);
                assert!(robot_centric);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_open_loop_per_mode() {
        assert!(
            DriveCommand::OrientationBased {
                x_power: 0.0,
                y_power: 0.0,
                rot_power: 0.0,
                robot_centric: true,
            }
            .open_loop()
        );
        assert!(
            !DriveCommand::ToPose {
                target: PoseMsg::default(),
            }
            .open_loop()
        );
    }

    #[test]
    fn test_pose_msg_round_trip() {
        let pose = Pose::new(1.5, -2.0, Angle::from_degrees(30.0));
        let msg = PoseMsg::from(pose);
        let back = msg.into_pose();
        assert!((back.x() - 1.5).abs() < 1e-9);
        assert!((back.heading.degrees() - 30.0).abs() < 1e-9);
    }
}
