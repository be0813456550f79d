// Odometry sampling boundary: the high-frequency sampling source, the
// external pose-fusion filter, and the gyro. The control loop only drains
// what the sampling thread already buffered; it never blocks on it.

use thiserror::Error;

use super::geometry::{Angle, Pose};
use super::kinematics::MODULE_COUNT;
use super::module::ModulePosition;

/// One high-frequency odometry sample: all four module positions plus the
/// gyro heading captured at `timestamp`. Built per tick by the fusion
/// feeder, consumed synchronously by the estimator, never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometrySampleBundle {
    pub timestamp: f64,
    pub positions: [ModulePosition; MODULE_COUNT],
    pub heading: Angle,
}

/// Read side of the asynchronous sampling thread. Both drains return
/// everything buffered since the previous call, oldest first, and clear the
/// buffer (snapshot-and-clear). Cross-thread handoff is the source's
/// responsibility; the core takes no locks.
pub trait SamplingSource {
    fn drain_timestamps(&mut self) -> Vec<f64>;
    fn drain_heading_samples(&mut self) -> Vec<Angle>;
}

/// External pose-fusion filter, consumed as a black box.
pub trait PoseEstimator {
    /// Best-estimate pose including any external corrections.
    fn current_pose(&self) -> Pose;

    /// Pose from wheel odometry alone.
    fn odometry_pose(&self) -> Pose;

    fn reset_pose(&mut self, pose: Pose);

    /// Bundles arrive in non-decreasing timestamp order, one batch per tick.
    fn update_with_samples(&mut self, bundles: &[OdometrySampleBundle]);
}

pub trait Gyro {
    fn set_yaw(&mut self, heading: Angle);
    fn yaw(&self) -> Angle;
}

/// Timing inconsistencies between the sampling buffers. Fatal for the
/// current tick: the feeder forwards nothing rather than truncate, pad, or
/// reorder sensor data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OdometryError {
    #[error("{headings} heading samples buffered for {timestamps} timestamps")]
    HeadingCountMismatch { headings: usize, timestamps: usize },

    #[error("module {module} buffered {positions} positions, expected {expected}")]
    ModuleCountMismatch {
        module: usize,
        positions: usize,
        expected: usize,
    },

    #[error("sample timestamps out of order at index {index}")]
    NonMonotonicTimestamps { index: usize },
}
