// In-memory hardware backend: ideal modules, a stand-in for the
// high-frequency sampling thread, and an integrating pose estimator.
// Lets the runtime binary and the pipeline tests run without a robot.

use std::sync::{Arc, Mutex};

use nalgebra::Vector2;

use crate::swerve::{
    Angle, Gyro, MODULE_COUNT, ModuleIo, ModulePosition, ModuleState, OdometrySampleBundle, Pose,
    PoseEstimator, SamplingSource, SwerveKinematics,
};

#[derive(Debug, Default)]
struct SimModuleInner {
    target: ModuleState,
    distance: f64,
    buffered: Vec<ModulePosition>,
}

#[derive(Debug, Default)]
struct World {
    time: f64,
    heading: Angle,
    yaw_offset: Angle,
    modules: [SimModuleInner; MODULE_COUNT],
    timestamps: Vec<f64>,
    headings: Vec<Angle>,
}

/// Owns the simulated world and hands out the hardware-facing handles. The
/// shared state is behind one mutex; only the sim locks it, never the core.
#[derive(Clone)]
pub struct SimHarness {
    world: Arc<Mutex<World>>,
    kinematics: SwerveKinematics,
    samples_per_tick: usize,
}

impl SimHarness {
    pub fn new(kinematics: SwerveKinematics, samples_per_tick: usize) -> Self {
        Self {
            world: Arc::new(Mutex::new(World::default())),
            kinematics,
            samples_per_tick,
        }
    }

    pub fn modules(&self) -> [SimModule; MODULE_COUNT] {
        core::array::from_fn(|index| SimModule {
            index,
            world: Arc::clone(&self.world),
        })
    }

    pub fn sampling_source(&self) -> SimSamplingSource {
        SimSamplingSource {
            world: Arc::clone(&self.world),
        }
    }

    pub fn gyro(&self) -> SimGyro {
        SimGyro {
            world: Arc::clone(&self.world),
        }
    }

    /// Advance the simulated hardware by one control period, buffering
    /// `samples_per_tick` odometry samples. Modules are ideal: they hold
    /// their commanded steer angle and wheel speed exactly.
    pub fn step(&self, period: f64) {
        let mut world = self.world.lock().unwrap();
        let sub = period / self.samples_per_tick as f64;

        for _ in 0..self.samples_per_tick {
            world.time += sub;

            let states: [ModuleState; MODULE_COUNT] =
                core::array::from_fn(|i| world.modules[i].target);
            let speeds = self.kinematics.to_chassis_speeds(&states);
            world.heading = world.heading + Angle::from_radians(speeds.omega * sub);

            let timestamp = world.time;
            let reported_heading = world.heading + world.yaw_offset;
            for module in &mut world.modules {
                module.distance += module.target.speed * sub;
                module.buffered.push(ModulePosition {
                    angle: module.target.angle,
                    distance: module.distance,
                });
            }
            world.timestamps.push(timestamp);
            world.headings.push(reported_heading);
        }
    }
}

/// One ideal simulated module.
pub struct SimModule {
    index: usize,
    world: Arc<Mutex<World>>,
}

impl ModuleIo for SimModule {
    fn set_target(&mut self, angle: Angle, speed: f64, _open_loop: bool) {
        let mut world = self.world.lock().unwrap();
        world.modules[self.index].target = ModuleState { angle, speed };
    }

    fn stop(&mut self) {
        let mut world = self.world.lock().unwrap();
        world.modules[self.index].target.speed = 0.0;
    }

    fn measured_state(&self) -> ModuleState {
        self.world.lock().unwrap().modules[self.index].target
    }

    fn drain_odometry_positions(&mut self) -> Vec<ModulePosition> {
        let mut world = self.world.lock().unwrap();
        std::mem::take(&mut world.modules[self.index].buffered)
    }
}

pub struct SimSamplingSource {
    world: Arc<Mutex<World>>,
}

impl SamplingSource for SimSamplingSource {
    fn drain_timestamps(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.world.lock().unwrap().timestamps)
    }

    fn drain_heading_samples(&mut self) -> Vec<Angle> {
        std::mem::take(&mut self.world.lock().unwrap().headings)
    }
}

pub struct SimGyro {
    world: Arc<Mutex<World>>,
}

impl Gyro for SimGyro {
    fn set_yaw(&mut self, heading: Angle) {
        let mut world = self.world.lock().unwrap();
        world.yaw_offset = heading - world.heading;
    }

    fn yaw(&self) -> Angle {
        let world = self.world.lock().unwrap();
        world.heading + world.yaw_offset
    }
}

/// Minimal pose estimator: dead-reckons module position deltas through
/// forward kinematics and takes heading straight from the gyro samples.
/// Stands in for the external fusion filter, which is a black box to the
/// drivetrain core.
pub struct SimPoseEstimator {
    pose: Pose,
    kinematics: SwerveKinematics,
    last_positions: Option<[ModulePosition; MODULE_COUNT]>,
}

impl SimPoseEstimator {
    pub fn new(kinematics: SwerveKinematics) -> Self {
        Self {
            pose: Pose::default(),
            kinematics,
            last_positions: None,
        }
    }
}

impl PoseEstimator for SimPoseEstimator {
    fn current_pose(&self) -> Pose {
        self.pose
    }

    fn odometry_pose(&self) -> Pose {
        self.pose
    }

    fn reset_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    fn update_with_samples(&mut self, bundles: &[OdometrySampleBundle]) {
        for bundle in bundles {
            if let Some(last) = self.last_positions {
                // Per-sample wheel deltas through forward kinematics give
                // the robot-frame translation since the previous sample.
                let deltas: [ModuleState; MODULE_COUNT] = core::array::from_fn(|i| ModuleState {
                    angle: bundle.positions[i].angle,
                    speed: bundle.positions[i].distance - last[i].distance,
                });
                let twist = self.kinematics.to_chassis_speeds(&deltas);
                let delta = self
                    .pose
                    .heading
                    .rotate(Vector2::new(twist.vx, twist.vy));

                self.pose = Pose {
                    translation: self.pose.translation + delta,
                    heading: bundle.heading,
                };
            }
            self.last_positions = Some(bundle.positions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swerve::{Swerve, SwerveConfig};

    #[test]
    fn test_sim_round_trip_forward_drive() {
        let kinematics = SwerveKinematics::rectangular(0.55, 0.55);
        let harness = SimHarness::new(kinematics.clone(), 4);
        let mut swerve = Swerve::new(
            SwerveConfig::default(),
            kinematics.clone(),
            harness.modules(),
            SimPoseEstimator::new(kinematics),
            harness.gyro(),
            harness.sampling_source(),
        );

        // One second of half-power forward drive at 50 Hz
        for tick in 0..50 {
            let now = tick as f64 * 0.02;
            swerve.periodic().unwrap();
            swerve.drive_orientation_based(0.5, 0.0, 0.0, true, now);
            harness.step(0.02);
        }
        swerve.periodic().unwrap();

        // 2 m/s for ~1 s; the very first sample delta is unknown to the
        // estimator, so allow a one-sample shortfall
        let pose = swerve.pose();
        assert!(pose.x() > 1.9 && pose.x() < 2.05, "x = {}", pose.x());
        assert!(pose.y().abs() < 1e-6);
    }

    #[test]
    fn test_sim_gyro_offset() {
        let harness = SimHarness::new(SwerveKinematics::rectangular(0.55, 0.55), 4);
        let mut gyro = harness.gyro();
        gyro.set_yaw(Angle::from_degrees(45.0));
        assert!((gyro.yaw().degrees() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_sim_buffers_expected_sample_count() {
        let harness = SimHarness::new(SwerveKinematics::rectangular(0.55, 0.55), 4);
        harness.step(0.02);
        harness.step(0.02);

        let mut source = harness.sampling_source();
        let timestamps = source.drain_timestamps();
        assert_eq!(timestamps.len(), 8);
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(source.drain_heading_samples().len(), 8);

        // Snapshot-and-clear
        assert!(source.drain_timestamps().is_empty());
    }
}
