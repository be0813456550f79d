// Loop timing, topics, chassis geometry and control gains
use std::time::Duration;

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Nominal control period in seconds (1 / LOOP_HZ)
pub const CONTROL_PERIOD: f64 = 1.0 / LOOP_HZ as f64;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "swerve/cmd/drive"; // drive commands
pub const TOPIC_RT_TELEMETRY: &str = "swerve/rt/telemetry"; // pose + module states
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Chassis geometry: distance between left/right and front/back module pairs, meters
pub const TRACK_WIDTH: f64 = 0.55;
pub const WHEEL_BASE: f64 = 0.55;

// Speed limits
pub const MAX_SPEED_MPS: f64 = 4.0;
pub const MAX_ROTATION_RADPS: f64 = 3.0;

// Below these magnitudes a corrected command is treated as "still" and the
// modules are stopped in place instead of being steered to near-zero targets.
pub const STILLNESS_SPEED_TOLERANCE: f64 = 0.05; // m/s
pub const STILLNESS_ROTATION_TOLERANCE: f64 = 0.05; // rad/s

// Heading controller (rad -> rad/s)
pub const HEADING_KP: f64 = 4.0;
pub const HEADING_KI: f64 = 0.0;
pub const HEADING_KD: f64 = 0.05;
pub const HEADING_MAX_RADPS: f64 = 3.0;

// Translation controllers (m -> m/s), one instance per axis
pub const TRANSLATION_KP: f64 = 2.5;
pub const TRANSLATION_KI: f64 = 0.0;
pub const TRANSLATION_KD: f64 = 0.0;
pub const TRANSLATION_MAX_MPS: f64 = 3.0;

// Simulated odometry sampling rate relative to the control loop
pub const SIM_SAMPLES_PER_TICK: usize = 4;
