// Swerve kinematics for a four-module chassis.
// Converts chassis-frame velocities (x, y, omega) to per-module steer/speed
// targets and back.

use nalgebra::{Matrix3, Vector2, Vector3};

use super::geometry::Angle;

pub const MODULE_COUNT: usize = 4;

/// Robot-relative chassis velocity.
///
/// +x is forward, +y is left, +omega is counter-clockwise. Field-relative
/// velocities use [`FieldRelativeSpeeds`]; the two frames never mix silently.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisSpeeds {
    pub vx: f64,    // m/s
    pub vy: f64,    // m/s
    pub omega: f64, // rad/s
}

impl ChassisSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// True when all three components are inside the stillness tolerances.
    pub fn is_still(&self, speed_tolerance: f64, rotation_tolerance: f64) -> bool {
        self.vx.abs() < speed_tolerance
            && self.vy.abs() < speed_tolerance
            && self.omega.abs() < rotation_tolerance
    }
}

/// Chassis velocity expressed in the field frame. Converting to the robot
/// frame needs the current fused heading, so the conversion stays explicit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldRelativeSpeeds {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl FieldRelativeSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn into_robot_relative(self, heading: Angle) -> ChassisSpeeds {
        let v = (-heading).rotate(Vector2::new(self.vx, self.vy));
        ChassisSpeeds::new(v.x, v.y, self.omega)
    }
}

/// One module's steer angle and wheel speed. Used both as a target produced
/// by inverse kinematics and as a measured snapshot read back from hardware.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModuleState {
    pub angle: Angle,
    pub speed: f64, // m/s, signed along the wheel direction
}

/// Fixed module geometry: offsets of the four modules from the rotation
/// center, meters. Set once at construction, never mutated.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    offsets: [Vector2<f64>; MODULE_COUNT],
}

impl SwerveKinematics {
    pub fn new(offsets: [Vector2<f64>; MODULE_COUNT]) -> Self {
        Self { offsets }
    }

    /// Standard rectangular layout: front-left, front-right, back-left,
    /// back-right.
    pub fn rectangular(wheel_base: f64, track_width: f64) -> Self {
        let half_base = wheel_base / 2.0;
        let half_track = track_width / 2.0;
        Self::new([
            Vector2::new(half_base, half_track),
            Vector2::new(half_base, -half_track),
            Vector2::new(-half_base, half_track),
            Vector2::new(-half_base, -half_track),
        ])
    }

    /// Inverse kinematics: each module's velocity vector is the chassis
    /// translation plus the rotational component `omega x offset` (offset
    /// rotated 90 degrees counter-clockwise).
    pub fn to_module_states(&self, speeds: &ChassisSpeeds) -> [ModuleState; MODULE_COUNT] {
        self.offsets.map(|offset| {
            let vx = speeds.vx - speeds.omega * offset.y;
            let vy = speeds.vy + speeds.omega * offset.x;
            ModuleState {
                angle: Angle::from_radians(vy.atan2(vx)),
                speed: vx.hypot(vy),
            }
        })
    }

    /// Forward kinematics: least-squares chassis velocity from the four
    /// module states, via the 3x3 normal equations of the inverse map.
    pub fn to_chassis_speeds(&self, states: &[ModuleState; MODULE_COUNT]) -> ChassisSpeeds {
        let mut ata = Matrix3::zeros();
        let mut atb = Vector3::zeros();

        for (offset, state) in self.offsets.iter().zip(states) {
            let vx = state.speed * state.angle.cos();
            let vy = state.speed * state.angle.sin();

            // Rows of the inverse-kinematics matrix for this module:
            // [1, 0, -y] -> vx_i and [0, 1, x] -> vy_i
            ata[(0, 0)] += 1.0;
            ata[(0, 2)] += -offset.y;
            ata[(1, 1)] += 1.0;
            ata[(1, 2)] += offset.x;
            ata[(2, 0)] += -offset.y;
            ata[(2, 1)] += offset.x;
            ata[(2, 2)] += offset.norm_squared();

            atb.x += vx;
            atb.y += vy;
            atb.z += offset.x * vy - offset.y * vx;
        }

        match ata.lu().solve(&atb) {
            Some(v) => ChassisSpeeds::new(v.x, v.y, v.z),
            // Degenerate geometry (all offsets at the rotation center)
            None => ChassisSpeeds::default(),
        }
    }
}

/// Scale all module speeds by one common factor so that none exceeds
/// `max_speed`. Uniform scaling preserves the motion direction; clamping
/// modules independently would not.
pub fn desaturate_wheel_speeds(states: &mut [ModuleState; MODULE_COUNT], max_speed: f64) {
    let top = states
        .iter()
        .map(|s| s.speed.abs())
        .fold(0.0f64, f64::max);

    if top > max_speed {
        let scale = max_speed / top;
        for state in states {
            state.speed *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn kinematics() -> SwerveKinematics {
        SwerveKinematics::rectangular(0.55, 0.55)
    }

    #[test]
    fn test_pure_translation() {
        let states = kinematics().to_module_states(&ChassisSpeeds::new(2.0, 0.0, 0.0));
        for state in states {
            assert!((state.speed - 2.0).abs() < EPS);
            assert!(state.angle.radians().abs() < EPS);
        }
    }

    #[test]
    fn test_pure_rotation_spins_all_modules_equally() {
        let states = kinematics().to_module_states(&ChassisSpeeds::new(0.0, 0.0, 1.0));
        let radius = (0.275f64).hypot(0.275);
        for state in states {
            assert!((state.speed - radius).abs() < 1e-6);
        }
    }

    #[test]
    fn test_round_trip_without_desaturation() {
        let kin = kinematics();
        let input = ChassisSpeeds::new(1.2, -0.7, 0.9);
        let recovered = kin.to_chassis_speeds(&kin.to_module_states(&input));
        assert!((recovered.vx - input.vx).abs() < 1e-9);
        assert!((recovered.vy - input.vy).abs() < 1e-9);
        assert!((recovered.omega - input.omega).abs() < 1e-9);
    }

    #[test]
    fn test_desaturation_preserves_ratios() {
        let kin = kinematics();
        // Large combined command: saturates every module differently
        let mut states = kin.to_module_states(&ChassisSpeeds::new(5.0, 2.0, 4.0));
        let before = states;

        desaturate_wheel_speeds(&mut states, 4.0);

        let top = states.iter().map(|s| s.speed.abs()).fold(0.0f64, f64::max);
        assert!(top <= 4.0 + EPS);

        // All pairwise ratios unchanged
        for i in 0..MODULE_COUNT {
            for j in 0..MODULE_COUNT {
                let before_ratio = before[i].speed / before[j].speed;
                let after_ratio = states[i].speed / states[j].speed;
                assert!((before_ratio - after_ratio).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_desaturation_noop_under_limit() {
        let kin = kinematics();
        let mut states = kin.to_module_states(&ChassisSpeeds::new(1.0, 0.0, 0.0));
        let before = states;
        desaturate_wheel_speeds(&mut states, 4.0);
        assert_eq!(before, states);
    }

    #[test]
    fn test_field_relative_conversion() {
        // Robot facing +90deg: field-forward becomes robot-rightward (-y)
        let speeds = FieldRelativeSpeeds::new(1.0, 0.0, 0.5)
            .into_robot_relative(Angle::from_degrees(90.0));
        assert!(speeds.vx.abs() < EPS);
        assert!((speeds.vy + 1.0).abs() < EPS);
        assert!((speeds.omega - 0.5).abs() < EPS);
    }

    #[test]
    fn test_stillness_check() {
        assert!(ChassisSpeeds::new(0.01, -0.02, 0.03).is_still(0.05, 0.05));
        assert!(!ChassisSpeeds::new(0.2, 0.0, 0.0).is_still(0.05, 0.05));
        assert!(!ChassisSpeeds::new(0.0, 0.0, 0.2).is_still(0.05, 0.05));
    }
}
