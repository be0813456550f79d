// Discrete-time corrections applied to a chassis command before it is
// distributed to the modules. The hardware holds a commanded velocity
// constant for a whole control period, so the command that best reaches the
// intended pose delta is not the raw instantaneous velocity.

use nalgebra::Vector2;

use super::geometry::Angle;
use super::kinematics::ChassisSpeeds;

/// Applies the per-tick discretization and skew corrections. Stateful: keeps
/// the timestamp of the previous correction to measure the real elapsed
/// period. The stored timestamp is non-decreasing and advances exactly once
/// per call.
#[derive(Debug)]
pub struct DynamicsCorrector {
    nominal_period: f64,
    last_timestamp: Option<f64>,
}

impl DynamicsCorrector {
    pub fn new(nominal_period: f64) -> Self {
        Self {
            nominal_period,
            last_timestamp: None,
        }
    }

    /// Both corrections in order: discretization over the measured period,
    /// then skew removal. `now` is monotonic seconds.
    pub fn correct(&mut self, speeds: ChassisSpeeds, now: f64) -> ChassisSpeeds {
        // First call and non-advancing clocks fall back to the nominal
        // period; dt = 0 would degenerate the twist division below.
        let dt = match self.last_timestamp {
            Some(last) if now > last => now - last,
            _ => self.nominal_period,
        };
        self.last_timestamp = Some(match self.last_timestamp {
            Some(last) => last.max(now),
            None => now,
        });

        let speeds = discretize(speeds, dt);
        correct_for_skew(speeds, self.nominal_period)
    }
}

/// Replace an instantaneous velocity with the constant velocity whose
/// integral over `dt` lands on the pose delta the caller intended. This is
/// the inverse pose exponential (twist) of the delta (vx*dt, vy*dt, omega*dt).
pub fn discretize(speeds: ChassisSpeeds, dt: f64) -> ChassisSpeeds {
    let dx = speeds.vx * dt;
    let dy = speeds.vy * dt;
    let dtheta = speeds.omega * dt;

    let half = dtheta / 2.0;
    let cos_minus_one = dtheta.cos() - 1.0;
    // Taylor fallback near dtheta = 0 where the closed form is 0/0
    let half_theta_by_tan = if cos_minus_one.abs() < 1e-9 {
        1.0 - dtheta * dtheta / 12.0
    } else {
        -(half * dtheta.sin()) / cos_minus_one
    };

    let tx = dx * half_theta_by_tan + dy * half;
    let ty = -dx * half + dy * half_theta_by_tan;

    ChassisSpeeds::new(tx / dt, ty / dt, speeds.omega)
}

/// Rotating while translating drags the translation sideways over the
/// discrete period. Counter-rotate the translational component by half the
/// rotation covered in one period. No-op when omega is zero.
pub fn correct_for_skew(speeds: ChassisSpeeds, period: f64) -> ChassisSpeeds {
    let correction = Angle::from_radians(-speeds.omega * period / 2.0);
    let v = correction.rotate(Vector2::new(speeds.vx, speeds.vy));
    ChassisSpeeds::new(v.x, v.y, speeds.omega)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: f64 = 0.02;
    const EPS: f64 = 1e-9;

    #[test]
    fn test_identity_without_rotation() {
        let mut corrector = DynamicsCorrector::new(PERIOD);
        let out = corrector.correct(ChassisSpeeds::new(2.0, -1.0, 0.0), 10.0);
        assert!((out.vx - 2.0).abs() < EPS);
        assert!((out.vy + 1.0).abs() < EPS);
        assert!(out.omega.abs() < EPS);
    }

    #[test]
    fn test_first_call_uses_nominal_period() {
        let mut corrector = DynamicsCorrector::new(PERIOD);
        // No previous timestamp: must not divide by zero or produce NaN
        let out = corrector.correct(ChassisSpeeds::new(1.0, 0.0, 2.0), 0.0);
        assert!(out.vx.is_finite() && out.vy.is_finite() && out.omega.is_finite());
    }

    #[test]
    fn test_timestamp_never_rewinds() {
        let mut corrector = DynamicsCorrector::new(PERIOD);
        corrector.correct(ChassisSpeeds::default(), 10.0);
        // A stale clock reading must fall back to the nominal period and
        // leave the stored timestamp at its high-water mark.
        let out = corrector.correct(ChassisSpeeds::new(1.0, 0.0, 0.0), 5.0);
        assert!(out.vx.is_finite());
        assert_eq!(corrector.last_timestamp, Some(10.0));
    }

    #[test]
    fn test_discretize_preserves_omega() {
        let out = discretize(ChassisSpeeds::new(3.0, 1.0, 2.5), PERIOD);
        assert!((out.omega - 2.5).abs() < EPS);
    }

    #[test]
    fn test_discretize_counters_rotational_drift() {
        // Forward + counter-clockwise rotation: the corrected command gains
        // a small negative lateral component to cancel the arc drift.
        let out = discretize(ChassisSpeeds::new(3.0, 0.0, 2.0), PERIOD);
        assert!(out.vy < 0.0);
        assert!(out.vx > 0.0);
    }

    #[test]
    fn test_discretize_integral_reaches_intended_delta() {
        // Integrate the corrected command as a constant twist over dt and
        // check it lands on the pose delta of the raw command.
        let raw = ChassisSpeeds::new(2.0, 1.0, 3.0);
        let dt = 0.1;
        let out = discretize(raw, dt);

        // Pose exponential of the constant twist (out.vx*dt, out.vy*dt, theta)
        let theta = out.omega * dt;
        let (sin, cos) = theta.sin_cos();
        let (s, c) = ((sin / theta), ((1.0 - cos) / theta));
        let dx = out.vx * dt * s - out.vy * dt * c;
        let dy = out.vx * dt * c + out.vy * dt * s;

        assert!((dx - raw.vx * dt).abs() < 1e-9);
        assert!((dy - raw.vy * dt).abs() < 1e-9);
    }

    #[test]
    fn test_skew_correction_noop_without_rotation() {
        let speeds = ChassisSpeeds::new(1.5, -0.5, 0.0);
        let out = correct_for_skew(speeds, PERIOD);
        assert_eq!(out, speeds);
    }

    #[test]
    fn test_skew_correction_counter_rotates_translation() {
        let out = correct_for_skew(ChassisSpeeds::new(2.0, 0.0, 2.0), PERIOD);
        // Magnitude preserved, direction rotated by -omega * period / 2
        assert!((out.vx.hypot(out.vy) - 2.0).abs() < EPS);
        assert!(out.vy < 0.0);
        assert!((out.omega - 2.0).abs() < EPS);
    }
}
