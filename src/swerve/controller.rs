// Closed-loop controllers for the pose-hold and heading-hold drive modes.
// One shared PID primitive; the heading wrapper adds shortest-angular-path
// error, the position wrapper works in plain meters.

use super::geometry::Angle;

/// Gains and output clamp for one PID instance.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Symmetric output clamp. Keeps a runaway axis from eating the whole
    /// chassis speed budget.
    pub max_output: f64,
}

/// Scalar PID over a precomputed error, output clamped to +-max_output.
#[derive(Debug)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: Option<f64>,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// Clears the integrator and the previous-error sample. Called whenever
    /// a new drive session starts so stale state never leaks across modes.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn calculate(&mut self, error: f64, dt: f64) -> f64 {
        self.integral += error * dt;
        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let output = self.gains.kp * error
            + self.gains.ki * self.integral
            + self.gains.kd * derivative;
        output.clamp(-self.gains.max_output, self.gains.max_output)
    }
}

/// Heading hold: angular error via shortest signed distance (wraps at
/// +-180 degrees), output in rad/s.
#[derive(Debug)]
pub struct HeadingController {
    pid: Pid,
}

impl HeadingController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            pid: Pid::new(gains),
        }
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }

    pub fn calculate(&mut self, measured: Angle, target: Angle, dt: f64) -> f64 {
        self.pid.calculate(measured.distance_to(target), dt)
    }
}

/// Translation hold on a single axis, meters in, m/s out.
#[derive(Debug)]
pub struct PositionController {
    pid: Pid,
}

impl PositionController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            pid: Pid::new(gains),
        }
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }

    pub fn calculate(&mut self, measured: f64, target: f64, dt: f64) -> f64 {
        self.pid.calculate(target - measured, dt)
    }
}
