// Per-module actuation boundary and the four-module dispatcher.

use super::geometry::Angle;
use super::kinematics::{MODULE_COUNT, ModuleState};

/// Cumulative odometry reading for one module: steer angle and total driven
/// distance at one sample instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModulePosition {
    pub angle: Angle,
    pub distance: f64, // meters
}

/// Capability boundary of one steerable wheel unit. The wire protocol behind
/// it belongs to the hardware layer; the simulator and the tests provide
/// in-memory implementations.
pub trait ModuleIo {
    /// Command a steer angle and wheel speed. `open_loop` selects direct
    /// duty-cycle drive instead of the onboard velocity loop.
    fn set_target(&mut self, angle: Angle, speed: f64, open_loop: bool);

    /// Zero wheel speed while holding the current steer angle.
    fn stop(&mut self);

    fn measured_state(&self) -> ModuleState;

    /// Drain the odometry positions buffered by the sampling thread since
    /// the previous call, oldest first. Snapshot-and-clear: a second call in
    /// the same tick returns an empty vec.
    fn drain_odometry_positions(&mut self) -> Vec<ModulePosition>;
}

/// Applies per-module targets and the session operating mode uniformly to
/// the four modules, and snapshots current/target states for telemetry.
#[derive(Debug)]
pub struct ModuleDispatcher<M> {
    modules: [M; MODULE_COUNT],
    open_loop: bool,
    targets: [ModuleState; MODULE_COUNT],
}

impl<M: ModuleIo> ModuleDispatcher<M> {
    pub fn new(modules: [M; MODULE_COUNT]) -> Self {
        Self {
            modules,
            open_loop: true,
            targets: [ModuleState::default(); MODULE_COUNT],
        }
    }

    /// Session-wide operating mode, applied before the first command of a
    /// new drive session.
    pub fn set_operating_mode(&mut self, open_loop: bool) {
        self.open_loop = open_loop;
    }

    pub fn set_targets(&mut self, states: [ModuleState; MODULE_COUNT]) {
        for (module, state) in self.modules.iter_mut().zip(&states) {
            module.set_target(state.angle, state.speed, self.open_loop);
        }
        self.targets = states;
    }

    /// Stop all modules without steering them: target speeds go to zero,
    /// target angles keep their last commanded value.
    pub fn stop(&mut self) {
        for module in &mut self.modules {
            module.stop();
        }
        for target in &mut self.targets {
            target.speed = 0.0;
        }
    }

    pub fn measured_states(&self) -> [ModuleState; MODULE_COUNT] {
        core::array::from_fn(|i| self.modules[i].measured_state())
    }

    pub fn target_states(&self) -> [ModuleState; MODULE_COUNT] {
        self.targets
    }

    pub fn modules_mut(&mut self) -> &mut [M; MODULE_COUNT] {
        &mut self.modules
    }
}
