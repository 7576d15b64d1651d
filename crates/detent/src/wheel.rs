use crate::config::Mode;
use crate::haptic::{HapticEngine, spacing};
use crate::pulse::DevicePulse;

/// Angle in degrees of section `index` on a ring of `count` sections.
pub fn section_angle(index: usize, count: usize) -> f64 {
    index as f64 * spacing(count)
}

/// Signed shortest turn from `b` to `a`, in `[-180, 180)`.
pub fn signed_angle_difference(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

pub fn angle_difference(a: f64, b: f64) -> f64 {
    signed_angle_difference(a, b).abs()
}

pub fn section_for_angle(angle: f64, count: usize) -> Option<usize> {
    (0..count).min_by(|&a, &b| {
        angle_difference(angle, section_angle(a, count))
            .total_cmp(&angle_difference(angle, section_angle(b, count)))
    })
}

/// Coarse mode of the wheel and the detent count of each mode.
#[derive(Debug, Clone)]
pub struct WheelController {
    mode: Mode,
    angle: f64,
    n_wheel: usize,
    n_module_default: usize,
    n_module: usize,
}

impl WheelController {
    pub fn new(n_wheel: usize, n_module: usize) -> Self {
        Self {
            mode: Mode::Wheel,
            angle: 0.0,
            n_wheel: n_wheel.max(1),
            n_module_default: n_module.max(1),
            n_module: n_module.max(1),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Unwrapped chooser angle. Rotaries return here when the wheel reopens.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
    }

    pub fn n_wheel(&self) -> usize {
        self.n_wheel
    }

    pub fn n_module(&self) -> usize {
        self.n_module
    }

    pub fn n_module_default(&self) -> usize {
        self.n_module_default
    }

    pub fn n_positions(&self) -> usize {
        match self.mode {
            Mode::Wheel => self.n_wheel,
            Mode::Module => self.n_module,
        }
    }

    /// Detent count for the next module focus. `None` falls back to the configured default.
    pub fn set_module_positions(&mut self, positions: Option<usize>) {
        self.n_module = positions.unwrap_or(self.n_module_default).max(1);
    }

    /// Turns the chooser angle the short way round onto section `index`.
    pub fn follow_selection(&mut self, index: usize, count: usize) {
        self.angle += signed_angle_difference(section_angle(index, count), self.angle);
    }

    /// Switches mode, parks the engine on the new detent ring and returns the
    /// forced refresh pulses. Staying in the same mode does nothing.
    pub fn transition(&mut self, to: Mode, engine: &mut HapticEngine) -> Vec<DevicePulse> {
        if to == self.mode {
            return Vec::new();
        }
        log::debug!("Wheel mode {} -> {}", self.mode, to);
        if to == Mode::Wheel {
            engine.set_saved_angle(Mode::Wheel, self.angle);
        }
        self.mode = to;
        engine.reset_on_mode_change(to, self.n_positions());
        if to == Mode::Module {
            self.angle = engine.saved_angle(Mode::Wheel);
        }
        engine.force_cycle()
    }

    /// Re-parks the engine after the selection moved without rotation. In
    /// `Wheel` mode rotaries jump to the chooser angle. In `Module` mode the
    /// newly focused module's detent ring replaces the old one.
    pub fn refocus(
        &mut self,
        positions: Option<usize>,
        engine: &mut HapticEngine,
    ) -> Vec<DevicePulse> {
        match self.mode {
            Mode::Wheel => engine.park(self.angle),
            Mode::Module => {
                self.set_module_positions(positions);
                engine.reset_on_mode_change(Mode::Module, self.n_module);
            }
        }
        engine.force_cycle()
    }
}
