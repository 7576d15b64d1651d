//! Inertial simulation of a detented wheel, one slot per rotary device.
//!
//! Hardware detents add an acceleration impulse to the device's slot. Every tick the
//! simulated angle (`step`) advances, friction and a restoring pull toward the nearest
//! detent act on it, and a virtual pulse is emitted. A pulse carries `detent = true`
//! when the nearest detent changed since the previous tick, so consumers see crisp
//! clicks while the wheel coasts.

use crate::config::{AccelerationConfig, Mode};
use crate::pulse::{DeviceId, DevicePulse, Direction};
use crate::timer::Timer;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct HapticParams {
    pub tick: Duration,
    pub click_accel: f64,
    pub max_accel: f64,
    pub friction: f64,
    pub gravity: f64,
    pub deadzone: f64,
    pub max_stop_accel: f64,
}

impl From<&AccelerationConfig> for HapticParams {
    fn from(cfg: &AccelerationConfig) -> Self {
        Self {
            tick: Duration::from_millis(cfg.pulse_refresh_time),
            click_accel: cfg.click_accel,
            max_accel: cfg.max_accel,
            friction: cfg.friction,
            gravity: cfg.gravity,
            deadzone: cfg.deadzone,
            max_stop_accel: cfg.max_stop_accel,
        }
    }
}

/// Motion state of one rotary. Angles are in degrees and unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccelerationMeta {
    pub step: f64,
    /// Always a multiple of `360 / n_positions`.
    pub target: f64,
    /// Rate applied on the latest tick.
    pub velocity: f64,
    pub acceleration: f64,
    pub max_velocity: f64,
}

impl AccelerationMeta {
    pub fn is_idle(&self) -> bool {
        self.acceleration == 0.0 && self.step == self.target
    }
}

#[derive(Debug, Clone)]
struct Slot {
    pulse: DevicePulse,
    meta: AccelerationMeta,
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn clamp_magnitude(value: f64, cap: f64) -> f64 {
    value.max(-cap).min(cap)
}

pub fn spacing(n_positions: usize) -> f64 {
    360.0 / n_positions.max(1) as f64
}

/// Advances one slot by one tick. Returns the crossing direction when the
/// nearest detent changed.
fn advance(meta: &mut AccelerationMeta, p: &HapticParams, delta: f64, dt: f64) -> Option<Direction> {
    let current = (meta.target / delta).round();
    let step = meta.step;

    let mut detent = current;
    for candidate in [current - 1.0, current + 1.0] {
        if (candidate * delta - step).abs() < (detent * delta - step).abs() {
            detent = candidate;
        }
    }
    let nearest = detent * delta;

    let direction = sign(nearest - step);
    let norm_dist = ((step - nearest).abs() / (delta / 2.0)).min(1.0);
    let settled = (step - nearest).abs() < p.deadzone;

    meta.velocity = meta.acceleration;
    meta.step += meta.acceleration * dt;

    let crossed = (detent != current).then(|| {
        if current < detent {
            Direction::Up
        } else {
            Direction::Down
        }
    });
    meta.target = nearest;

    let old_accel = meta.acceleration;
    meta.acceleration -= meta.acceleration * (1.0 - norm_dist).powi(2) * p.friction * dt;
    meta.acceleration += p.gravity * direction * (0.5 + 0.5 * (1.0 - norm_dist)) * dt;

    let reversed = old_accel * meta.acceleration < 0.0
        && (nearest - meta.step).abs() < p.deadzone
        && meta.acceleration.abs() < p.max_stop_accel;
    let at_rest = settled && old_accel.abs() < p.max_stop_accel;

    if reversed || at_rest {
        meta.acceleration = 0.0;
        meta.velocity = 0.0;
        meta.step = nearest;
    }

    crossed
}

#[derive(Debug)]
pub struct HapticEngine {
    params: HapticParams,
    slots: BTreeMap<DeviceId, Slot>,
    timer: Timer,
    mode: Mode,
    n_positions: usize,
    /// One angle per mode, shared by every rotary.
    saved_angles: [f64; 2],
}

impl HapticEngine {
    pub fn new(params: HapticParams, mode: Mode, n_positions: usize) -> Self {
        Self {
            timer: Timer::periodic(params.tick),
            params,
            slots: BTreeMap::new(),
            mode,
            n_positions: n_positions.max(1),
            saved_angles: [0.0; 2],
        }
    }

    pub fn params(&self) -> &HapticParams {
        &self.params
    }

    pub fn set_params(&mut self, params: HapticParams) {
        self.timer.set_interval(params.tick);
        for slot in self.slots.values_mut() {
            slot.meta.max_velocity = params.max_accel;
        }
        self.params = params;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn n_positions(&self) -> usize {
        self.n_positions
    }

    pub fn delta(&self) -> f64 {
        spacing(self.n_positions)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn meta(&self, bind: &DeviceId) -> Option<&AccelerationMeta> {
        self.slots.get(bind).map(|slot| &slot.meta)
    }

    pub fn saved_angle(&self, mode: Mode) -> f64 {
        self.saved_angles[mode.as_index()]
    }

    /// A hardware detent on a rotary: accumulate its impulse and make sure the
    /// tick is running. Returns the post-ingress state.
    pub fn ingress(&mut self, pulse: &DevicePulse, now: Instant) -> Option<AccelerationMeta> {
        let Some(direction) = pulse.direction else {
            log::error!("Encoder pulse from '{}' has no direction", pulse.bind);
            return None;
        };
        let impulse = direction.sign() * self.params.click_accel;

        let meta = match self.slots.entry(pulse.bind.clone()) {
            Entry::Vacant(entry) => {
                let meta = AccelerationMeta {
                    acceleration: clamp_magnitude(impulse, self.params.max_accel),
                    max_velocity: self.params.max_accel,
                    ..AccelerationMeta::default()
                };
                entry.insert(Slot {
                    pulse: pulse.clone(),
                    meta,
                });
                meta
            }
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                slot.pulse.command.clone_from(&pulse.command);
                slot.pulse.direction = Some(direction);
                slot.meta.acceleration =
                    clamp_magnitude(slot.meta.acceleration + impulse, slot.meta.max_velocity);
                slot.meta
            }
        };

        self.timer.ensure_running(now);
        Some(meta)
    }

    /// True when a tick is due; call `tick` once per true.
    pub fn tick_due(&mut self, now: Instant) -> bool {
        self.timer.fire(now)
    }

    /// Runs one simulation step for every moving slot and returns their virtual
    /// pulses. Stops the timer once nothing moves.
    pub fn tick(&mut self) -> Vec<DevicePulse> {
        let delta = self.delta();
        let dt = self.params.tick.as_secs_f64();
        let mut pulses = Vec::new();

        for slot in self.slots.values_mut() {
            if slot.meta.is_idle() {
                continue;
            }
            let crossed = advance(&mut slot.meta, &self.params, delta, dt);
            if let Some(direction) = crossed {
                slot.pulse.direction = Some(direction);
            }
            pulses.push(slot.pulse.to_virtual(crossed.is_some()));
        }

        if self.slots.values().all(|slot| slot.meta.is_idle()) {
            self.timer.stop();
        }
        pulses
    }

    /// One non-detent virtual pulse per known rotary, moving or not.
    pub fn force_cycle(&self) -> Vec<DevicePulse> {
        self.slots
            .values()
            .map(|slot| slot.pulse.to_virtual(false))
            .collect()
    }

    pub fn set_saved_angle(&mut self, mode: Mode, angle: f64) {
        self.saved_angles[mode.as_index()] = angle;
    }

    /// Parks every rotary at the angle saved for `mode` and switches the detent ring.
    pub fn reset_on_mode_change(&mut self, mode: Mode, n_positions: usize) {
        // the last slot wins when several rotaries disagree
        if let Some(slot) = self.slots.values().next_back() {
            self.saved_angles[self.mode.as_index()] = slot.meta.target;
        }

        self.mode = mode;
        self.n_positions = n_positions.max(1);
        self.park(self.saved_angles[mode.as_index()]);
    }

    /// Stops every rotary on the detent nearest `angle` and saves it for the current mode.
    pub fn park(&mut self, angle: f64) {
        let delta = self.delta();
        let angle = (angle / delta).round() * delta;
        self.saved_angles[self.mode.as_index()] = angle;

        for slot in self.slots.values_mut() {
            slot.meta.step = angle;
            slot.meta.target = angle;
            slot.meta.acceleration = 0.0;
            slot.meta.velocity = 0.0;
        }
        self.timer.stop();
    }

    #[cfg(test)]
    pub(crate) fn meta_mut(&mut self, bind: &DeviceId) -> Option<&mut AccelerationMeta> {
        self.slots.get_mut(bind).map(|slot| &mut slot.meta)
    }
}
