//! The input-to-action pipeline: normaliser, haptic engine and dispatcher on one loop.

use crate::binds::BindRegistry;
use crate::collab::{RenderTarget, WheelUi};
use crate::config::{Config, ConfigError, Mode};
use crate::dispatch::{CoreContext, DispatchOutcome};
use crate::haptic::{HapticEngine, HapticParams};
use crate::input::InputNormaliser;
use crate::pulse::{DeviceId, DevicePulse};
use crate::timer;
use crate::wheel::WheelController;
use detentctl::wire::RawEvent;
use std::collections::VecDeque;
use std::time::Instant;

pub struct Core {
    ctx: CoreContext,
    normaliser: InputNormaliser,
    engine: HapticEngine,
    pending: VecDeque<DevicePulse>,
}

impl Core {
    pub fn new(
        config: &Config,
        ui: Box<dyn WheelUi>,
        render: Box<dyn RenderTarget>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = BindRegistry::from_config(config)?;
        let normaliser = InputNormaliser::from_config(config)?;
        warn_orphan_binds(&registry, &normaliser);

        let wheel = WheelController::new(
            config.wheel_positions(),
            config.acceleration.module_sections,
        );
        let engine = HapticEngine::new(
            HapticParams::from(&config.acceleration),
            wheel.mode(),
            wheel.n_positions(),
        );

        Ok(Self {
            ctx: CoreContext {
                registry,
                wheel,
                ui,
                render,
            },
            normaliser,
            engine,
            pending: VecDeque::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.ctx.wheel.mode()
    }

    pub fn engine(&self) -> &HapticEngine {
        &self.engine
    }

    pub fn wheel(&self) -> &WheelController {
        &self.ctx.wheel
    }

    pub fn handle_input(&mut self, device: &DeviceId, event: &RawEvent, now: Instant) {
        let pulses = self.normaliser.handle(device, event, now);
        self.run(pulses, now);
    }

    /// Fires every timer due at `now`: deferred clicks first, then engine ticks in order.
    pub fn on_timers(&mut self, now: Instant) {
        let pulses = self.normaliser.poll_timers(now);
        self.run(pulses, now);

        while self.engine.tick_due(now) {
            let pulses = self.engine.tick();
            self.run(pulses, now);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        timer::earliest([self.normaliser.next_deadline(), self.engine.next_deadline()])
    }

    /// Dispatches one pulse and whatever refresh pulses it triggers.
    pub fn dispatch(&mut self, pulse: DevicePulse, now: Instant) -> DispatchOutcome {
        let outcome = self.ctx.dispatch(&mut self.engine, &pulse, now);
        self.run(outcome.forced.iter().cloned(), now);
        outcome
    }

    fn run(&mut self, pulses: impl IntoIterator<Item = DevicePulse>, now: Instant) {
        self.pending.extend(pulses);
        while let Some(pulse) = self.pending.pop_front() {
            let outcome = self.ctx.dispatch(&mut self.engine, &pulse, now);
            // refresh pulses run before anything queued behind the pulse that caused them
            for forced in outcome.forced.into_iter().rev() {
                self.pending.push_front(forced);
            }
        }
    }

    /// Swaps in bindings, devices and tunables from `config`. Nothing changes when
    /// it fails validation.
    pub fn reload(&mut self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let registry = BindRegistry::from_config(config)?;
        let normaliser = InputNormaliser::from_config(config)?;
        warn_orphan_binds(&registry, &normaliser);

        let wheel = &self.ctx.wheel;
        if config.wheel_positions() != wheel.n_wheel()
            || config.acceleration.module_sections != wheel.n_module_default()
        {
            log::warn!("Detent counts changed; they take effect after a restart");
        }

        self.ctx.registry = registry;
        self.normaliser = normaliser;
        self.engine.set_params(HapticParams::from(&config.acceleration));
        log::info!("Configuration reloaded");
        Ok(())
    }
}

fn warn_orphan_binds(registry: &BindRegistry, normaliser: &InputNormaliser) {
    for bind in registry.devices().filter(|b| !normaliser.contains(b)) {
        log::warn!("Actions are bound to '{}', which is not a configured device", bind);
    }
}
