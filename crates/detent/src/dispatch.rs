//! Routes device pulses to the actions bound to them.

use crate::binds::{ActionDef, ActionHandler, BindRegistry, WheelAction};
use crate::collab::{EventContext, RenderTarget, WheelUi};
use crate::config::Mode;
use crate::haptic::HapticEngine;
use crate::pulse::{DevicePulse, Pulse, PulseKind};
use crate::wheel::{WheelController, section_for_angle};
use std::time::Instant;

/// Everything an action handler may touch.
pub struct CoreContext {
    pub registry: BindRegistry,
    pub wheel: WheelController,
    pub ui: Box<dyn WheelUi>,
    pub render: Box<dyn RenderTarget>,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Handler invocations, repeats included.
    pub invoked: usize,
    /// Dropped by the animation guard.
    pub dropped: bool,
    /// Refresh pulses produced by mode transitions, to be dispatched next.
    pub forced: Vec<DevicePulse>,
}

impl CoreContext {
    pub fn dispatch(
        &mut self,
        engine: &mut HapticEngine,
        pulse: &DevicePulse,
        now: Instant,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        if !pulse.is_virtual && self.ui.is_sections_animating() {
            log::debug!("Sections animating, dropped '{}.{}'", pulse.bind, pulse.command);
            outcome.dropped = true;
            return outcome;
        }

        let specs = self.registry.resolve(&pulse.bind, &pulse.command).to_vec();
        if specs.is_empty() {
            log::debug!("Nothing bound to '{}.{}'", pulse.bind, pulse.command);
            return outcome;
        }

        let current = self.wheel.mode();
        let Some(enriched) = enrich(engine, pulse, now) else {
            return outcome;
        };

        for spec in &specs {
            let Some(def) = self.registry.lookup_action(spec.mode, &spec.name).cloned() else {
                log::warn!("Unknown {} action '{}'", spec.mode, spec.name);
                continue;
            };
            if !spec.admits(current) {
                log::trace!(
                    "Skipped '{}': runs in {}, wheel is in {}",
                    spec.name,
                    spec.guard(),
                    current
                );
                continue;
            }
            for _ in 0..spec.invocations() {
                self.invoke(&def, pulse, &enriched, engine, &mut outcome.forced);
                outcome.invoked += 1;
            }
        }

        self.render.request_redraw();
        outcome
    }

    fn invoke(
        &mut self,
        def: &ActionDef,
        pulse: &DevicePulse,
        enriched: &Pulse,
        engine: &mut HapticEngine,
        forced: &mut Vec<DevicePulse>,
    ) {
        match def.handler {
            ActionHandler::Wheel(action) => self.wheel_action(action, enriched, engine, forced),
            ActionHandler::Module => {
                let section = self.ui.current_selection();
                let ctx = EventContext {
                    call: &def.name,
                    section,
                    mode: self.wheel.mode(),
                    bind: &pulse.bind,
                    command: &pulse.command,
                };
                match self.ui.module_mut(section) {
                    Some(module) => {
                        if let Err(e) = module.process_key(&ctx, enriched) {
                            log::warn!("Module '{}' failed on '{}': {:#}", module.name(), def.name, e);
                        }
                    }
                    None => log::warn!("No module in section {} for '{}'", section, def.name),
                }
            }
        }
    }

    fn wheel_action(
        &mut self,
        action: WheelAction,
        pulse: &Pulse,
        engine: &mut HapticEngine,
        forced: &mut Vec<DevicePulse>,
    ) {
        match action {
            WheelAction::Open => {
                self.ui.open();
                forced.extend(self.wheel.transition(Mode::Wheel, engine));
            }
            WheelAction::Select => {
                self.ui.select();
                let positions = self.focused_positions();
                self.wheel.set_module_positions(positions);
                forced.extend(self.wheel.transition(Mode::Module, engine));
            }
            WheelAction::Toggle => {
                let next = match self.wheel.mode() {
                    Mode::Wheel => WheelAction::Select,
                    Mode::Module => WheelAction::Open,
                };
                self.wheel_action(next, pulse, engine, forced);
            }
            WheelAction::Rotate => {
                if !pulse.click || self.wheel.mode() != Mode::Wheel {
                    return;
                }
                if let Some(section) = section_for_angle(pulse.target, self.ui.section_count()) {
                    self.ui.set_selection(section);
                    self.wheel.set_angle(pulse.target);
                }
            }
            WheelAction::Next | WheelAction::Previous => {
                let count = self.ui.section_count();
                if count == 0 {
                    return;
                }
                let current = self.ui.current_selection();
                let next = match action {
                    WheelAction::Next => (current + 1) % count,
                    _ => (current + count - 1) % count,
                };
                self.ui.set_selection(next);
                self.follow_selection(current, engine, forced);
            }
            WheelAction::QuickSwitch => {
                let current = self.ui.current_selection();
                self.ui.quick_switch(pulse);
                self.follow_selection(current, engine, forced);
            }
        }
    }

    fn focused_positions(&mut self) -> Option<usize> {
        let section = self.ui.current_selection();
        self.ui.module_mut(section).and_then(|m| m.positions())
    }

    /// Brings the chooser angle, focus and engine along after a selection
    /// change that did not come from rotation.
    fn follow_selection(
        &mut self,
        previous: usize,
        engine: &mut HapticEngine,
        forced: &mut Vec<DevicePulse>,
    ) {
        let section = self.ui.current_selection();
        if section == previous {
            return;
        }
        self.wheel.follow_selection(section, self.ui.section_count());
        if self.wheel.mode() == Mode::Module {
            self.ui.select();
        }
        let positions = self.focused_positions();
        forced.extend(self.wheel.refocus(positions, engine));
    }
}

/// Builds the handler-facing pulse. Hardware rotary pulses enter the haptic engine here.
fn enrich(engine: &mut HapticEngine, pulse: &DevicePulse, now: Instant) -> Option<Pulse> {
    if pulse.is_virtual {
        let Some(meta) = engine.meta(&pulse.bind) else {
            log::error!("Virtual pulse from '{}' has no haptic slot", pulse.bind);
            return None;
        };
        return Some(Pulse {
            kind: PulseKind::Encoder,
            direction: pulse.direction,
            click: pulse.detent,
            step: meta.step,
            target: meta.target,
            velocity: meta.acceleration,
            is_virtual: true,
        });
    }

    match pulse.kind {
        PulseKind::Button => Some(Pulse::default()),
        PulseKind::Encoder => engine.ingress(pulse, now).map(|meta| Pulse {
            kind: PulseKind::Encoder,
            direction: pulse.direction,
            click: false,
            step: meta.step,
            target: meta.target,
            velocity: meta.acceleration,
            is_virtual: false,
        }),
    }
}
