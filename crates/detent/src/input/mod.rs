//! Per-device state machines turning raw transitions into device pulses.

pub mod button;
pub mod click;
pub mod encoder;
pub mod keyboard;

use crate::config::{Config, ConfigError};
use crate::pulse::{DeviceId, DevicePulse, Direction};
use crate::timer;
use button::{PressReleaseButton, RotationLayer};
use click::ClickButton;
use detentctl::wire::RawEvent;
use encoder::RotaryEncoder;
use keyboard::Keyboard;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::{Duration, Instant};

pub const PRESS_RELEASE_COMMANDS: [&str; 3] = ["press", "click", "double click"];
pub const CLICK_COMMANDS: [&str; 2] = ["click", "double click"];
pub const ENCODER_COMMANDS: [&str; 6] = [
    "up",
    "down",
    "click up",
    "click down",
    "double up",
    "double down",
];

#[derive(Debug, Clone)]
enum Machine {
    PressRelease(PressReleaseButton),
    Click(ClickButton),
    Encoder(RotaryEncoder),
    Keyboard(Keyboard),
}

#[derive(Debug, Clone)]
struct Device {
    machine: Machine,
    commands: Vec<String>,
}

impl Device {
    fn button_pulse(&self, bind: &DeviceId, index: usize) -> Option<DevicePulse> {
        self.commands
            .get(index)
            .map(|command| DevicePulse::button(bind.clone(), command.clone()))
    }
}

fn command_list(
    device: &DeviceId,
    given: Option<&Vec<String>>,
    defaults: &[&str],
) -> Result<Vec<String>, ConfigError> {
    match given {
        None => Ok(defaults.iter().map(|s| s.to_string()).collect()),
        Some(list) if list.len() == defaults.len() => Ok(list.clone()),
        Some(list) => Err(ConfigError::CommandCount {
            device: device.clone(),
            expected: defaults.len(),
            found: list.len(),
        }),
    }
}

#[derive(Debug, Default)]
pub struct InputNormaliser {
    devices: BTreeMap<DeviceId, Device>,
}

impl InputNormaliser {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut normaliser = Self::default();

        for cfg in &config.prbuttons {
            let commands = command_list(&cfg.bind, cfg.commands.as_ref(), &PRESS_RELEASE_COMMANDS)?;
            let machine =
                Machine::PressRelease(PressReleaseButton::new(Duration::from_millis(cfg.threshold)));
            normaliser.insert(&cfg.bind, machine, commands)?;
        }
        for cfg in &config.clickbuttons {
            let commands = command_list(&cfg.bind, cfg.commands.as_ref(), &CLICK_COMMANDS)?;
            let machine = Machine::Click(ClickButton::new(Duration::from_millis(cfg.threshold)));
            normaliser.insert(&cfg.bind, machine, commands)?;
        }
        for cfg in &config.keyboards {
            normaliser.insert(&cfg.bind, Machine::Keyboard(Keyboard::new(&cfg.keys)), Vec::new())?;
        }
        for cfg in &config.encoders {
            if let Some(button) = &cfg.button
                && !matches!(
                    normaliser.devices.get(button).map(|d| &d.machine),
                    Some(Machine::PressRelease(_))
                )
            {
                return Err(ConfigError::UnknownLinkedButton {
                    encoder: cfg.bind.clone(),
                    button: button.clone(),
                });
            }
            let commands = command_list(&cfg.bind, cfg.commands.as_ref(), &ENCODER_COMMANDS)?;
            let machine = Machine::Encoder(RotaryEncoder::new(cfg.button.clone()));
            normaliser.insert(&cfg.bind, machine, commands)?;
        }

        Ok(normaliser)
    }

    fn insert(
        &mut self,
        bind: &DeviceId,
        machine: Machine,
        commands: Vec<String>,
    ) -> Result<(), ConfigError> {
        match self.devices.entry(bind.clone()) {
            Entry::Occupied(_) => Err(ConfigError::DuplicateDevice(bind.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Device { machine, commands });
                Ok(())
            }
        }
    }

    pub fn contains(&self, bind: &DeviceId) -> bool {
        self.devices.contains_key(bind)
    }

    /// Feeds one raw transition. Unknown devices and events a device cannot
    /// produce are logged and ignored.
    pub fn handle(&mut self, bind: &DeviceId, event: &RawEvent, now: Instant) -> Vec<DevicePulse> {
        let Some(device) = self.devices.get_mut(bind) else {
            log::warn!("Input from unknown device '{}' ignored", bind);
            return Vec::new();
        };

        let pulse = match (&mut device.machine, event) {
            (Machine::PressRelease(button), RawEvent::Press) => button
                .press_down()
                .and_then(|s| device.button_pulse(bind, s as usize)),
            (Machine::PressRelease(button), RawEvent::Release) => button
                .press_up(now)
                .and_then(|s| device.button_pulse(bind, s as usize)),
            (Machine::Click(button), RawEvent::Click) => button
                .click(now)
                .and_then(|s| device.button_pulse(bind, s as usize)),
            (Machine::Keyboard(kbd), RawEvent::Key(key)) => {
                Some(DevicePulse::button(bind.clone(), kbd.command(key)))
            }
            (Machine::Encoder(encoder), RawEvent::Turn(turn)) => {
                let linked = encoder.linked.clone();
                return self.turn(bind, linked.as_ref(), Direction::from(*turn));
            }
            (_, event) => {
                log::warn!("Device '{}' cannot produce '{}', ignored", bind, event);
                None
            }
        };

        pulse.into_iter().collect()
    }

    fn turn(
        &mut self,
        bind: &DeviceId,
        linked: Option<&DeviceId>,
        direction: Direction,
    ) -> Vec<DevicePulse> {
        let layer = match linked.and_then(|id| self.devices.get_mut(id)) {
            Some(Device {
                machine: Machine::PressRelease(button),
                ..
            }) => button.rotate(),
            Some(_) | None => {
                if let Some(id) = linked {
                    log::error!("Encoder '{}' lost its linked button '{}'", bind, id);
                }
                RotationLayer::Plain
            }
        };

        let index = RotaryEncoder::signal(layer, direction);
        self.devices
            .get(bind)
            .and_then(|d| d.commands.get(index))
            .map(|command| DevicePulse::encoder(bind.clone(), command.clone(), direction))
            .into_iter()
            .collect()
    }

    /// Expired double-click windows turn into deferred clicks.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<DevicePulse> {
        self.devices
            .iter_mut()
            .filter_map(|(bind, device)| {
                let index = match &mut device.machine {
                    Machine::PressRelease(button) => button.poll(now).map(|s| s as usize),
                    Machine::Click(button) => button.poll(now).map(|s| s as usize),
                    Machine::Encoder(_) | Machine::Keyboard(_) => None,
                }?;
                device.button_pulse(bind, index)
            })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        timer::earliest(self.devices.values().map(|d| match &d.machine {
            Machine::PressRelease(button) => button.deadline(),
            Machine::Click(button) => button.deadline(),
            Machine::Encoder(_) | Machine::Keyboard(_) => None,
        }))
    }

    #[cfg(test)]
    fn press_release_state(&self, bind: &str) -> Option<button::ButtonState> {
        match &self.devices.get(&DeviceId::new(bind))?.machine {
            Machine::PressRelease(b) => Some(b.state()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClickButtonConfig, EncoderConfig, KeyboardConfig, PressReleaseConfig};
    use crate::pulse::PulseKind;
    use detentctl::wire::Turn;

    fn config() -> Config {
        Config {
            prbuttons: vec![PressReleaseConfig {
                bind: DeviceId::new("btn1"),
                threshold: 300,
                commands: None,
            }],
            clickbuttons: vec![ClickButtonConfig {
                bind: DeviceId::new("clk1"),
                threshold: 300,
                commands: Some(vec!["tap".into(), "double tap".into()]),
            }],
            encoders: vec![EncoderConfig {
                bind: DeviceId::new("enc1"),
                button: Some(DeviceId::new("btn1")),
                commands: None,
            }],
            keyboards: vec![KeyboardConfig {
                bind: DeviceId::new("kbd"),
                keys: BTreeMap::from([("space".to_string(), "select".to_string())]),
            }],
            ..Config::default()
        }
    }

    struct Harness {
        normaliser: InputNormaliser,
        t0: Instant,
        log: Vec<(u64, String, String)>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                normaliser: InputNormaliser::from_config(&config()).unwrap(),
                t0: Instant::now(),
                log: Vec::new(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn record(&mut self, ms: u64, pulses: Vec<DevicePulse>) {
            self.log
                .extend(pulses.into_iter().map(|p| (ms, p.bind.to_string(), p.command)));
        }

        fn send(&mut self, ms: u64, bind: &str, event: RawEvent) {
            self.advance(ms);
            let pulses = self.normaliser.handle(&DeviceId::new(bind), &event, self.at(ms));
            self.record(ms, pulses);
        }

        /// Fires every timer due up to `ms`, at its own deadline.
        fn advance(&mut self, ms: u64) {
            while let Some(deadline) = self.normaliser.next_deadline() {
                if deadline > self.at(ms) {
                    break;
                }
                let at = deadline.duration_since(self.t0).as_millis() as u64;
                let pulses = self.normaliser.poll_timers(deadline);
                self.record(at, pulses);
            }
        }

        fn commands(&self) -> Vec<(u64, &str)> {
            self.log.iter().map(|(t, _, c)| (*t, c.as_str())).collect()
        }
    }

    #[test]
    fn test_simple_click_timeline() {
        let mut h = Harness::new();
        h.send(0, "btn1", RawEvent::Press);
        h.send(50, "btn1", RawEvent::Release);
        h.advance(350);
        assert_eq!(h.commands(), [(0, "press"), (350, "click")]);
    }

    #[test]
    fn test_double_click_timeline() {
        let mut h = Harness::new();
        h.send(0, "btn1", RawEvent::Press);
        h.send(40, "btn1", RawEvent::Release);
        h.send(150, "btn1", RawEvent::Press);
        h.send(200, "btn1", RawEvent::Release);
        h.advance(2000);
        assert_eq!(
            h.commands(),
            [(0, "press"), (150, "press"), (200, "double click")]
        );
    }

    #[test]
    fn test_turn_while_pressed_cancels_click() {
        let mut h = Harness::new();
        h.send(0, "btn1", RawEvent::Press);
        h.send(30, "enc1", RawEvent::Turn(Turn::Up));
        h.send(80, "btn1", RawEvent::Release);
        h.advance(2000);

        assert_eq!(h.commands(), [(0, "press"), (30, "click up")]);
        assert_eq!(h.normaliser.next_deadline(), None);
    }

    #[test]
    fn test_turn_during_click_window_is_plain() {
        let mut h = Harness::new();
        h.send(0, "btn1", RawEvent::Press);
        h.send(40, "btn1", RawEvent::Release);
        h.send(100, "enc1", RawEvent::Turn(Turn::Down));
        h.advance(2000);

        assert_eq!(h.commands(), [(0, "press"), (100, "down")]);
        assert_eq!(
            h.normaliser.press_release_state("btn1"),
            Some(button::ButtonState::Up)
        );
    }

    #[test]
    fn test_turn_on_second_press_is_double() {
        let mut h = Harness::new();
        h.send(0, "btn1", RawEvent::Press);
        h.send(40, "btn1", RawEvent::Release);
        h.send(100, "btn1", RawEvent::Press);
        h.send(120, "enc1", RawEvent::Turn(Turn::Up));
        h.send(140, "enc1", RawEvent::Turn(Turn::Down));
        h.send(200, "btn1", RawEvent::Release);
        h.advance(2000);

        assert_eq!(
            h.commands(),
            [
                (0, "press"),
                (100, "press"),
                (120, "double up"),
                (140, "double down")
            ]
        );
    }

    #[test]
    fn test_encoder_pulses_carry_direction() {
        let mut n = InputNormaliser::from_config(&config()).unwrap();
        let pulses = n.handle(
            &DeviceId::new("enc1"),
            &RawEvent::Turn(Turn::Down),
            Instant::now(),
        );
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].kind, PulseKind::Encoder);
        assert_eq!(pulses[0].direction, Some(Direction::Down));
        assert!(!pulses[0].is_virtual);
    }

    #[test]
    fn test_click_button_uses_configured_commands() {
        let mut h = Harness::new();
        h.send(0, "clk1", RawEvent::Click);
        h.advance(1000);
        h.send(1000, "clk1", RawEvent::Click);
        h.send(1100, "clk1", RawEvent::Click);
        assert_eq!(h.commands(), [(300, "tap"), (1100, "double tap")]);
    }

    #[test]
    fn test_keyboard_and_mismatched_events() {
        let mut h = Harness::new();
        h.send(0, "kbd", RawEvent::Key("space".into()));
        h.send(0, "kbd", RawEvent::Press);
        h.send(0, "btn1", RawEvent::Click);
        h.send(0, "ghost", RawEvent::Press);
        assert_eq!(h.commands(), [(0, "select")]);
    }

    #[test]
    fn test_config_errors() {
        let mut dup = config();
        dup.clickbuttons[0].bind = DeviceId::new("btn1");
        assert!(matches!(
            InputNormaliser::from_config(&dup),
            Err(ConfigError::DuplicateDevice(_))
        ));

        let mut bad_link = config();
        bad_link.encoders[0].button = Some(DeviceId::new("clk1"));
        assert!(matches!(
            InputNormaliser::from_config(&bad_link),
            Err(ConfigError::UnknownLinkedButton { .. })
        ));

        let mut short = config();
        short.encoders[0].commands = Some(vec!["up".into(), "down".into()]);
        assert!(matches!(
            InputNormaliser::from_config(&short),
            Err(ConfigError::CommandCount {
                expected: 6,
                found: 2,
                ..
            })
        ));
    }
}
