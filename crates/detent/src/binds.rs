//! Read-only lookup from `(device, command)` to the actions bound to it.

use crate::config::{ActionSpec, Config, ConfigError, Mode};
use crate::pulse::DeviceId;
use std::collections::HashMap;
use strum::{Display as StrumDisplay, EnumIter, EnumString};

/// Built-in handlers for wheel-typed catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, StrumDisplay)]
pub enum WheelAction {
    #[strum(to_string = "wheelOpen")]
    Open,
    #[strum(to_string = "wheelSelect")]
    Select,
    #[strum(to_string = "wheelToggle")]
    Toggle,
    #[strum(to_string = "wheelRotate")]
    Rotate,
    #[strum(to_string = "wheelNext")]
    Next,
    #[strum(to_string = "wheelPrevious")]
    Previous,
    #[strum(to_string = "wheelQuickSwitch")]
    QuickSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHandler {
    Wheel(WheelAction),
    /// Forwarded to the selected module's `process_key`.
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub kind: Mode,
    pub name: String,
    pub handler: ActionHandler,
}

impl ActionSpec {
    /// The mode this action is allowed to run in when `check_state` is set.
    pub fn guard(&self) -> Mode {
        self.on_state.unwrap_or(self.mode)
    }

    pub fn admits(&self, current: Mode) -> bool {
        !self.check_state || self.guard() == current
    }

    pub fn invocations(&self) -> u32 {
        self.repeat.saturating_add(1)
    }
}

#[derive(Debug, Default)]
pub struct BindRegistry {
    binds: HashMap<DeviceId, HashMap<String, Vec<ActionSpec>>>,
    actions: HashMap<Mode, HashMap<String, ActionDef>>,
}

impl BindRegistry {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut registry = Self::default();

        for entry in &config.command_actions {
            let handler = match entry.kind {
                Mode::Wheel => ActionHandler::Wheel(
                    entry
                        .name
                        .parse()
                        .map_err(|_| ConfigError::UnknownWheelAction(entry.name.clone()))?,
                ),
                Mode::Module => ActionHandler::Module,
            };
            let previous = registry.actions.entry(entry.kind).or_default().insert(
                entry.name.clone(),
                ActionDef {
                    kind: entry.kind,
                    name: entry.name.clone(),
                    handler,
                },
            );
            if previous.is_some() {
                return Err(ConfigError::DuplicateAction {
                    kind: entry.kind,
                    name: entry.name.clone(),
                });
            }
        }

        for (bind, commands) in &config.command_bind {
            for cmd in commands {
                for spec in &cmd.actions {
                    if registry.lookup_action(spec.mode, &spec.name).is_none() {
                        return Err(ConfigError::UnknownAction {
                            bind: bind.clone(),
                            command: cmd.command.clone(),
                            mode: spec.mode,
                            name: spec.name.clone(),
                        });
                    }
                }
                // several entries for one command are concatenated in file order
                registry
                    .binds
                    .entry(bind.clone())
                    .or_default()
                    .entry(cmd.command.clone())
                    .or_default()
                    .extend(cmd.actions.iter().cloned());
            }
        }

        Ok(registry)
    }

    /// Actions bound to `command` on `bind`, in configuration order. Empty when unbound.
    pub fn resolve(&self, bind: &DeviceId, command: &str) -> &[ActionSpec] {
        self.binds
            .get(bind)
            .and_then(|commands| commands.get(command))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn lookup_action(&self, kind: Mode, name: &str) -> Option<&ActionDef> {
        self.actions.get(&kind).and_then(|defs| defs.get(name))
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.binds.keys()
    }
}
