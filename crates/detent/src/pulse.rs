use derive_more::{AsRef, Deref, Display, From, Into};
use detentctl::wire::{DeviceName, Turn};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

/// Stable identifier of one input device, the "bind" of the configuration.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    Deref,
    From,
    Into,
    AsRef,
)]
#[serde(transparent)]
pub struct DeviceId(String);

detentctl::impl_string_newtype!(DeviceId);

impl From<DeviceName> for DeviceId {
    fn from(name: DeviceName) -> Self {
        Self(name.into())
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PulseKind {
    #[default]
    Button,
    Encoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

impl From<Turn> for Direction {
    fn from(turn: Turn) -> Self {
        match turn {
            Turn::Up => Self::Up,
            Turn::Down => Self::Down,
        }
    }
}

/// A normalised device event.
///
/// Equality and hashing only look at `bind`: two pulses are "the same" when they come
/// from the same physical device. The haptic engine relies on this to keep one
/// canonical pulse per rotary. `Borrow<DeviceId>` keeps lookups by id consistent with
/// that identity.
#[derive(Debug, Clone)]
pub struct DevicePulse {
    pub bind: DeviceId,
    pub command: String,
    pub kind: PulseKind,
    pub direction: Option<Direction>,
    pub is_virtual: bool,
    pub detent: bool,
}

impl DevicePulse {
    pub fn button(bind: DeviceId, command: impl Into<String>) -> Self {
        Self {
            bind,
            command: command.into(),
            kind: PulseKind::Button,
            direction: None,
            is_virtual: false,
            detent: false,
        }
    }

    pub fn encoder(bind: DeviceId, command: impl Into<String>, direction: Direction) -> Self {
        Self {
            bind,
            command: command.into(),
            kind: PulseKind::Encoder,
            direction: Some(direction),
            is_virtual: false,
            detent: false,
        }
    }

    /// Copy of this pulse as emitted by the engine tick.
    pub fn to_virtual(&self, detent: bool) -> Self {
        Self {
            kind: PulseKind::Encoder,
            is_virtual: true,
            detent,
            ..self.clone()
        }
    }
}

impl PartialEq for DevicePulse {
    fn eq(&self, other: &Self) -> bool {
        self.bind == other.bind
    }
}

impl Eq for DevicePulse {}

impl Hash for DevicePulse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bind.hash(state);
    }
}

impl Borrow<DeviceId> for DevicePulse {
    fn borrow(&self) -> &DeviceId {
        &self.bind
    }
}

/// What action handlers see.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pulse {
    pub kind: PulseKind,
    pub direction: Option<Direction>,
    /// A detent was crossed on this tick.
    pub click: bool,
    pub step: f64,
    pub target: f64,
    pub velocity: f64,
    pub is_virtual: bool,
}
