use crate::pulse::DeviceId;
use detentctl::wire::{InputLine, RawEvent};

#[derive(Debug, Clone)]
pub enum CoreEvent {
    Input { device: DeviceId, event: RawEvent },
    ConfigReload,
    AdapterLost { adapter: String, reason: String },
}

impl From<InputLine> for CoreEvent {
    fn from(line: InputLine) -> Self {
        Self::Input {
            device: line.device.into(),
            event: line.event,
        }
    }
}
