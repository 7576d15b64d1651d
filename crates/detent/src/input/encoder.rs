use super::button::RotationLayer;
use crate::pulse::{DeviceId, Direction};

/// Rotary encoder, optionally linked to a press-release button so that
/// press-and-turn selects a different command family.
#[derive(Debug, Clone)]
pub struct RotaryEncoder {
    pub linked: Option<DeviceId>,
}

impl RotaryEncoder {
    pub fn new(linked: Option<DeviceId>) -> Self {
        Self { linked }
    }

    /// Index into the encoder's six commands:
    /// up, down, click up, click down, double up, double down.
    pub fn signal(layer: RotationLayer, direction: Direction) -> usize {
        let base = match layer {
            RotationLayer::Plain => 0,
            RotationLayer::Click => 2,
            RotationLayer::Double => 4,
        };
        match direction {
            Direction::Up => base,
            Direction::Down => base + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_indices() {
        assert_eq!(RotaryEncoder::signal(RotationLayer::Plain, Direction::Up), 0);
        assert_eq!(RotaryEncoder::signal(RotationLayer::Plain, Direction::Down), 1);
        assert_eq!(RotaryEncoder::signal(RotationLayer::Click, Direction::Up), 2);
        assert_eq!(RotaryEncoder::signal(RotationLayer::Click, Direction::Down), 3);
        assert_eq!(RotaryEncoder::signal(RotationLayer::Double, Direction::Up), 4);
        assert_eq!(RotaryEncoder::signal(RotationLayer::Double, Direction::Down), 5);
    }
}
