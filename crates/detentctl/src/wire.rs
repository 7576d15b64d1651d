//! Line protocol shared by the daemon's input adapters and `detentctl`.
//!
//! One raw device transition per line:
//!
//! ```text
//! btn1 press
//! btn1 release
//! clk1 click
//! enc1 turn up
//! kbd key space
//! ```

use derive_more::{AsRef, Deref, Display, From, Into};
use std::fmt;
use std::str::FromStr;
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

pub const SOCKET_PATH: &str = "/tmp/detent.sock";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Deref, From, Into, AsRef)]
pub struct DeviceName(String);

crate::impl_string_newtype!(DeviceName);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, StrumDisplay)]
#[strum(ascii_case_insensitive)]
pub enum Turn {
    #[strum(to_string = "up", serialize = "cw", serialize = "+")]
    Up,
    #[strum(to_string = "down", serialize = "ccw", serialize = "-")]
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawEvent {
    Press,
    Release,
    Click,
    Turn(Turn),
    Key(String),
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Press => f.write_str("press"),
            Self::Release => f.write_str("release"),
            Self::Click => f.write_str("click"),
            Self::Turn(turn) => write!(f, "turn {}", turn),
            Self::Key(key) => write!(f, "key {}", key),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("empty input line")]
    Empty,
    #[error("missing event after device '{0}'")]
    MissingEvent(String),
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid turn direction '{0}'")]
    InvalidTurn(String),
    #[error("trailing input '{0}'")]
    Trailing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub device: DeviceName,
    pub event: RawEvent,
}

impl InputLine {
    pub fn new(device: impl Into<String>, event: RawEvent) -> Self {
        Self {
            device: DeviceName::new(device),
            event,
        }
    }
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.device, self.event)
    }
}

impl FromStr for InputLine {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let device = words.next().ok_or(WireError::Empty)?;
        let verb = words
            .next()
            .ok_or_else(|| WireError::MissingEvent(device.to_string()))?;

        let event = match verb.to_ascii_lowercase().as_str() {
            "press" | "down" => RawEvent::Press,
            "release" | "up" => RawEvent::Release,
            "click" => RawEvent::Click,
            "turn" => {
                let arg = words.next().ok_or(WireError::MissingArgument("turn"))?;
                let turn = arg
                    .parse::<Turn>()
                    .map_err(|_| WireError::InvalidTurn(arg.to_string()))?;
                RawEvent::Turn(turn)
            }
            "key" => {
                let key = words.next().ok_or(WireError::MissingArgument("key"))?;
                RawEvent::Key(key.to_string())
            }
            other => return Err(WireError::UnknownEvent(other.to_string())),
        };

        if let Some(rest) = words.next() {
            return Err(WireError::Trailing(rest.to_string()));
        }

        Ok(Self::new(device, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let cases = vec![
            ("btn1 press", InputLine::new("btn1", RawEvent::Press)),
            ("btn1 RELEASE", InputLine::new("btn1", RawEvent::Release)),
            ("  clk1   click ", InputLine::new("clk1", RawEvent::Click)),
            ("enc1 turn up", InputLine::new("enc1", RawEvent::Turn(Turn::Up))),
            ("enc1 turn CCW", InputLine::new("enc1", RawEvent::Turn(Turn::Down))),
            ("kbd key space", InputLine::new("kbd", RawEvent::Key("space".into()))),
        ];

        for (line, expected) in cases {
            assert_eq!(line.parse::<InputLine>().unwrap(), expected, "{line}");
        }
    }

    #[test]
    fn test_display_parses_back() {
        let line = InputLine::new("enc1", RawEvent::Turn(Turn::Down));
        assert_eq!(line.to_string(), "enc1 turn down");
        assert_eq!(line.to_string().parse::<InputLine>().unwrap(), line);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert_eq!("".parse::<InputLine>(), Err(WireError::Empty));
        assert_eq!(
            "enc1".parse::<InputLine>(),
            Err(WireError::MissingEvent("enc1".into()))
        );
        assert_eq!(
            "enc1 turn".parse::<InputLine>(),
            Err(WireError::MissingArgument("turn"))
        );
        assert_eq!(
            "enc1 turn left".parse::<InputLine>(),
            Err(WireError::InvalidTurn("left".into()))
        );
        assert_eq!(
            "btn1 wiggle".parse::<InputLine>(),
            Err(WireError::UnknownEvent("wiggle".into()))
        );
        assert_eq!(
            "btn1 press now".parse::<InputLine>(),
            Err(WireError::Trailing("now".into()))
        );
    }
}
