//! Click-only button (no separate press/release), e.g. a debounced GPIO pulse.

use crate::timer::Timer;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickState {
    Unpressed,
    DoublePre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickSignal {
    Click = 0,
    DoubleClick = 1,
}

#[derive(Debug, Clone)]
pub struct ClickButton {
    state: ClickState,
    timer: Timer,
}

impl ClickButton {
    pub fn new(threshold: Duration) -> Self {
        Self {
            state: ClickState::Unpressed,
            timer: Timer::single_shot(threshold),
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn click(&mut self, now: Instant) -> Option<ClickSignal> {
        match self.state {
            ClickState::Unpressed => {
                self.state = ClickState::DoublePre;
                self.timer.start(now);
                None
            }
            ClickState::DoublePre => {
                self.timer.stop();
                self.state = ClickState::Unpressed;
                Some(ClickSignal::DoubleClick)
            }
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<ClickSignal> {
        if !self.timer.fire(now) {
            return None;
        }
        (self.state == ClickState::DoublePre).then(|| {
            self.state = ClickState::Unpressed;
            ClickSignal::Click
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_click_waits_for_threshold() {
        let t0 = Instant::now();
        let mut button = ClickButton::new(Duration::from_millis(250));

        assert_eq!(button.click(t0), None);
        assert_eq!(button.poll(t0 + Duration::from_millis(200)), None);
        assert_eq!(
            button.poll(t0 + Duration::from_millis(250)),
            Some(ClickSignal::Click)
        );
        assert_eq!(button.state(), ClickState::Unpressed);
    }

    #[test]
    fn test_double_click() {
        let t0 = Instant::now();
        let mut button = ClickButton::new(Duration::from_millis(250));

        assert_eq!(button.click(t0), None);
        assert_eq!(
            button.click(t0 + Duration::from_millis(100)),
            Some(ClickSignal::DoubleClick)
        );
        assert_eq!(button.deadline(), None);
        assert_eq!(button.poll(t0 + Duration::from_millis(1000)), None);
    }
}
