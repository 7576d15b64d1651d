//! Press-release button with press-and-hold, click and double-click detection.

use crate::timer::Timer;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Up,
    DownPre,
    /// Held while a linked encoder turned; release is silent.
    Down,
    ClickPre,
    DoublePre,
    /// Second press held while a linked encoder turned.
    Double,
}

/// Index into the button's command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSignal {
    Press = 0,
    Click = 1,
    DoubleClick = 2,
}

/// Which command family a turn of a linked encoder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationLayer {
    Plain,
    Click,
    Double,
}

#[derive(Debug, Clone)]
pub struct PressReleaseButton {
    state: ButtonState,
    timer: Timer,
}

impl PressReleaseButton {
    pub fn new(threshold: Duration) -> Self {
        Self {
            state: ButtonState::Up,
            timer: Timer::single_shot(threshold),
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn press_down(&mut self) -> Option<ButtonSignal> {
        match self.state {
            ButtonState::Up => {
                self.state = ButtonState::DownPre;
                Some(ButtonSignal::Press)
            }
            ButtonState::ClickPre => {
                self.timer.stop();
                self.state = ButtonState::DoublePre;
                Some(ButtonSignal::Press)
            }
            _ => None,
        }
    }

    pub fn press_up(&mut self, now: Instant) -> Option<ButtonSignal> {
        match self.state {
            ButtonState::DownPre => {
                self.state = ButtonState::ClickPre;
                self.timer.start(now);
                None
            }
            ButtonState::DoublePre => {
                self.state = ButtonState::Up;
                Some(ButtonSignal::DoubleClick)
            }
            _ => {
                self.timer.stop();
                self.state = ButtonState::Up;
                None
            }
        }
    }

    /// Emits the deferred single click once the double-click window has passed.
    pub fn poll(&mut self, now: Instant) -> Option<ButtonSignal> {
        if !self.timer.fire(now) {
            return None;
        }
        (self.state == ButtonState::ClickPre).then(|| {
            self.state = ButtonState::Up;
            ButtonSignal::Click
        })
    }

    /// A linked encoder turned: cancel whatever click is pending and report which
    /// command family the turn belongs to.
    pub fn rotate(&mut self) -> RotationLayer {
        self.timer.stop();
        match self.state {
            ButtonState::Up | ButtonState::ClickPre => {
                self.state = ButtonState::Up;
                RotationLayer::Plain
            }
            ButtonState::DownPre | ButtonState::Down => {
                self.state = ButtonState::Down;
                RotationLayer::Click
            }
            ButtonState::DoublePre | ButtonState::Double => {
                self.state = ButtonState::Double;
                RotationLayer::Double
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(300);

    fn ms(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    #[test]
    fn test_simple_click() {
        let t0 = Instant::now();
        let mut button = PressReleaseButton::new(THRESHOLD);

        assert_eq!(button.press_down(), Some(ButtonSignal::Press));
        assert_eq!(button.press_up(ms(t0, 50)), None);
        assert_eq!(button.state(), ButtonState::ClickPre);
        assert_eq!(button.deadline(), Some(ms(t0, 350)));

        assert_eq!(button.poll(ms(t0, 349)), None);
        assert_eq!(button.poll(ms(t0, 350)), Some(ButtonSignal::Click));
        assert_eq!(button.state(), ButtonState::Up);
        assert_eq!(button.poll(ms(t0, 2000)), None);
    }

    #[test]
    fn test_double_click_suppresses_click() {
        let t0 = Instant::now();
        let mut button = PressReleaseButton::new(THRESHOLD);
        let mut emitted = Vec::new();

        emitted.extend(button.press_down());
        emitted.extend(button.press_up(ms(t0, 40)));
        emitted.extend(button.press_down());
        emitted.extend(button.press_up(ms(t0, 200)));
        for t in (200..=1000).step_by(10) {
            emitted.extend(button.poll(ms(t0, t)));
        }

        assert_eq!(
            emitted,
            [
                ButtonSignal::Press,
                ButtonSignal::Press,
                ButtonSignal::DoubleClick
            ]
        );
        assert_eq!(button.deadline(), None);
    }

    #[test]
    fn test_slow_second_press_is_two_clicks() {
        let t0 = Instant::now();
        let mut button = PressReleaseButton::new(THRESHOLD);
        let mut emitted = Vec::new();

        emitted.extend(button.press_down());
        emitted.extend(button.press_up(ms(t0, 40)));
        emitted.extend(button.poll(ms(t0, 340)));
        emitted.extend(button.press_down());
        emitted.extend(button.press_up(ms(t0, 540)));
        emitted.extend(button.poll(ms(t0, 840)));

        assert_eq!(
            emitted,
            [
                ButtonSignal::Press,
                ButtonSignal::Click,
                ButtonSignal::Press,
                ButtonSignal::Click
            ]
        );
    }

    #[test]
    fn test_stray_release_resets() {
        let t0 = Instant::now();
        let mut button = PressReleaseButton::new(THRESHOLD);
        assert_eq!(button.press_up(t0), None);
        assert_eq!(button.state(), ButtonState::Up);
        assert_eq!(button.deadline(), None);
    }

    #[test]
    fn test_rotation_layers() {
        let t0 = Instant::now();

        let mut idle = PressReleaseButton::new(THRESHOLD);
        assert_eq!(idle.rotate(), RotationLayer::Plain);

        let mut held = PressReleaseButton::new(THRESHOLD);
        held.press_down();
        assert_eq!(held.rotate(), RotationLayer::Click);
        assert_eq!(held.state(), ButtonState::Down);
        assert_eq!(held.rotate(), RotationLayer::Click);
        assert_eq!(held.press_up(ms(t0, 80)), None);
        assert_eq!(held.state(), ButtonState::Up);
        assert_eq!(held.poll(ms(t0, 1000)), None);

        let mut double = PressReleaseButton::new(THRESHOLD);
        double.press_down();
        double.press_up(ms(t0, 40));
        double.press_down();
        assert_eq!(double.rotate(), RotationLayer::Double);
        assert_eq!(double.state(), ButtonState::Double);
        assert_eq!(double.press_up(ms(t0, 200)), None);
    }

    #[test]
    fn test_rotation_cancels_pending_click() {
        let t0 = Instant::now();
        let mut button = PressReleaseButton::new(THRESHOLD);
        button.press_down();
        button.press_up(ms(t0, 40));

        assert_eq!(button.rotate(), RotationLayer::Plain);
        assert_eq!(button.state(), ButtonState::Up);
        assert_eq!(button.deadline(), None);
        assert_eq!(button.poll(ms(t0, 1000)), None);
    }
}
