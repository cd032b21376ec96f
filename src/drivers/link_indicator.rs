//! Non-blocking blink driver for the status LED.
//!
//! The main loop calls [`LinkIndicator::tick`] every iteration; a blink
//! request only arms a counter of half-transitions, so nothing here ever
//! sleeps.
//!
//! | Pattern  | Meaning                     |
//! |----------|-----------------------------|
//! | 1 blink  | telemetry delivered         |
//! | 3 blinks | telemetry delivery failed   |

use embedded_hal::digital::OutputPin;

/// Minimum time between two output toggles.
pub const BLINK_INTERVAL_MS: u64 = 100;

pub const BLINKS_SUCCESS: u8 = 1;
pub const BLINKS_FAILURE: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    pub remaining_half_transitions: u16,
    pub last_toggle_ms: u64,
    pub level: bool,
}

pub struct LinkIndicator<P> {
    pin: P,
    state: IndicatorState,
}

impl<P: OutputPin> LinkIndicator<P> {
    /// Take ownership of `pin` and drive it low.
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self {
            pin,
            state: IndicatorState::default(),
        }
    }

    /// Arm `count` blinks (2 × `count` half-transitions) starting with the
    /// output high. Replaces any sequence still in progress.
    pub fn request_blink(&mut self, count: u8, now_ms: u64) {
        if count == 0 {
            self.state.remaining_half_transitions = 0;
            self.drive(false);
            return;
        }
        self.state.remaining_half_transitions = u16::from(count) * 2;
        self.state.last_toggle_ms = now_ms;
        self.drive(true);
    }

    /// Advance the pattern; call every loop iteration.
    pub fn tick(&mut self, now_ms: u64) {
        if self.state.remaining_half_transitions == 0 {
            return;
        }
        if now_ms.saturating_sub(self.state.last_toggle_ms) < BLINK_INTERVAL_MS {
            return;
        }

        self.state.last_toggle_ms = now_ms;
        self.state.remaining_half_transitions -= 1;
        if self.state.remaining_half_transitions == 0 {
            self.drive(false);
        } else {
            self.drive(!self.state.level);
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.remaining_half_transitions > 0
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }

    fn drive(&mut self, high: bool) {
        // The LED is advisory; a failed write is not worth surfacing.
        let _ = if high { self.pin.set_high() } else { self.pin.set_low() };
        self.state.level = high;
    }
}
