//! Shared context between the conversion handler and the command loop.
//!
//! Both cells are single machine words written only by the foreground command
//! interpreter and read only by the conversion-complete handler. Each access is
//! one atomic load or store, so neither side ever observes a torn value and no
//! lock is held across the boundary.

use portable_atomic::{AtomicBool, AtomicI32, Ordering};

use crate::config::DEFAULT_CALIBRATION_OFFSET;

/// Streaming flag and calibration offset shared across execution contexts.
#[derive(Debug)]
pub struct SharedState {
    streaming: AtomicBool,
    offset: AtomicI32,
}

/// Point-in-time copy of [`SharedState`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SharedSnapshot {
    pub streaming: bool,
    pub calibration_offset: i32,
}

impl SharedState {
    /// Streaming enabled, offset at [`DEFAULT_CALIBRATION_OFFSET`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_values(true, DEFAULT_CALIBRATION_OFFSET)
    }

    #[must_use]
    pub const fn with_values(streaming: bool, calibration_offset: i32) -> Self {
        Self {
            streaming: AtomicBool::new(streaming),
            offset: AtomicI32::new(calibration_offset),
        }
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    pub fn set_streaming(&self, enabled: bool) {
        self.streaming.store(enabled, Ordering::Relaxed);
    }

    pub fn calibration_offset(&self) -> i32 {
        self.offset.load(Ordering::Relaxed)
    }

    pub fn set_calibration_offset(&self, offset: i32) {
        self.offset.store(offset, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        SharedSnapshot {
            streaming: self.streaming_enabled(),
            calibration_offset: self.calibration_offset(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static STATE: SharedState = SharedState::new();

    #[test]
    fn startup_defaults() {
        let state = SharedState::new();
        assert_eq!(
            state.snapshot(),
            SharedSnapshot {
                streaming: true,
                calibration_offset: -50,
            }
        );
    }

    #[test]
    fn static_state_is_usable_through_shared_references() {
        let reader: &'static SharedState = &STATE;
        STATE.set_calibration_offset(12);
        STATE.set_streaming(false);

        assert_eq!(reader.calibration_offset(), 12);
        assert!(!reader.streaming_enabled());
    }
}
