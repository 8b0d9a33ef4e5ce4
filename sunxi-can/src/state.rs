//! Controller fault-confinement state

use core::sync::atomic::{AtomicU8, Ordering};

/// State of the controller as tracked by the driver
///
/// `Stopped` is entered whenever the controller is put in reset mode and
/// `ErrorActive` whenever it returns to normal mode. In between, only the
/// interrupt dispatcher moves the state along the fault-confinement ladder.
/// `BusOff` sticks until the controller is restarted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ControllerState {
    /// In reset mode, not participating on the bus
    Stopped = 0,
    /// Both error counters below 96
    ErrorActive = 1,
    /// At least one error counter reached the warning limit
    ErrorWarning = 2,
    /// At least one error counter reached 128
    ErrorPassive = 3,
    /// Transmit error counter exceeded 255
    BusOff = 4,
}

impl ControllerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::ErrorActive,
            2 => Self::ErrorWarning,
            3 => Self::ErrorPassive,
            4 => Self::BusOff,
            _ => Self::Stopped,
        }
    }
}

/// Snapshot cell shared by the interrupt and the caller context
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ControllerState::Stopped as u8))
    }

    pub(crate) fn get(&self) -> ControllerState {
        ControllerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ControllerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
