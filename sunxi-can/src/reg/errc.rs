//! Error counter register (`ERRC`)

use bitfield::bitfield;

bitfield! {
    /// Transmit and receive error counters
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ErrorCounterRegister(u32);
    impl Debug;

    /// Transmit error counter
    pub u8, tx, set_tx: 7, 0;
    /// Receive error counter
    pub u8, rx, set_rx: 23, 16;
}
