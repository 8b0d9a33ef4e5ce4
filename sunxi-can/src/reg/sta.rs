//! Status register (`STA`)

use bitfield::bitfield;

bitfield! {
    /// Controller status, including the capture fields of the last bus error
    /// and the last lost arbitration.
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct Status(u32);
    impl Debug;

    /// At least one received frame is waiting in the receive buffer
    pub rx_ready, set_rx_ready: 0;
    /// A received frame was lost
    pub data_overrun, set_data_overrun: 1;
    /// The transmit buffer may be written
    pub tx_ready, set_tx_ready: 2;
    /// The last requested transmission completed
    pub tx_complete, set_tx_complete: 3;
    /// Receiving a frame
    pub receiving, set_receiving: 4;
    /// Transmitting a frame
    pub transmitting, set_transmitting: 5;
    /// At least one error counter reached the warning limit
    pub error, set_error: 6;
    /// The controller is bus-off
    pub bus_off, set_bus_off: 7;
    /// Bit position at which arbitration was lost
    pub u8, arbitration_lost_bit, set_arbitration_lost_bit: 12, 8;
    /// Frame segment in which the last bus error occurred
    pub u8, error_segment, set_error_segment: 20, 16;
    /// The last bus error occurred while receiving
    pub error_in_reception, set_error_in_reception: 21;
    /// Type of the last bus error
    pub u8, error_code, set_error_code: 23, 22;
}

/// Values of [`Status::error_code`]
pub mod error_code {
    /// Bit error
    pub const BIT: u8 = 0;
    /// Form error
    pub const FORM: u8 = 1;
    /// Stuff error
    pub const STUFF: u8 = 2;
    /// Any other error
    pub const OTHER: u8 = 3;
}
