//! Command register (`CMD`)

/// A one-shot command. Each command is a single bit of the register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start transmitting the transmit buffer
    TransmitRequest = 0,
    /// Abort a pending transmission
    AbortRequest = 1,
    /// Hand the current receive buffer back to the controller
    ReleaseReceiveBuffer = 2,
    /// Clear the data overrun status
    ClearDataOverrun = 3,
    /// Transmit and receive the frame simultaneously
    SelfReceiveRequest = 4,
}

impl From<Command> for u32 {
    fn from(x: Command) -> Self {
        1 << x as u32
    }
}
