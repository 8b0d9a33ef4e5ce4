//! Transmit path
//!
//! The controller has a single transmit buffer, so at most one frame is in
//! flight. The host queue is stopped while a frame occupies the buffer and
//! woken again by the transmit interrupt.

use crate::bus::Can;
use crate::host::NetDevice;
use crate::message::{dlc_to_len, layout, CanFrame};
use crate::mode::ModeChangeTimeout;
use crate::reg::{Command, Reg, Registers, Status, ACCEPT_ALL};
use fugit::MicrosDurationU32;
use sunxi_can_core::{CanId, Dependencies};

/// Echo slot of the frame in the transmit buffer
pub const ECHO_SLOT: usize = 0;

/// Delay between two checks of the transmit buffer status
pub const TX_POLL_INTERVAL: MicrosDurationU32 = MicrosDurationU32::from_ticks(10);

/// Errors that may occur during transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// The host rejected the frame. Nothing was written to the controller.
    InvalidFrame,
    /// The transmit buffer did not become writable within
    /// [`CanConfig::tx_timeout`](crate::config::CanConfig::tx_timeout)
    Timeout,
    /// The controller did not cycle through reset mode
    ModeChange(ModeChangeTimeout),
}

impl From<ModeChangeTimeout> for TransmitError {
    fn from(value: ModeChangeTimeout) -> Self {
        Self::ModeChange(value)
    }
}

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice, R: Registers> Can<Id, D, H, R> {
    /// Transmits `frame`, blocking until the transmit buffer is writable.
    ///
    /// Each wait on the buffer is bounded by the configured transmit timeout.
    /// The frame is registered for local echo under [`ECHO_SLOT`] and the host
    /// queue stays stopped until the transmit interrupt reports completion.
    pub fn transmit(&mut self, frame: &CanFrame) -> Result<(), TransmitError> {
        if !self.host.is_valid(frame) {
            self.host.statistics().tx_dropped += 1;
            return Err(TransmitError::InvalidFrame);
        }

        self.wait_tx_ready()?;

        let reset = self.internals.enter_reset_mode();
        self.internals.regs.write(Reg::AcceptanceMask, ACCEPT_ALL);
        let normal = self.internals.enter_normal_mode();
        reset.and(normal)?;

        self.host.stop_queue();

        let regs = &self.internals.regs;
        layout::encode(frame, |slot, byte| regs.write(Reg::Buffer(slot), byte.into()));
        self.host.put_echo(frame, ECHO_SLOT);

        if let Err(e) = self.wait_tx_ready() {
            self.host.free_echo(ECHO_SLOT);
            self.host.statistics().tx_dropped += 1;
            self.host.wake_queue();
            return Err(e);
        }
        self.internals.regs.command(Command::TransmitRequest);
        Ok(())
    }

    /// Non-blocking variant of [`transmit`](Self::transmit)
    ///
    /// Returns [`nb::Error::WouldBlock`] while the transmit buffer is
    /// occupied.
    pub fn try_transmit(&mut self, frame: &CanFrame) -> nb::Result<(), TransmitError> {
        if !self.tx_ready() {
            return Err(nb::Error::WouldBlock);
        }
        self.transmit(frame).map_err(nb::Error::Other)
    }

    fn tx_ready(&self) -> bool {
        Status(self.internals.regs.read(Reg::Status)).tx_ready()
    }

    fn wait_tx_ready(&mut self) -> Result<(), TransmitError> {
        let polls = (self.internals.config.tx_timeout.to_micros()
            / TX_POLL_INTERVAL.to_micros())
        .max(1);
        for _ in 0..polls {
            if self.tx_ready() {
                return Ok(());
            }
            self.internals.dependencies.delay(TX_POLL_INTERVAL);
        }
        Err(TransmitError::Timeout)
    }

    /// Bookkeeping for a completed transmission
    pub(crate) fn on_transmitted(&mut self) {
        let info = layout::FrameInfo(self.internals.regs.read_u8(Reg::TxReadBack));
        let stats = self.host.statistics();
        if !info.remote() {
            stats.tx_bytes += u64::from(dlc_to_len(info.dlc()));
        }
        stats.tx_packets += 1;
        self.host.get_echo(ECHO_SLOT);
        self.host.wake_queue();
    }
}
