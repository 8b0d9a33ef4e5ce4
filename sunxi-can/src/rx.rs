//! Receive path

use crate::bus::Can;
use crate::host::{NetDevice, NoBuffer};
use crate::message::layout;
use crate::reg::{Command, Reg, Registers};
use embedded_can::Frame as _;
use sunxi_can_core::{CanId, Dependencies};

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice, R: Registers> Can<Id, D, H, R> {
    /// Moves the frame at the head of the receive buffer to the host.
    ///
    /// The buffer is released as soon as the frame is captured, whether the
    /// host accepts it or not.
    pub(crate) fn receive(&mut self) {
        let regs = &self.internals.regs;
        let frame = layout::decode(|slot| regs.read_u8(Reg::Buffer(slot)));
        regs.command(Command::ReleaseReceiveBuffer);

        let len = frame.data().len() as u64;
        let delivered = self.host.receive(frame);
        let stats = self.host.statistics();
        match delivered {
            Ok(()) => {
                stats.rx_packets += 1;
                stats.rx_bytes += len;
            }
            Err(NoBuffer) => stats.rx_dropped += 1,
        }
    }
}
