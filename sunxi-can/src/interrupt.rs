//! Interrupt sources and the interrupt dispatcher

use crate::bus::Can;
use crate::host::NetDevice;
use crate::reg::{Reg, Registers, Status};
use bitfield::bitfield;
use sunxi_can_core::{CanId, Dependencies};

/// Upper bound of dispatcher iterations per [`Can::on_interrupt`] call
pub const MAX_ITERATIONS: u32 = 20;

bitfield! {
    /// A set of CAN interrupts, as found in `INT` and `INTEN`.
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct InterruptSet(u32);

    /// Bus error
    pub bus_error, set_bus_error: 7;
    /// Arbitration lost
    pub arbitration_lost, set_arbitration_lost: 6;
    /// Error passive status changed
    pub error_passive, set_error_passive: 5;
    /// Wake-up
    pub wakeup, set_wakeup: 4;
    /// Data overrun
    pub data_overrun, set_data_overrun: 3;
    /// Error warning status changed
    pub error_warning, set_error_warning: 2;
    /// Transmission completed
    pub tx, set_tx: 1;
    /// Frame received
    pub rx, set_rx: 0;
}

impl InterruptSet {
    /// Interrupts handled by the error/state decoder
    pub const ERRORS: Self = Self(0b1110_1100);

    /// `true` if at least one error interrupt is in the set
    pub fn has_errors(&self) -> bool {
        self.0 & Self::ERRORS.0 != 0
    }

    /// An iterator visiting all elements in ascending bit order.
    pub fn iter(&self) -> Iter {
        Iter {
            flags: *self,
            index: 0,
        }
    }
}

impl FromIterator<Interrupt> for InterruptSet {
    fn from_iter<T: IntoIterator<Item = Interrupt>>(iter: T) -> Self {
        let mut set = 0_u32;
        for int in iter.into_iter() {
            set |= u32::from(int);
        }
        InterruptSet(set)
    }
}

impl core::fmt::Debug for InterruptSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "InterruptSet {{ ")?;
        for int in self.iter() {
            write!(f, "{:?} ", int)?;
        }
        write!(f, "}}")
    }
}

/// A single interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// RI
    Receive = 0,
    /// TI
    Transmit = 1,
    /// EWI
    ErrorWarning = 2,
    /// DOI
    DataOverrun = 3,
    /// WUI
    Wakeup = 4,
    /// EPI
    ErrorPassive = 5,
    /// ALI
    ArbitrationLost = 6,
    /// BEI
    BusError = 7,
}

impl From<Interrupt> for u32 {
    fn from(x: Interrupt) -> Self {
        1 << x as u32
    }
}

/// The bit number does not name an interrupt
#[derive(Debug)]
pub struct InvalidInterruptNumber;

impl TryFrom<u8> for Interrupt {
    type Error = InvalidInterruptNumber;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Interrupt::*;
        let ret = match value {
            0 => Receive,
            1 => Transmit,
            2 => ErrorWarning,
            3 => DataOverrun,
            4 => Wakeup,
            5 => ErrorPassive,
            6 => ArbitrationLost,
            7 => BusError,
            8.. => Err(InvalidInterruptNumber)?,
        };
        Ok(ret)
    }
}

/// An iterator over the items of an [`InterruptSet`].
///
/// This `struct` is created by [`InterruptSet::iter`].
pub struct Iter {
    flags: InterruptSet,
    index: u8,
}

impl Iterator for Iter {
    type Item = Interrupt;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.index;
        self.index = self.index.saturating_add(1);
        // Since there are no gaps in the interrupt flags, this will be `Some` until all
        // interrupts have been checked.
        let int = i.try_into().ok()?;
        if self.flags.0 & (1 << i) != 0 {
            Some(int)
        } else {
            self.next()
        }
    }
}

/// Result of an [`on_interrupt`](Can::on_interrupt) call, to be reported to
/// the interrupt framework
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IrqOutcome {
    /// The controller had nothing pending or did not answer
    NotHandled,
    /// At least one interrupt was serviced
    Handled,
}

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice, R: Registers> Can<Id, D, H, R> {
    /// Interrupt entry point.
    ///
    /// Services the pending interrupt sources until none is left or
    /// [`MAX_ITERATIONS`] passes were made: completed transmissions are
    /// echoed back, up to [`MAX_ITERATIONS`] frames per pass are drained from
    /// the receive buffer and error conditions are
    /// reported through [`NetDevice::receive_error`]. Sources still pending
    /// afterwards raise the interrupt again.
    pub fn on_interrupt(&mut self) -> IrqOutcome {
        let mut n = 0;
        while n < MAX_ITERATIONS {
            let interrupts = InterruptSet(self.internals.regs.read_u8(Reg::InterruptSource).into());
            if interrupts.0 == 0 {
                break;
            }
            n += 1;

            let mut status = Status(self.internals.regs.read(Reg::Status));
            // Unplugged hardware reads back as all ones
            if self.internals.regs.is_absent() {
                return IrqOutcome::NotHandled;
            }

            if interrupts.wakeup() {
                log::warn!("wakeup interrupt");
            }

            if interrupts.tx() {
                log::trace!("tx interrupt, source {:#04x}", interrupts.0);
                self.on_transmitted();
            }

            if interrupts.rx() {
                log::trace!("rx interrupt, source {:#04x}", interrupts.0);
                let mut drained = 0;
                while status.rx_ready() && drained < MAX_ITERATIONS {
                    self.receive();
                    drained += 1;
                    status = Status(self.internals.regs.read(Reg::Status));
                    if self.internals.regs.is_absent() {
                        return IrqOutcome::NotHandled;
                    }
                }
            }

            let delivered = if interrupts.has_errors() {
                log::trace!("error interrupt, source {:#04x}", interrupts.0);
                self.handle_error(interrupts, status)
            } else {
                Ok(())
            };

            // Clearing only takes effect once read back. The sources are
            // consumed even when the error frame was dropped.
            self.internals
                .regs
                .write(Reg::InterruptSource, interrupts.0);
            let _ = self.internals.regs.read(Reg::InterruptSource);

            if delivered.is_err() {
                break;
            }
        }

        if n >= MAX_ITERATIONS {
            log::debug!("{} interrupt passes handled, leaving the rest pending", n);
        }

        if n > 0 {
            IrqOutcome::Handled
        } else {
            IrqOutcome::NotHandled
        }
    }
}
