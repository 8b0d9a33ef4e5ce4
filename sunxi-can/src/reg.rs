//! Register interface
//!
//! The controller exposes a small block of 32-bit registers. Only the low byte
//! of most of them is meaningful, but all accesses are full-width and must
//! reach the device in program order: reads of the status register and the
//! receive buffer have side effects on real silicon.
//!
//! [`Registers`] is the seam between the driver and the register block.
//! [`Mmio`] implements it for a memory-mapped controller identified by a
//! [`CanId`].

pub mod btime;
pub mod cmd;
pub mod errc;
pub mod msel;
pub mod sta;

use core::marker::PhantomData;
use sunxi_can_core::CanId;
use vcell::VolatileCell;

pub use btime::BitTimingRegister;
pub use cmd::Command;
pub use errc::ErrorCounterRegister;
pub use msel::ModeSelect;
pub use sta::Status;

/// Number of transmit/receive buffer slots
pub const BUFFER_SLOTS: usize = 13;

/// Acceptance mask value that lets every identifier through
pub const ACCEPT_ALL: u32 = 0xffff_ffff;

/// Registers accessed by the driver
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    /// `MSEL`, operating mode selection
    ModeSelect,
    /// `CMD`, one-shot commands
    Command,
    /// `STA`, controller status
    Status,
    /// `INT`, interrupt source flags (write 1 to clear)
    InterruptSource,
    /// `INTEN`, interrupt enables
    InterruptEnable,
    /// `BTIME`, bus timing. Writable in reset mode only.
    BitTiming,
    /// `ERRC`, transmit and receive error counters
    ErrorCounter,
    /// `ACPC`, acceptance filter code. Writable in reset mode only.
    AcceptanceCode,
    /// `ACPM`, acceptance filter mask. Writable in reset mode only.
    AcceptanceMask,
    /// `BUFn`, transmit buffer on write, receive buffer on read. Valid slots
    /// are `0..BUFFER_SLOTS`.
    Buffer(u8),
    /// First word of the transmit buffer read-back window
    TxReadBack,
}

impl Reg {
    /// Byte offset of the register from the start of the register block
    pub const fn offset(self) -> usize {
        match self {
            Self::ModeSelect => 0x000,
            Self::Command => 0x004,
            Self::Status => 0x008,
            Self::InterruptSource => 0x00c,
            Self::InterruptEnable => 0x010,
            Self::BitTiming => 0x014,
            Self::ErrorCounter => 0x018,
            Self::AcceptanceCode => 0x028,
            Self::AcceptanceMask => 0x02c,
            Self::Buffer(slot) => 0x040 + 4 * slot as usize,
            Self::TxReadBack => 0x180,
        }
    }
}

/// Raw access to the controller registers.
///
/// Implementations must not cache, merge or reorder accesses.
pub trait Registers {
    /// Reads a full register
    fn read(&self, reg: Reg) -> u32;

    /// Writes a full register
    fn write(&self, reg: Reg, value: u32);

    /// Reads the low byte of a register
    fn read_u8(&self, reg: Reg) -> u8 {
        self.read(reg) as u8
    }

    /// Issues `command` through the command register.
    ///
    /// The write and the status read-back that lets it settle form one
    /// indivisible step, so a command issued from the interrupt dispatcher
    /// cannot interleave with one issued by the transmit path.
    fn command(&self, command: Command) {
        critical_section::with(|_| {
            self.write(Reg::Command, command.into());
            let _ = self.read(Reg::Status);
        });
    }

    /// `true` if the controller does not answer, which shows up as an
    /// all-ones mode register (unclocked or unplugged device).
    fn is_absent(&self) -> bool {
        self.read(Reg::ModeSelect) & 0xff == 0xff
    }
}

impl<R: Registers + ?Sized> Registers for &R {
    fn read(&self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// Memory layout of the controller registers
#[repr(C)]
pub struct RegisterBlock {
    /// 0x000
    pub msel: VolatileCell<u32>,
    /// 0x004
    pub cmd: VolatileCell<u32>,
    /// 0x008
    pub sta: VolatileCell<u32>,
    /// 0x00c
    pub int: VolatileCell<u32>,
    /// 0x010
    pub inten: VolatileCell<u32>,
    /// 0x014
    pub btime: VolatileCell<u32>,
    /// 0x018
    pub errc: VolatileCell<u32>,
    _reserved0: [u32; 3],
    /// 0x028
    pub acpc: VolatileCell<u32>,
    /// 0x02c
    pub acpm: VolatileCell<u32>,
    _reserved1: [u32; 4],
    /// 0x040
    pub buf: [VolatileCell<u32>; BUFFER_SLOTS],
    _reserved2: [u32; 67],
    /// 0x180
    pub rbuf_rback: [VolatileCell<u32>; BUFFER_SLOTS],
}

/// Memory-mapped register block of the controller `Id`
pub struct Mmio<Id>(PhantomData<Id>);

impl<Id: CanId> Mmio<Id> {
    /// # Safety
    /// The caller must own the controller referenced by `Id`, which is what
    /// [`Dependencies`] guarantees. Do not keep multiple instances for the same
    /// controller.
    ///
    /// [`Dependencies`]: sunxi_can_core::Dependencies
    pub(crate) unsafe fn new() -> Self {
        Self(PhantomData)
    }

    fn block(&self) -> &RegisterBlock {
        // Safety: `CanId::ADDRESS` points to a valid register block and `Self`
        // has exclusive access to it.
        unsafe { &*(Id::ADDRESS as *const RegisterBlock) }
    }

    fn cell(&self, reg: Reg) -> &VolatileCell<u32> {
        let block = self.block();
        match reg {
            Reg::ModeSelect => &block.msel,
            Reg::Command => &block.cmd,
            Reg::Status => &block.sta,
            Reg::InterruptSource => &block.int,
            Reg::InterruptEnable => &block.inten,
            Reg::BitTiming => &block.btime,
            Reg::ErrorCounter => &block.errc,
            Reg::AcceptanceCode => &block.acpc,
            Reg::AcceptanceMask => &block.acpm,
            Reg::Buffer(slot) => &block.buf[usize::from(slot)],
            Reg::TxReadBack => &block.rbuf_rback[0],
        }
    }
}

impl<Id: CanId> Registers for Mmio<Id> {
    fn read(&self, reg: Reg) -> u32 {
        self.cell(reg).get()
    }

    fn write(&self, reg: Reg, value: u32) {
        self.cell(reg).set(value)
    }
}
