//! Driver instance and its host-facing operations

use crate::config::{BitTiming, BitTimingError, CanConfig};
use crate::host::NetDevice;
use crate::interrupt::Interrupt;
use crate::mode::ModeChangeTimeout;
use crate::reg::{ErrorCounterRegister, Mmio, Reg, Registers, ACCEPT_ALL};
use crate::state::{ControllerState, StateCell};
use core::marker::PhantomData;
use sunxi_can_core::{CanId, Dependencies, Instant};

/// Snapshot of the error counters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorCounters {
    /// Transmit error counter
    pub tx: u8,
    /// Receive error counter
    pub rx: u8,
}

impl From<ErrorCounterRegister> for ErrorCounters {
    fn from(value: ErrorCounterRegister) -> Self {
        Self {
            tx: value.tx(),
            rx: value.rx(),
        }
    }
}

impl ErrorCounters {
    pub(crate) fn read(regs: &impl Registers) -> Self {
        ErrorCounterRegister(regs.read(Reg::ErrorCounter)).into()
    }
}

/// Errors that may occur during configuration
#[derive(Debug)]
pub enum ConfigurationError {
    /// Problems with the bit timing configuration. Nothing was written.
    InvalidParameter(BitTimingError),
    /// The controller did not acknowledge a mode change
    ModeChange(ModeChangeTimeout),
}

impl From<BitTimingError> for ConfigurationError {
    fn from(value: BitTimingError) -> Self {
        Self::InvalidParameter(value)
    }
}

impl From<ModeChangeTimeout> for ConfigurationError {
    fn from(value: ModeChangeTimeout) -> Self {
        Self::ModeChange(value)
    }
}

/// Requests accepted by [`Can::set_mode`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CanMode {
    /// Take the controller off the bus
    Stop,
    /// (Re)start the controller, e.g. to recover from bus-off
    Start,
    /// Put the controller to sleep
    Sleep,
}

/// Errors that may occur when changing the mode
#[derive(Debug)]
pub enum SetModeError {
    /// The device is not open
    NotOpen,
    /// The requested mode is not supported
    Unsupported(CanMode),
    /// The controller did not acknowledge a mode change
    ModeChange(ModeChangeTimeout),
}

impl From<ModeChangeTimeout> for SetModeError {
    fn from(value: ModeChangeTimeout) -> Self {
        Self::ModeChange(value)
    }
}

/// Errors that may occur when opening the device
#[derive(Debug)]
pub enum OpenError<E> {
    /// The host failed to open its side of the device
    Host(E),
    /// The interrupt line could not be requested. The host side was closed
    /// again.
    Irq(E),
    /// The controller did not acknowledge a mode change. The device is open
    /// nevertheless and can be restarted with [`Can::set_mode`].
    ModeChange(ModeChangeTimeout),
}

/// The mode select register reads back as all ones: nothing answers at the
/// controller address.
#[derive(Debug)]
pub struct NoDevice;

/// Open/closed bookkeeping
#[derive(Copy, Clone, Debug, Default)]
pub struct OpenState {
    opened_at: Option<Instant>,
    irq_requested: bool,
}

impl OpenState {
    /// `true` between [`Can::open`] and [`Can::close`]
    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// When the device was opened
    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// `true` if the driver requested the interrupt line and has to free it
    pub fn irq_requested(&self) -> bool {
        self.irq_requested
    }
}

/// A sun4i-compatible CAN controller
///
/// Owns the register block of controller `Id` through its dependencies `D`
/// and drives the host network device `H`. All operations run on the
/// caller's context, except [`Can::on_interrupt`] which is meant to be called
/// from the controller's interrupt handler.
pub struct Can<Id, D, H, R = Mmio<Id>> {
    /// Implementation details
    pub internals: Internals<Id, D, R>,
    pub(crate) host: H,
    open: OpenState,
}

/// Implementation details
pub struct Internals<Id, D, R> {
    pub(crate) regs: R,
    pub(crate) dependencies: D,
    pub(crate) config: CanConfig,
    pub(crate) state: StateCell,
    _id: PhantomData<Id>,
}

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice> Can<Id, D, H> {
    /// Probes and initializes the memory-mapped controller `Id`.
    ///
    /// The controller is left in reset mode. Program the bit timing with
    /// [`Self::set_bittiming`] before [`Self::open`]ing it.
    pub fn new(dependencies: D, host: H, config: CanConfig) -> Result<Self, NoDevice> {
        // Safety: Since `dependencies` implies ownership of the register block
        // pointed to by `Id: CanId`, `regs` has unique access to it.
        let regs = unsafe { Mmio::new() };
        Self::with_registers(regs, dependencies, host, config)
    }
}

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice, R: Registers> Can<Id, D, H, R> {
    /// Like [`Self::new`], with register access going through `regs`.
    pub fn with_registers(
        regs: R,
        dependencies: D,
        host: H,
        config: CanConfig,
    ) -> Result<Self, NoDevice> {
        if regs.is_absent() {
            log::info!("probing CAN controller failed");
            return Err(NoDevice);
        }

        let mut can = Self {
            internals: Internals {
                regs,
                dependencies,
                config,
                state: StateCell::new(),
                _id: PhantomData,
            },
            host,
            open: OpenState::default(),
        };
        can.chipset_init();
        Ok(can)
    }

    /// Enables the receive and error interrupts and parks the controller in
    /// reset mode. Mode change failures are logged and otherwise ignored;
    /// they surface again on open.
    fn chipset_init(&mut self) {
        let internals = &mut self.internals;
        let _ = internals.enter_reset_mode();
        let irqen: u32 = [
            Interrupt::BusError,
            Interrupt::ErrorPassive,
            Interrupt::DataOverrun,
            Interrupt::Receive,
        ]
        .into_iter()
        .map(u32::from)
        .sum();
        let inten = internals.regs.read(Reg::InterruptEnable);
        internals.regs.write(Reg::InterruptEnable, inten | irqen);
        let _ = internals.enter_normal_mode();
        let _ = internals.enter_reset_mode();
    }

    /// Brings the device up: accept-all filter, host side, interrupt line,
    /// controller (re)start, host queue.
    pub fn open(&mut self) -> Result<(), OpenError<H::Error>> {
        let reset = self.internals.enter_reset_mode();
        self.internals.regs.write(Reg::AcceptanceMask, ACCEPT_ALL);

        self.host.open().map_err(OpenError::Host)?;

        if !self.internals.config.custom_irq_handler {
            if let Err(e) = self.host.request_irq() {
                self.host.close();
                return Err(OpenError::Irq(e));
            }
            self.open.irq_requested = true;
        }

        let started = self.internals.start();
        self.open.opened_at = Some(self.internals.dependencies.now());
        self.host.start_queue();

        reset.and(started).map_err(OpenError::ModeChange)
    }

    /// Takes the device down. Closing a closed device does nothing.
    ///
    /// The host side is closed even if the controller does not acknowledge
    /// reset mode.
    pub fn close(&mut self) -> Result<(), ModeChangeTimeout> {
        if !self.open.is_open() {
            return Ok(());
        }
        self.host.stop_queue();
        let reset = self.internals.enter_reset_mode();
        if self.open.irq_requested {
            self.host.free_irq();
            self.open.irq_requested = false;
        }
        self.host.close();
        self.open.opened_at = None;
        reset
    }

    /// Changes the mode of an open device. Only [`CanMode::Start`] is
    /// supported.
    pub fn set_mode(&mut self, mode: CanMode) -> Result<(), SetModeError> {
        if !self.open.is_open() {
            return Err(SetModeError::NotOpen);
        }
        match mode {
            CanMode::Start => {
                let started = self.internals.start();
                self.host.statistics().can.restarts += 1;
                if self.host.is_queue_stopped() {
                    self.host.wake_queue();
                }
                started.map_err(Into::into)
            }
            mode => Err(SetModeError::Unsupported(mode)),
        }
    }

    /// Validates and programs `timing`. The timing register is only writable
    /// in reset mode, so the controller briefly leaves the bus.
    pub fn set_bittiming(&mut self, timing: BitTiming) -> Result<(), ConfigurationError> {
        let reg = timing.encode()?;
        log::info!(
            "setting bit timing {:#010x}, {} bit/s",
            reg.0,
            timing
                .bitrate(self.internals.dependencies.can_clock())
                .to_Hz()
        );

        let reset = self.internals.enter_reset_mode();
        self.internals.regs.write(Reg::BitTiming, reg.0);
        let normal = self.internals.enter_normal_mode();
        if reset.is_ok() {
            self.internals.config.bit_timing = timing;
        }
        reset.and(normal).map_err(Into::into)
    }

    /// Reads the error counters
    pub fn error_counters(&self) -> ErrorCounters {
        ErrorCounters::read(&self.internals.regs)
    }

    /// Controller state snapshot, readable while interrupts are serviced
    pub fn state(&self) -> ControllerState {
        self.internals.state.get()
    }

    /// Open/closed bookkeeping
    pub fn open_state(&self) -> OpenState {
        self.open
    }

    /// Configuration. Changes take effect the next time the controller enters
    /// normal mode.
    pub fn config(&mut self) -> &mut CanConfig {
        &mut self.internals.config
    }

    /// The host network device
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host network device
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Raw access to the registers.
    ///
    /// # Safety
    /// The abstraction assumes that it has exclusive ownership of the
    /// registers. Direct access can break such assumptions.
    pub unsafe fn registers(&self) -> &R {
        &self.internals.regs
    }

    /// Closes the device if needed, parks the controller in reset mode and
    /// hands back the resources.
    pub fn release(mut self) -> (D, H, R) {
        let _ = self.close();
        let _ = self.internals.enter_reset_mode();
        let Internals {
            regs, dependencies, ..
        } = self.internals;
        (dependencies, self.host, regs)
    }
}
