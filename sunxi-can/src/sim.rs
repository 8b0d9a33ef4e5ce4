//! Simulated controller, dependencies and host for unit tests

use crate::bus::Can;
use crate::config::CanConfig;
use crate::error_event::ErrorFrame;
use crate::host::{NetDevice, NoBuffer, Statistics};
use crate::message::{layout, CanFrame};
use crate::reg::{Command, ModeSelect, Reg, Registers, Status, BUFFER_SLOTS};
use core::cell::{Cell, RefCell};
use fugit::{HertzU32, MicrosDurationU32};
use std::collections::VecDeque;
use sunxi_can_core::{CanId, Dependencies, Instant};

/// Identity of the simulated controller. Nothing is ever mapped at its
/// address; all register access goes through [`SimRegisters`].
pub(crate) enum Sim {}

unsafe impl CanId for Sim {
    const ADDRESS: *const () = core::ptr::null();
}

pub(crate) type SimCan<'a> = Can<Sim, SimDependencies, SimHost, &'a SimRegisters>;

/// Driver on top of `regs` after construction, with logs cleared
pub(crate) fn driver(regs: &SimRegisters) -> SimCan<'_> {
    driver_with(regs, CanConfig::new())
}

pub(crate) fn driver_with(regs: &SimRegisters, config: CanConfig) -> SimCan<'_> {
    let mut can = SimCan::with_registers(regs, SimDependencies::new(), SimHost::new(), config)
        .unwrap();
    regs.clear_log();
    can.internals.dependencies.delays.clear();
    can
}

/// Register model
///
/// - A change of the `MSEL` reset bit becomes visible only after a
///   configurable number of further `MSEL` reads.
/// - `BTIME`, `ACPC` and `ACPM` ignore writes outside reset mode.
/// - `INT` returns scripted values, each cleared by the next write, or a
///   stuck value that never clears.
/// - Received frames are queued in buffer slot form and popped by the
///   release command.
/// - The transmit buffer is captured on every transmit request.
#[derive(Default)]
pub(crate) struct SimRegisters {
    msel: Cell<u32>,
    pending_msel: Cell<Option<u32>>,
    mode_lag: Cell<u32>,
    mode_countdown: Cell<u32>,
    status: Cell<u32>,
    tx_ready_reads: Cell<u32>,
    tx_busy_polls: Cell<u32>,
    inten: Cell<u32>,
    btime: Cell<u32>,
    errc: Cell<u32>,
    acpc: Cell<u32>,
    acpm: Cell<u32>,
    interrupts: RefCell<VecDeque<u32>>,
    stuck_interrupts: Cell<Option<u32>>,
    rx: RefCell<VecDeque<[u8; BUFFER_SLOTS]>>,
    tx_buffer: RefCell<[u8; BUFFER_SLOTS]>,
    transmitted: RefCell<Vec<[u8; BUFFER_SLOTS]>>,
    absent: Cell<bool>,
    writes: RefCell<Vec<(Reg, u32)>>,
    commands: RefCell<Vec<Command>>,
}

impl SimRegisters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A mode change requested by the first write is acknowledged on poll
    /// `poll` of the mode controller, `poll >= 2`.
    pub(crate) fn ack_mode_on_poll(&self, poll: u32) {
        self.mode_lag.set(poll - 2);
    }

    pub(crate) fn set_absent(&self, absent: bool) {
        self.absent.set(absent);
    }

    /// Status bits other than receive buffer and transmit buffer readiness
    pub(crate) fn set_status(&self, status: Status) {
        self.status.set(status.0);
    }

    /// The next `polls` status reads report a busy transmit buffer
    pub(crate) fn set_tx_busy_polls(&self, polls: u32) {
        self.tx_busy_polls.set(polls);
    }

    /// The next `reads` status reads report a writable transmit buffer, the
    /// `polls` after them a busy one
    pub(crate) fn set_tx_busy_after(&self, reads: u32, polls: u32) {
        self.tx_ready_reads.set(reads);
        self.tx_busy_polls.set(polls);
    }

    pub(crate) fn set_error_counters(&self, tx: u8, rx: u8) {
        self.errc.set(u32::from(tx) | u32::from(rx) << 16);
    }

    pub(crate) fn push_interrupts(&self, interrupts: u32) {
        self.interrupts.borrow_mut().push_back(interrupts);
    }

    pub(crate) fn stick_interrupts(&self, interrupts: u32) {
        self.stuck_interrupts.set(Some(interrupts));
    }

    pub(crate) fn queue_rx(&self, frame: &CanFrame) {
        let mut slots = [0; BUFFER_SLOTS];
        layout::encode(frame, |slot, byte| slots[usize::from(slot)] = byte);
        self.rx.borrow_mut().push_back(slots);
    }

    pub(crate) fn pending_rx(&self) -> usize {
        self.rx.borrow().len()
    }

    pub(crate) fn transmitted(&self) -> Vec<[u8; BUFFER_SLOTS]> {
        self.transmitted.borrow().clone()
    }

    pub(crate) fn writes(&self) -> Vec<(Reg, u32)> {
        self.writes.borrow().clone()
    }

    pub(crate) fn writes_to(&self, reg: Reg) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, value)| *value)
            .collect()
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    pub(crate) fn clear_log(&self) {
        self.writes.borrow_mut().clear();
        self.commands.borrow_mut().clear();
        self.transmitted.borrow_mut().clear();
    }

    fn in_reset(&self) -> bool {
        ModeSelect(self.msel.get()).reset()
    }

    fn read_msel(&self) -> u32 {
        if let Some(value) = self.pending_msel.get() {
            let countdown = self.mode_countdown.get();
            if countdown == 0 {
                self.msel.set(value);
                self.pending_msel.set(None);
            } else {
                self.mode_countdown.set(countdown - 1);
            }
        }
        self.msel.get()
    }

    fn write_msel(&self, value: u32) {
        let reset_changes = ModeSelect(value).reset() != self.in_reset();
        if !reset_changes {
            self.msel.set(value);
            self.pending_msel.set(None);
        } else if self.pending_msel.get() != Some(value) {
            self.pending_msel.set(Some(value));
            self.mode_countdown.set(self.mode_lag.get());
        }
    }

    fn read_status(&self) -> u32 {
        let mut status = Status(self.status.get());
        status.set_rx_ready(!self.rx.borrow().is_empty());
        let ready_reads = self.tx_ready_reads.get();
        if ready_reads > 0 {
            status.set_tx_ready(true);
            self.tx_ready_reads.set(ready_reads - 1);
        } else {
            let busy = self.tx_busy_polls.get();
            status.set_tx_ready(busy == 0);
            self.tx_busy_polls.set(busy.saturating_sub(1));
        }
        status.0
    }

    fn execute(&self, value: u32) {
        for command in [
            Command::TransmitRequest,
            Command::AbortRequest,
            Command::ReleaseReceiveBuffer,
            Command::ClearDataOverrun,
            Command::SelfReceiveRequest,
        ] {
            if value & u32::from(command) == 0 {
                continue;
            }
            self.commands.borrow_mut().push(command);
            match command {
                Command::TransmitRequest => {
                    let buffer = *self.tx_buffer.borrow();
                    self.transmitted.borrow_mut().push(buffer);
                }
                Command::ReleaseReceiveBuffer => {
                    self.rx.borrow_mut().pop_front();
                }
                _ => {}
            }
        }
    }
}

impl Registers for SimRegisters {
    fn read(&self, reg: Reg) -> u32 {
        match reg {
            Reg::ModeSelect if self.absent.get() => 0xff,
            Reg::ModeSelect => self.read_msel(),
            Reg::Command => 0,
            Reg::Status => self.read_status(),
            Reg::InterruptSource => self
                .stuck_interrupts
                .get()
                .or_else(|| self.interrupts.borrow().front().copied())
                .unwrap_or(0),
            Reg::InterruptEnable => self.inten.get(),
            Reg::BitTiming => self.btime.get(),
            Reg::ErrorCounter => self.errc.get(),
            Reg::AcceptanceCode => self.acpc.get(),
            Reg::AcceptanceMask => self.acpm.get(),
            Reg::Buffer(slot) => self
                .rx
                .borrow()
                .front()
                .map_or(0, |frame| frame[usize::from(slot)].into()),
            Reg::TxReadBack => self.tx_buffer.borrow()[0].into(),
        }
    }

    fn write(&self, reg: Reg, value: u32) {
        self.writes.borrow_mut().push((reg, value));
        match reg {
            Reg::ModeSelect => self.write_msel(value),
            Reg::Command => self.execute(value),
            Reg::Status | Reg::TxReadBack => {}
            Reg::InterruptSource => {
                if self.stuck_interrupts.get().is_none() {
                    self.interrupts.borrow_mut().pop_front();
                }
            }
            Reg::InterruptEnable => self.inten.set(value),
            Reg::ErrorCounter => self.errc.set(value),
            Reg::BitTiming if self.in_reset() => self.btime.set(value),
            Reg::AcceptanceCode if self.in_reset() => self.acpc.set(value),
            Reg::AcceptanceMask if self.in_reset() => self.acpm.set(value),
            Reg::BitTiming | Reg::AcceptanceCode | Reg::AcceptanceMask => {}
            Reg::Buffer(slot) => self.tx_buffer.borrow_mut()[usize::from(slot)] = value as u8,
        }
    }
}

/// Records delays and runs a clock that advances on every reading
pub(crate) struct SimDependencies {
    pub(crate) delays: Vec<MicrosDurationU32>,
    ticks: Cell<u64>,
}

impl SimDependencies {
    pub(crate) fn new() -> Self {
        Self {
            delays: Vec::new(),
            ticks: Cell::new(0),
        }
    }
}

unsafe impl Dependencies<Sim> for SimDependencies {
    fn can_clock(&self) -> HertzU32 {
        HertzU32::from_raw(24_000_000)
    }

    fn delay(&mut self, duration: MicrosDurationU32) {
        self.delays.push(duration);
    }

    fn now(&self) -> Instant {
        let ticks = self.ticks.get() + 1;
        self.ticks.set(ticks);
        Instant::from_ticks(ticks)
    }
}

/// Host network device recording everything the driver does to it
#[derive(Default)]
pub(crate) struct SimHost {
    pub(crate) opened: bool,
    pub(crate) irq: bool,
    pub(crate) irq_frees: u32,
    pub(crate) queue_stopped: bool,
    pub(crate) echo: [Option<CanFrame>; 1],
    pub(crate) echoed: Vec<CanFrame>,
    pub(crate) received: Vec<CanFrame>,
    pub(crate) errors: Vec<ErrorFrame>,
    pub(crate) bus_off: u32,
    pub(crate) stats: Statistics,
    pub(crate) no_buffer: bool,
    pub(crate) reject_frames: bool,
    pub(crate) fail_irq: bool,
}

impl SimHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl NetDevice for SimHost {
    type Error = ();

    fn open(&mut self) -> Result<(), ()> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn request_irq(&mut self) -> Result<(), ()> {
        if self.fail_irq {
            return Err(());
        }
        self.irq = true;
        Ok(())
    }

    fn free_irq(&mut self) {
        self.irq = false;
        self.irq_frees += 1;
    }

    fn is_valid(&self, _frame: &CanFrame) -> bool {
        !self.reject_frames
    }

    fn start_queue(&mut self) {
        self.queue_stopped = false;
    }

    fn stop_queue(&mut self) {
        self.queue_stopped = true;
    }

    fn wake_queue(&mut self) {
        self.queue_stopped = false;
    }

    fn is_queue_stopped(&self) -> bool {
        self.queue_stopped
    }

    fn put_echo(&mut self, frame: &CanFrame, index: usize) {
        self.echo[index] = Some(*frame);
    }

    fn get_echo(&mut self, index: usize) -> Option<CanFrame> {
        let frame = self.echo[index].take();
        self.echoed.extend(frame);
        frame
    }

    fn free_echo(&mut self, index: usize) {
        self.echo[index] = None;
    }

    fn receive(&mut self, frame: CanFrame) -> Result<(), NoBuffer> {
        if self.no_buffer {
            return Err(NoBuffer);
        }
        self.received.push(frame);
        Ok(())
    }

    fn receive_error(&mut self, frame: ErrorFrame) -> Result<(), NoBuffer> {
        if self.no_buffer {
            return Err(NoBuffer);
        }
        self.errors.push(frame);
        Ok(())
    }

    fn bus_off(&mut self) {
        self.bus_off += 1;
    }

    fn statistics(&mut self) -> &mut Statistics {
        &mut self.stats
    }
}
