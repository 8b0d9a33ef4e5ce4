//! Reset/normal mode transitions
//!
//! Bit timing, acceptance filter and error counter registers only take writes
//! while the controller is held in reset mode. Every reconfiguration is
//! therefore bracketed by [`Internals::enter_reset_mode`] and
//! [`Internals::enter_normal_mode`]. The controller acknowledges a mode
//! change by reflecting the new reset bit in `MSEL`, which can take a while.

use crate::bus::Internals;
use crate::config::OperatingMode;
use crate::interrupt::Interrupt;
use crate::reg::{ModeSelect, Reg, Registers};
use crate::state::ControllerState;
use fugit::MicrosDurationU32;
use sunxi_can_core::{CanId, Dependencies};

/// Number of times the mode select register is checked before a mode change
/// is given up on
pub const MODE_POLL_ATTEMPTS: u32 = 100;

/// Delay between two checks of the mode select register
pub const MODE_POLL_INTERVAL: MicrosDurationU32 = MicrosDurationU32::from_ticks(10);

/// Stable controller modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerMode {
    /// Off the bus, configuration registers writable
    Reset,
    /// On the bus
    Normal,
}

/// The controller did not acknowledge a mode change in time.
///
/// The hardware is left in whatever mode it was last observed in. Subsequent
/// operations are unreliable until a restart succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChangeTimeout {
    /// Mode that was requested
    pub target: ControllerMode,
}

/// Interrupt enable mask applied whenever normal mode is entered
pub fn interrupt_enable_mask(bus_error_reporting: bool) -> u32 {
    let all = 0xffff;
    if bus_error_reporting {
        all
    } else {
        all & !u32::from(Interrupt::BusError)
    }
}

impl<Id: CanId, D: Dependencies<Id>, R: Registers> Internals<Id, D, R> {
    /// Puts the controller in reset mode. The state becomes
    /// [`ControllerState::Stopped`] once the controller acknowledges; on
    /// timeout it is left untouched.
    pub fn enter_reset_mode(&mut self) -> Result<(), ModeChangeTimeout> {
        self.poll_mode(ControllerMode::Reset)?;
        self.state.set(ControllerState::Stopped);
        Ok(())
    }

    /// Takes the controller out of reset mode, then applies the interrupt
    /// enable mask and the configured [`OperatingMode`].
    pub fn enter_normal_mode(&mut self) -> Result<(), ModeChangeTimeout> {
        self.poll_mode(ControllerMode::Normal)?;
        self.state.set(ControllerState::ErrorActive);

        let regs = &self.regs;
        let config = &self.config;
        critical_section::with(|_| {
            regs.write(
                Reg::InterruptEnable,
                interrupt_enable_mask(config.bus_error_reporting),
            );
            let mut msel = ModeSelect(regs.read(Reg::ModeSelect));
            msel.set_loopback(config.mode == OperatingMode::Loopback);
            msel.set_listen_only(config.mode == OperatingMode::ListenOnly);
            regs.write(Reg::ModeSelect, msel.0);
        });
        Ok(())
    }

    /// (Re)initializes the controller: reset mode unless already stopped,
    /// clear the error counters, normal mode.
    ///
    /// A failed reset does not prevent the remaining steps. The first failure
    /// is returned.
    pub fn start(&mut self) -> Result<(), ModeChangeTimeout> {
        let reset = if self.state.get() != ControllerState::Stopped {
            self.enter_reset_mode()
        } else {
            Ok(())
        };
        self.regs.write(Reg::ErrorCounter, 0);
        let normal = self.enter_normal_mode();
        reset.and(normal)
    }

    fn poll_mode(&mut self, target: ControllerMode) -> Result<(), ModeChangeTimeout> {
        let reset = target == ControllerMode::Reset;
        for _ in 0..MODE_POLL_ATTEMPTS {
            let mut msel = ModeSelect(self.regs.read(Reg::ModeSelect));
            if msel.reset() == reset {
                return Ok(());
            }
            msel.set_reset(reset);
            self.regs.write(Reg::ModeSelect, msel.0);
            self.dependencies.delay(MODE_POLL_INTERVAL);
        }
        log::error!("setting controller into {:?} mode failed", target);
        Err(ModeChangeTimeout { target })
    }
}
