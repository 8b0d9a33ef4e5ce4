//! Error/state decoder
//!
//! Turns the error interrupts and the status word of one dispatcher pass into
//! the next [`ControllerState`] and a single combined [`ErrorEvent`], which is
//! reported to the host in the conventional 8-byte CAN error frame layout.

use crate::bus::{Can, ErrorCounters};
use crate::host::{NetDevice, NoBuffer};
use crate::interrupt::InterruptSet;
use crate::reg::{sta::error_code, Command, Registers, Status};
use crate::state::ControllerState;
use bitfield::bitfield;
use embedded_can::ErrorKind;
use sunxi_can_core::{CanId, Dependencies};

/// Which rule of the CAN protocol was broken
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Transmitted and monitored bit differ
    Bit,
    /// Fixed-form bit field with an illegal value
    Form,
    /// More than 5 equal consecutive bits
    Stuff,
    /// Some other error, located by the frame segment code
    Unspecified {
        /// Frame segment the error occurred in
        segment: u8,
    },
}

/// Side of the controller an error is attributed to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// While transmitting
    Transmit,
    /// While receiving
    Receive,
}

/// A bus error captured by the controller
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusError {
    /// Kind of violation
    pub violation: ProtocolViolation,
    /// Whether the controller was transmitting or receiving
    pub direction: Direction,
}

impl BusError {
    /// Decodes the error code capture of the status register
    pub fn from_status(status: Status) -> Self {
        let violation = match status.error_code() {
            error_code::BIT => ProtocolViolation::Bit,
            error_code::FORM => ProtocolViolation::Form,
            error_code::STUFF => ProtocolViolation::Stuff,
            _ => ProtocolViolation::Unspecified {
                segment: status.error_segment(),
            },
        };
        let direction = if status.error_in_reception() {
            Direction::Receive
        } else {
            Direction::Transmit
        };
        Self {
            violation,
            direction,
        }
    }
}

impl embedded_can::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self.violation {
            ProtocolViolation::Bit => ErrorKind::Bit,
            ProtocolViolation::Form => ErrorKind::Form,
            ProtocolViolation::Stuff => ErrorKind::Stuff,
            ProtocolViolation::Unspecified { .. } => ErrorKind::Other,
        }
    }
}

/// Entry into [`ControllerState::ErrorWarning`] or
/// [`ControllerState::ErrorPassive`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// State entered
    pub state: ControllerState,
    /// Side with the larger error counter, receive on a tie
    pub side: Direction,
    /// Error counters at the time of the change
    pub counters: ErrorCounters,
}

/// Everything that went wrong during one dispatcher pass
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorEvent {
    /// The receive buffer overflowed
    pub data_overrun: bool,
    /// The controller went bus-off
    pub bus_off: bool,
    /// A bus error was captured
    pub bus_error: Option<BusError>,
    /// The error passive interrupt fired
    pub error_passive: bool,
    /// Arbitration was lost at this bit position
    pub arbitration_lost: Option<u8>,
    /// The controller entered a degraded state
    pub state_change: Option<StateChange>,
}

/// Output of [`decode`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// State to latch
    pub state: ControllerState,
    /// Combined event to report
    pub event: ErrorEvent,
}

/// Decodes the error interrupts of one dispatcher pass.
///
/// `counters` is only called when a state change needs an error counter
/// snapshot. When several interrupts are set, the last state-changing one in
/// the order error warning, error passive determines the resulting state.
pub fn decode(
    previous: ControllerState,
    interrupts: InterruptSet,
    status: Status,
    counters: impl FnOnce() -> ErrorCounters,
) -> Decoded {
    let mut state = previous;
    let mut event = ErrorEvent::default();

    if interrupts.data_overrun() {
        log::debug!("data overrun interrupt");
        event.data_overrun = true;
    }

    if interrupts.error_warning() {
        log::debug!("error warning interrupt");
        state = if status.bus_off() {
            event.bus_off = true;
            ControllerState::BusOff
        } else if status.error() {
            ControllerState::ErrorWarning
        } else {
            ControllerState::ErrorActive
        };
    }

    if interrupts.bus_error() {
        event.bus_error = Some(BusError::from_status(status));
    }

    if interrupts.error_passive() {
        log::debug!("error passive interrupt");
        event.error_passive = true;
        state = if status.error() {
            ControllerState::ErrorPassive
        } else {
            ControllerState::ErrorActive
        };
    }

    if interrupts.arbitration_lost() {
        log::debug!("arbitration lost interrupt");
        event.arbitration_lost = Some(status.arbitration_lost_bit());
    }

    if state != previous
        && matches!(
            state,
            ControllerState::ErrorWarning | ControllerState::ErrorPassive
        )
    {
        let counters = counters();
        let side = if counters.tx > counters.rx {
            Direction::Transmit
        } else {
            Direction::Receive
        };
        event.state_change = Some(StateChange {
            state,
            side,
            counters,
        });
    }

    Decoded { state, event }
}

bitfield! {
    /// Error classes of an [`ErrorFrame`]
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ErrorClass(u32);
    impl Debug;

    /// Arbitration lost, bit position in `data[0]`
    pub lost_arbitration, set_lost_arbitration: 1;
    /// Controller problem, details in `data[1]`
    pub controller, set_controller: 2;
    /// Protocol violation, details in `data[2]` and `data[3]`
    pub protocol, set_protocol: 3;
    /// Bus-off
    pub bus_off, set_bus_off: 6;
    /// Bus error
    pub bus_error, set_bus_error: 7;
}

/// Controller status flags in `data[1]`
pub mod controller {
    /// Receive buffer overflow
    pub const RX_OVERFLOW: u8 = 0x01;
    /// Receive error counter reached the warning level
    pub const RX_WARNING: u8 = 0x04;
    /// Transmit error counter reached the warning level
    pub const TX_WARNING: u8 = 0x08;
    /// Receive error counter reached the passive level
    pub const RX_PASSIVE: u8 = 0x10;
    /// Transmit error counter reached the passive level
    pub const TX_PASSIVE: u8 = 0x20;
}

/// Protocol violation flags in `data[2]`
pub mod protocol {
    /// Unspecified violation
    pub const UNSPECIFIED: u8 = 0x00;
    /// Bit error
    pub const BIT: u8 = 0x01;
    /// Form error
    pub const FORM: u8 = 0x02;
    /// Stuff error
    pub const STUFF: u8 = 0x04;
    /// The error happened while transmitting
    pub const TX: u8 = 0x80;
}

/// Error report in the conventional CAN error frame layout
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Error classes present in this frame
    pub class: ErrorClass,
    /// Class specific details
    pub data: [u8; 8],
}

impl ErrorFrame {
    /// Data length of every error frame
    pub const DLC: u8 = 8;
}

impl ErrorEvent {
    /// Renders the event as an error frame.
    pub fn to_frame(&self) -> ErrorFrame {
        let mut frame = ErrorFrame::default();

        if self.data_overrun {
            frame.class.set_controller(true);
            frame.data[1] |= controller::RX_OVERFLOW;
        }

        if self.bus_off {
            frame.class.set_bus_off(true);
        }

        if let Some(error) = self.bus_error {
            frame.class.set_protocol(true);
            frame.class.set_bus_error(true);
            let kind = match error.violation {
                ProtocolViolation::Bit => protocol::BIT,
                ProtocolViolation::Form => protocol::FORM,
                ProtocolViolation::Stuff => protocol::STUFF,
                ProtocolViolation::Unspecified { segment } => {
                    frame.data[3] = segment;
                    protocol::UNSPECIFIED
                }
            };
            frame.data[2] |= kind;
            if error.direction == Direction::Transmit {
                frame.data[2] |= protocol::TX;
            }
        }

        if let Some(bit) = self.arbitration_lost {
            frame.class.set_lost_arbitration(true);
            frame.data[0] = bit;
        }

        if let Some(change) = self.state_change {
            frame.class.set_controller(true);
            frame.data[1] |= match (change.state, change.side) {
                (ControllerState::ErrorWarning, Direction::Transmit) => controller::TX_WARNING,
                (ControllerState::ErrorWarning, Direction::Receive) => controller::RX_WARNING,
                (_, Direction::Transmit) => controller::TX_PASSIVE,
                (_, Direction::Receive) => controller::RX_PASSIVE,
            };
            frame.data[6] = change.counters.tx;
            frame.data[7] = change.counters.rx;
        }

        frame
    }
}

impl<Id: CanId, D: Dependencies<Id>, H: NetDevice, R: Registers> Can<Id, D, H, R> {
    /// Applies the outcome of the error interrupts of one dispatcher pass:
    /// statistics, hardware acknowledgements, bus-off handling, the state
    /// latch and the error frame.
    ///
    /// Fails if the host has no room for the error frame.
    pub(crate) fn handle_error(
        &mut self,
        interrupts: InterruptSet,
        status: Status,
    ) -> Result<(), NoBuffer> {
        let regs = &self.internals.regs;
        let Decoded { state, event } = decode(self.internals.state.get(), interrupts, status, || {
            ErrorCounters::read(regs)
        });

        let stats = self.host.statistics();
        if event.data_overrun {
            stats.rx_over_errors += 1;
            stats.rx_errors += 1;
        }
        if event.bus_error.is_some() {
            stats.can.bus_error += 1;
            stats.rx_errors += 1;
        }
        if event.arbitration_lost.is_some() {
            stats.can.arbitration_lost += 1;
            stats.tx_errors += 1;
        }
        match event.state_change.map(|change| change.state) {
            Some(ControllerState::ErrorWarning) => stats.can.error_warning += 1,
            Some(ControllerState::ErrorPassive) => stats.can.error_passive += 1,
            _ => {}
        }
        if event.bus_off {
            stats.can.bus_off += 1;
        }

        if event.data_overrun {
            self.internals.regs.command(Command::ClearDataOverrun);
        }
        if event.bus_off {
            self.host.stop_queue();
            self.host.bus_off();
        }
        self.internals.state.set(state);

        let delivered = self.host.receive_error(event.to_frame());
        let stats = self.host.statistics();
        match delivered {
            Ok(()) => {
                stats.rx_packets += 1;
                stats.rx_bytes += u64::from(ErrorFrame::DLC);
                Ok(())
            }
            Err(e) => {
                stats.rx_dropped += 1;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interrupt::Interrupt;

    fn interrupts(list: &[Interrupt]) -> InterruptSet {
        list.iter().copied().collect()
    }

    fn status(f: impl FnOnce(&mut Status)) -> Status {
        let mut status = Status(0);
        f(&mut status);
        status
    }

    fn no_counters() -> ErrorCounters {
        panic!("error counters read without a state change")
    }

    #[test]
    fn warning_with_bus_off_status_goes_bus_off() {
        let out = decode(
            ControllerState::ErrorPassive,
            interrupts(&[Interrupt::ErrorWarning]),
            status(|s| {
                s.set_error(true);
                s.set_bus_off(true)
            }),
            no_counters,
        );
        assert_eq!(out.state, ControllerState::BusOff);
        assert!(out.event.bus_off);
        assert_eq!(out.event.state_change, None);
        let frame = out.event.to_frame();
        assert!(frame.class.bus_off());
        assert_eq!(frame.class.0, 0x40);
    }

    #[test]
    fn warning_follows_error_status() {
        let warn = interrupts(&[Interrupt::ErrorWarning]);
        let counters = || ErrorCounters { tx: 97, rx: 3 };
        let out = decode(
            ControllerState::ErrorActive,
            warn,
            status(|s| s.set_error(true)),
            counters,
        );
        assert_eq!(out.state, ControllerState::ErrorWarning);
        assert_eq!(
            out.event.state_change,
            Some(StateChange {
                state: ControllerState::ErrorWarning,
                side: Direction::Transmit,
                counters: ErrorCounters { tx: 97, rx: 3 },
            })
        );

        let out = decode(ControllerState::ErrorWarning, warn, Status(0), no_counters);
        assert_eq!(out.state, ControllerState::ErrorActive);
        assert_eq!(out.event.state_change, None);
    }

    #[test]
    fn arbitration_lost_keeps_state_and_captures_position() {
        let out = decode(
            ControllerState::ErrorActive,
            interrupts(&[Interrupt::ArbitrationLost]),
            status(|s| s.set_arbitration_lost_bit(13)),
            no_counters,
        );
        assert_eq!(out.state, ControllerState::ErrorActive);
        assert_eq!(out.event.arbitration_lost, Some(13));
        let frame = out.event.to_frame();
        assert_eq!(frame.class.0, 0x02);
        assert_eq!(frame.data, [13, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn bus_error_subtypes() {
        let bus_error = interrupts(&[Interrupt::BusError]);
        let decode_code = |code: u8, reception: bool| {
            let s = status(|s| {
                s.set_error_code(code);
                s.set_error_segment(0x0b);
                s.set_error_in_reception(reception);
            });
            decode(ControllerState::ErrorActive, bus_error, s, no_counters)
                .event
                .bus_error
        };
        assert_eq!(
            decode_code(error_code::BIT, true),
            Some(BusError {
                violation: ProtocolViolation::Bit,
                direction: Direction::Receive
            })
        );
        assert_eq!(
            decode_code(error_code::FORM, false).map(|e| e.violation),
            Some(ProtocolViolation::Form)
        );
        assert_eq!(
            decode_code(error_code::STUFF, false).map(|e| e.violation),
            Some(ProtocolViolation::Stuff)
        );
        let other = decode_code(error_code::OTHER, false).unwrap();
        assert_eq!(
            other.violation,
            ProtocolViolation::Unspecified { segment: 0x0b }
        );
        assert_eq!(embedded_can::Error::kind(&other), ErrorKind::Other);

        let frame = ErrorEvent {
            bus_error: Some(other),
            ..Default::default()
        }
        .to_frame();
        assert_eq!(frame.class.0, 0x88);
        assert_eq!(frame.data[2], protocol::UNSPECIFIED | protocol::TX);
        assert_eq!(frame.data[3], 0x0b);
    }

    #[test]
    fn passive_overrides_warning_in_one_pass() {
        let out = decode(
            ControllerState::ErrorActive,
            interrupts(&[Interrupt::ErrorWarning, Interrupt::ErrorPassive]),
            status(|s| s.set_error(true)),
            || ErrorCounters { tx: 10, rx: 130 },
        );
        assert_eq!(out.state, ControllerState::ErrorPassive);
        assert!(out.event.error_passive);
        let frame = out.event.to_frame();
        assert!(frame.class.controller());
        assert_eq!(frame.data[1], controller::RX_PASSIVE);
        assert_eq!(frame.data[6], 10);
        assert_eq!(frame.data[7], 130);
    }

    #[test]
    fn unchanged_degraded_state_reports_no_transition() {
        let out = decode(
            ControllerState::ErrorPassive,
            interrupts(&[Interrupt::ErrorPassive]),
            status(|s| s.set_error(true)),
            no_counters,
        );
        assert_eq!(out.state, ControllerState::ErrorPassive);
        assert_eq!(out.event.state_change, None);
    }

    #[test]
    fn combined_event_renders_every_part() {
        let event = ErrorEvent {
            data_overrun: true,
            state_change: Some(StateChange {
                state: ControllerState::ErrorWarning,
                side: Direction::Receive,
                counters: ErrorCounters { tx: 0, rx: 96 },
            }),
            arbitration_lost: Some(3),
            ..Default::default()
        };
        let frame = event.to_frame();
        assert_eq!(frame.class.0, 0x06);
        assert_eq!(
            frame.data,
            [3, controller::RX_OVERFLOW | controller::RX_WARNING, 0, 0, 0, 0, 0, 96]
        );
    }
}
