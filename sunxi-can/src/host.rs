//! Boundary to the host networking stack
//!
//! The driver does not own any queue, echo storage or statistics. It drives
//! them through [`NetDevice`], which the embedding network stack implements.

use crate::error_event::ErrorFrame;
use crate::message::{CanFrame, MAX_DLC};
use core::fmt::Debug;
use embedded_can::Frame as _;

/// The host could not allocate room for an incoming frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoBuffer;

/// Network device services consumed by the driver
pub trait NetDevice {
    /// Failure reported by [`open`](Self::open) and
    /// [`request_irq`](Self::request_irq)
    type Error: Debug;

    /// Prepares the host side of the device for operation
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Counterpart of [`open`](Self::open)
    fn close(&mut self);

    /// Routes the controller interrupt line to
    /// [`Can::on_interrupt`](crate::bus::Can::on_interrupt)
    fn request_irq(&mut self) -> Result<(), Self::Error>;

    /// Counterpart of [`request_irq`](Self::request_irq)
    fn free_irq(&mut self);

    /// Generic validity check for outbound frames
    fn is_valid(&self, frame: &CanFrame) -> bool {
        frame.dlc() <= usize::from(MAX_DLC)
    }

    /// Allows the host to hand frames to the transmit path
    fn start_queue(&mut self);

    /// Stops the host from handing frames to the transmit path
    fn stop_queue(&mut self);

    /// Restarts a stopped queue
    fn wake_queue(&mut self);

    /// `true` while the outbound queue is stopped
    fn is_queue_stopped(&self) -> bool;

    /// Keeps a copy of a frame being transmitted so it can be looped back
    /// once the controller reports completion.
    fn put_echo(&mut self, frame: &CanFrame, index: usize);

    /// Loops the echoed frame at `index` back to local listeners and forgets
    /// it.
    fn get_echo(&mut self, index: usize) -> Option<CanFrame>;

    /// Forgets the echoed frame at `index` without looping it back
    fn free_echo(&mut self, index: usize);

    /// Delivers a received frame
    fn receive(&mut self, frame: CanFrame) -> Result<(), NoBuffer>;

    /// Delivers an error frame
    fn receive_error(&mut self, frame: ErrorFrame) -> Result<(), NoBuffer>;

    /// The controller went bus-off. Transmission stays impossible until the
    /// controller is restarted.
    fn bus_off(&mut self);

    /// Counters updated by the driver
    fn statistics(&mut self) -> &mut Statistics;
}

/// Device counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Frames delivered to the host, error frames included
    pub rx_packets: u64,
    /// Frames whose transmission completed
    pub tx_packets: u64,
    /// Payload bytes delivered to the host
    pub rx_bytes: u64,
    /// Payload bytes transmitted
    pub tx_bytes: u64,
    /// Reception side errors: overruns and bus errors
    pub rx_errors: u64,
    /// Transmission side errors: lost arbitrations
    pub tx_errors: u64,
    /// Receive buffer overruns
    pub rx_over_errors: u64,
    /// Frames the host had no room for
    pub rx_dropped: u64,
    /// Outbound frames discarded by the driver
    pub tx_dropped: u64,
    /// CAN specific counters
    pub can: CanStatistics,
}

/// CAN specific device counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanStatistics {
    /// Bus error interrupts
    pub bus_error: u64,
    /// Transitions to error warning
    pub error_warning: u64,
    /// Transitions to error passive
    pub error_passive: u64,
    /// Transitions to bus-off
    pub bus_off: u64,
    /// Lost arbitrations
    pub arbitration_lost: u64,
    /// Restarts requested through `set_mode`
    pub restarts: u64,
}
