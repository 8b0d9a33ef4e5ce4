#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//! # sunxi-can
//!
//! ## Overview
//! This crate provides a platform-agnostic driver for the CAN controller found
//! in Allwinner sun4i/sun7i SoCs.
//!
//! It provides the following features:
//!
//! - reset/normal mode state machine with bounded acknowledgement polling
//! - validated bit timing configuration
//! - standard and extended, data and remote frame transmission and reception
//!   through the single transmit/receive buffer
//! - decoding of error interrupts into error-active/warning/passive/bus-off
//!   transitions and CAN error frames
//! - a bounded interrupt dispatcher
//! - loopback and listen-only operation
//!
//! The controller is a single block of memory-mapped registers. For the
//! driver to be considered operational, the clock gate, the pin mux and the
//! interrupt line of the controller have to be set up. The latter is assured
//! through the safety requirements of [`sunxi_can_core`] traits which
//! platform-specific HALs are expected to implement.
//!
//! The driver does not own any frame queue. It is embedded into a network
//! stack through the [`NetDevice`] trait, which provides the outbound queue
//! control, local echo of transmitted frames, delivery of received and error
//! frames and the statistics counters.
//!
//! ## General usage example
//!
//! In order to use the driver one shall
//! - instantiate a `Dependencies` implementing struct
//! - implement [`NetDevice`] for the host side
//! - program the bit timing, then [`open`] the device
//! - call [`on_interrupt`] from the controller's interrupt handler
//!
//! ```no_run
//! # use sunxi_can::error_event::ErrorFrame;
//! # use sunxi_can::host::{NetDevice, NoBuffer, Statistics};
//! # use sunxi_can::message::CanFrame;
//! # pub enum Can0 {}
//! # unsafe impl sunxi_can::core::CanId for Can0 {
//! #     const ADDRESS: *const () = 0x01C2_BC00 as *const _;
//! # }
//! # pub mod hal {
//! #     pub mod can {
//! #         use sunxi_can::core::fugit::{HertzU32, MicrosDurationU32};
//! #         pub struct Dependencies(());
//! #         unsafe impl<ID: sunxi_can::core::CanId> sunxi_can::core::Dependencies<ID> for Dependencies {
//! #             fn can_clock(&self) -> HertzU32 { unreachable!() }
//! #             fn delay(&mut self, _: MicrosDurationU32) { unreachable!() }
//! #             fn now(&self) -> sunxi_can::core::Instant { unreachable!() }
//! #         }
//! #         impl Dependencies {
//! #             pub fn new() -> Result<Dependencies, ()> {
//! #                 Ok(Dependencies(()))
//! #             }
//! #         }
//! #     }
//! # }
//! # #[derive(Default)]
//! # struct Host(Statistics);
//! # impl NetDevice for Host {
//! #     type Error = ();
//! #     fn open(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn close(&mut self) {}
//! #     fn request_irq(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn free_irq(&mut self) {}
//! #     fn start_queue(&mut self) {}
//! #     fn stop_queue(&mut self) {}
//! #     fn wake_queue(&mut self) {}
//! #     fn is_queue_stopped(&self) -> bool { false }
//! #     fn put_echo(&mut self, _: &CanFrame, _: usize) {}
//! #     fn get_echo(&mut self, _: usize) -> Option<CanFrame> { None }
//! #     fn free_echo(&mut self, _: usize) {}
//! #     fn receive(&mut self, _: CanFrame) -> Result<(), NoBuffer> { Ok(()) }
//! #     fn receive_error(&mut self, _: ErrorFrame) -> Result<(), NoBuffer> { Ok(()) }
//! #     fn bus_off(&mut self) {}
//! #     fn statistics(&mut self) -> &mut Statistics { &mut self.0 }
//! # }
//! use sunxi_can::bus::Can;
//! use sunxi_can::config::{BitTiming, CanConfig, OperatingMode};
//! use sunxi_can::embedded_can::{Frame as _, StandardId};
//!
//! let dependencies = hal::can::Dependencies::new(/* all required parameters */).unwrap();
//! let mut config = CanConfig::new();
//! config.mode = OperatingMode::Loopback;
//! let mut can = Can::<Can0, _, _>::new(dependencies, Host::default(), config).unwrap();
//!
//! // 24 MHz / (3 * 16 time quanta) = 500 kbit/s
//! can.set_bittiming(BitTiming {
//!     prescaler: 3,
//!     ..BitTiming::default()
//! })
//! .unwrap();
//! can.open().unwrap();
//!
//! let frame = CanFrame::new(StandardId::new(0x123).unwrap(), &[1, 2, 3]).unwrap();
//! can.transmit(&frame).unwrap();
//!
//! // In the interrupt handler
//! can.on_interrupt();
//! ```
//!
//! [`NetDevice`]: crate::host::NetDevice
//! [`open`]: crate::bus::Can::open
//! [`on_interrupt`]: crate::bus::Can::on_interrupt

pub mod bus;
pub mod config;
pub mod error_event;
pub mod host;
pub mod interrupt;
pub mod message;
pub mod mode;
pub mod prelude;
pub mod reg;
pub mod rx;
pub mod state;
pub mod tx;

#[cfg(test)]
mod sim;

pub use embedded_can;
pub use sunxi_can_core as core;
