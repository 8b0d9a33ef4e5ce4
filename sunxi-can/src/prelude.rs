//! Traits needed to work with the driver
pub use crate::host::NetDevice as _;
pub use crate::reg::Registers as _;
pub use embedded_can::Error as _;
pub use embedded_can::Frame as _;
