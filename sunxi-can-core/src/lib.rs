#![no_std]
#![warn(missing_docs)]

//! `sunxi-can-core` provides a set of essential abstractions that serve as a
//! thin integration layer between the platform independent [`sunxi-can`]
//! driver and platform specific HAL crates (in documentation also referred to
//! as _target HALs_).
//!
//! Traits from this crate are not supposed to be implemented by the
//! application developer; implementations should be provided by target HALs
//! that already know how to gate the CAN clock, mux the TX/RX pins and route
//! the interrupt line.
//!
//! Integrators of this crate into any given target HAL are responsible for
//! soundness of trait implementations and conforming to their respective safety
//! prerequisites.
//!
//! [`sunxi-can`]: <https://docs.rs/crate/sunxi-can/>

pub use fugit;

use fugit::{HertzU32, MicrosDurationU32, TimerInstantU64};

/// Microsecond resolution timestamp used to record when a controller was
/// opened.
pub type Instant = TimerInstantU64<1_000_000>;

/// Trait representing CAN controller identity
///
/// Types implementing this trait are expected to be used as marker types that
/// identify a specific CAN controller instance available on the platform. It
/// only conveys *where* the register block of the controller is mapped, not
/// necessarily that it can be accessed. The latter is expressed by the
/// [`Dependencies`] trait.
///
/// # Safety
/// `CanId::ADDRESS` points to the start of the memory-mapped register block of
/// a sun4i-compatible CAN controller.
///
/// # Examples
/// ```no_run
/// use sunxi_can_core::CanId;
///
/// pub enum Can0 {}
///
/// unsafe impl CanId for Can0 {
///     const ADDRESS: *const () = 0x01C2_BC00 as *const _;
/// }
/// ```
pub unsafe trait CanId {
    /// Static address of the register block of the corresponding controller
    const ADDRESS: *const ();
}

/// Trait representing CAN controller dependencies
///
/// Structs implementing [`Dependencies`] should
/// - enclose all object representable dependencies of [`CanId`] (bus clock
///   gate, pins, interrupt line) and release them upon destruction
/// - be constructible only when it is safe and sound to interact with the
///   controller (clock gate opened, pins muxed to the CAN function)
/// - be a singleton (only a single instance of [`Dependencies`] for a specific
///   [`CanId`] must exist at the same time)
///
/// in order to prevent aliasing and guarantee that the driver is the sole
/// owner of the register block.
///
/// # Safety
/// While [`Dependencies`] type instance exists
/// - the CAN clock must not change
/// - CAN related pins modes must not change
/// - the register block must not be accessible by the application developer
///   or accessed in other parts of the target HAL
pub unsafe trait Dependencies<Id: CanId> {
    /// Frequency of the clock feeding the controller. Bit timing prescalers
    /// divide this clock.
    fn can_clock(&self) -> HertzU32;

    /// Blocks the calling context for at least `duration`.
    ///
    /// The driver uses this to space out polls of slow hardware
    /// acknowledgements. It is never called from the interrupt dispatcher.
    fn delay(&mut self, duration: MicrosDurationU32);

    /// Current value of a monotonic clock.
    fn now(&self) -> Instant;
}
