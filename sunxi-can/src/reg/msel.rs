//! Mode select register (`MSEL`)

use bitfield::bitfield;

bitfield! {
    /// Operating mode of the controller
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct ModeSelect(u32);
    impl Debug;

    /// Reset mode. The bus is idle and the reset-only registers accept writes.
    pub reset, set_reset: 0;
    /// Listen-only mode; the controller never drives the bus
    pub listen_only, set_listen_only: 1;
    /// Internal loopback
    pub loopback, set_loopback: 2;
    /// Single acceptance filter
    pub single_filter, set_single_filter: 3;
    /// Sleep mode
    pub sleep, set_sleep: 4;
    /// Wake up from sleep
    pub wake_up, set_wake_up: 5;
}
