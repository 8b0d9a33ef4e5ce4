//! Bus timing register (`BTIME`)

use bitfield::bitfield;

bitfield! {
    /// Packed bit timing. Every field holds its value minus one.
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct BitTimingRegister(u32);
    impl Debug;

    /// Baud rate prescaler - 1
    pub u16, prescaler, set_prescaler: 9, 0;
    /// Synchronization jump width - 1
    pub u8, sjw, set_sjw: 15, 14;
    /// Propagation segment + phase segment 1 - 1
    pub u8, tseg1, set_tseg1: 19, 16;
    /// Phase segment 2 - 1
    pub u8, tseg2, set_tseg2: 22, 20;
    /// Sample the bus three times per bit
    pub triple_sampling, set_triple_sampling: 23;
}
