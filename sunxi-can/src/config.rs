//! CAN controller configuration

use crate::reg::BitTimingRegister;
use core::ops::RangeInclusive;
use fugit::{HertzU32, MicrosDurationU32};

/// Configuration of the controller
#[derive(Copy, Clone, Debug)]
pub struct CanConfig {
    /// Bus participation mode applied whenever normal mode is entered
    pub mode: OperatingMode,
    /// Enable the bus error interrupt. Bus errors can fire on every erroneous
    /// frame, so it is off by default.
    pub bus_error_reporting: bool,
    /// Bit timing applied by the last successful [`set_bittiming`]
    ///
    /// [`set_bittiming`]: crate::bus::Can::set_bittiming
    pub bit_timing: BitTiming,
    /// Upper bound for each wait on the transmit buffer to become writable
    pub tx_timeout: MicrosDurationU32,
    /// The interrupt line is managed by the embedding caller, so opening and
    /// closing the device does not request or free it.
    pub custom_irq_handler: bool,
}

impl CanConfig {
    /// Create an instance with default values
    pub fn new() -> Self {
        Self {
            mode: Default::default(),
            bus_error_reporting: false,
            bit_timing: Default::default(),
            tx_timeout: MicrosDurationU32::millis(10),
            custom_irq_handler: false,
        }
    }
}

impl Default for CanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How the controller participates on the bus
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Regular transmission and reception
    #[default]
    Normal,
    /// Transmitted frames are received internally
    Loopback,
    /// Frames are received but never acknowledged; nothing is transmitted
    ListenOnly,
}

/// Bit-timing parameters
///
/// All values are *real* values in time quanta (the prescaler in clock
/// cycles); the subtractions the register expects are handled when encoding.
///
/// The bit time is `1 + prop_seg + phase_seg_1 + phase_seg_2` time quanta,
/// the first one being the synchronization segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitTiming {
    /// Clock cycles per time quantum
    pub prescaler: u16,
    /// Synchronization jump width
    pub sjw: u8,
    /// Propagation segment
    pub prop_seg: u8,
    /// Phase segment before the sample point
    pub phase_seg_1: u8,
    /// Phase segment after the sample point
    pub phase_seg_2: u8,
    /// Sample each bit three times instead of once
    pub triple_sampling: bool,
}

impl Default for BitTiming {
    fn default() -> Self {
        Self {
            prescaler: 1,
            sjw: 1,
            prop_seg: 1,
            phase_seg_1: 12,
            phase_seg_2: 2,
            triple_sampling: false,
        }
    }
}

/// Misconfigurations of [`BitTiming`].
#[derive(Debug, PartialEq, Eq)]
pub enum BitTimingError {
    /// Prescaler is outside the wrapped `RangeInclusive`
    PrescalerOutOfRange(RangeInclusive<u32>),
    /// SJW is outside the wrapped `RangeInclusive`
    SynchronizationJumpWidthOutOfRange(RangeInclusive<u32>),
    /// Propagation segment plus phase segment 1 is outside the wrapped
    /// `RangeInclusive`
    TimeSegment1OutOfRange(RangeInclusive<u32>),
    /// Phase segment 2 is outside the wrapped `RangeInclusive`
    PhaseSeg2OutOfRange(RangeInclusive<u32>),
}

/// Valid values of a BitTiming struct
#[derive(Clone)]
pub(crate) struct BitTimingRanges {
    prescaler: RangeInclusive<u32>,
    sjw: RangeInclusive<u32>,
    /// `prop_seg + phase_seg_1`
    tseg1: RangeInclusive<u32>,
    tseg2: RangeInclusive<u32>,
}

pub(crate) const BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    prescaler: 1..=64,
    sjw: 1..=4,
    tseg1: 1..=16,
    tseg2: 1..=8,
};

impl BitTiming {
    /// Time quanta between the synchronization segment and the sample point
    pub fn tseg1(&self) -> u32 {
        u32::from(self.prop_seg) + u32::from(self.phase_seg_1)
    }

    /// Returns the number of time quanta that make up one bit time, `t_bit /
    /// t_q`
    pub fn time_quanta_per_bit(&self) -> u32 {
        1 + self.tseg1() + u32::from(self.phase_seg_2)
    }

    /// Bus bitrate produced by these parameters when the controller runs from
    /// `can_clock`
    pub fn bitrate(&self, can_clock: HertzU32) -> HertzU32 {
        let divider = u32::from(self.prescaler.max(1)) * self.time_quanta_per_bit();
        HertzU32::from_raw(can_clock.to_Hz() / divider)
    }

    pub(crate) fn check(&self, valid: &BitTimingRanges) -> Result<(), BitTimingError> {
        if !valid.prescaler.contains(&self.prescaler.into()) {
            Err(BitTimingError::PrescalerOutOfRange(valid.prescaler.clone()))
        } else if !valid.sjw.contains(&self.sjw.into()) {
            Err(BitTimingError::SynchronizationJumpWidthOutOfRange(
                valid.sjw.clone(),
            ))
        } else if !valid.tseg1.contains(&self.tseg1()) {
            Err(BitTimingError::TimeSegment1OutOfRange(valid.tseg1.clone()))
        } else if !valid.tseg2.contains(&self.phase_seg_2.into()) {
            Err(BitTimingError::PhaseSeg2OutOfRange(valid.tseg2.clone()))
        } else {
            Ok(())
        }
    }

    /// Validates the parameters and packs them into the bus timing register
    /// format.
    pub fn encode(&self) -> Result<BitTimingRegister, BitTimingError> {
        self.check(&BIT_TIMING_RANGES)?;
        let mut reg = BitTimingRegister(0);
        reg.set_prescaler(self.prescaler - 1);
        reg.set_sjw(self.sjw - 1);
        // `check` bounds tseg1 to 16
        reg.set_tseg1(self.tseg1() as u8 - 1);
        reg.set_tseg2(self.phase_seg_2 - 1);
        reg.set_triple_sampling(self.triple_sampling);
        Ok(reg)
    }
}
