//! Frame layout in the transmit/receive buffer slots
//!
//! Every slot is an 8-bit register. Slot 0 holds the frame information byte,
//! followed by the identifier left-aligned and most significant byte first,
//! followed by the data bytes.
//!
//! ```text
//!            slot 0      1        2        3        4        5..=12
//! standard   info     id 10:3  id 2:0   data...
//! extended   info     id 28:21 id 20:13 id 12:5  id 4:0   data...
//! ```

use super::{dlc_to_len, id_from_raw, CanFrame, MAX_DLC};
use bitfield::bitfield;
use embedded_can::Frame as _;

bitfield! {
    /// Frame information byte, buffer slot 0
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct FrameInfo(u8);
    impl Debug;

    /// Data length code
    pub u8, dlc, set_dlc: 3, 0;
    /// Remote transmission request
    pub remote, set_remote: 6;
    /// Extended (29-bit) identifier
    pub extended, set_extended: 7;
}

/// Placement of the identifier and the payload for one identifier format
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    /// Width of the identifier in bits
    pub id_bits: u32,
    /// Number of slots holding the identifier, starting at slot 1
    pub id_slots: u8,
}

impl FrameLayout {
    /// 11-bit identifier in slots 1..=2
    pub const STANDARD: Self = Self {
        id_bits: 11,
        id_slots: 2,
    };

    /// 29-bit identifier in slots 1..=4
    pub const EXTENDED: Self = Self {
        id_bits: 29,
        id_slots: 4,
    };

    /// Layout for the given identifier format
    pub const fn new(extended: bool) -> Self {
        if extended {
            Self::EXTENDED
        } else {
            Self::STANDARD
        }
    }

    /// Slot holding the first data byte
    pub const fn data_offset(&self) -> u8 {
        1 + self.id_slots
    }

    /// Unused low bits of the identifier slots
    const fn id_shift(&self) -> u32 {
        self.id_slots as u32 * 8 - self.id_bits
    }

    fn write_id(&self, raw: u32, write: &mut impl FnMut(u8, u8)) {
        let aligned = raw << self.id_shift();
        for i in 0..self.id_slots {
            let shift = 8 * u32::from(self.id_slots - 1 - i);
            write(1 + i, (aligned >> shift) as u8);
        }
    }

    fn read_id(&self, read: &mut impl FnMut(u8) -> u8) -> u32 {
        let aligned = (0..self.id_slots).fold(0u32, |id, i| id << 8 | u32::from(read(1 + i)));
        aligned >> self.id_shift()
    }
}

/// Serializes `frame` into buffer slots through `write(slot, byte)`.
///
/// Slots are written in ascending order and only as far as the frame
/// reaches.
pub fn encode(frame: &CanFrame, mut write: impl FnMut(u8, u8)) {
    let layout = FrameLayout::new(frame.is_extended());
    let mut info = FrameInfo(0);
    info.set_extended(frame.is_extended());
    info.set_remote(frame.is_remote_frame());
    info.set_dlc(frame.length_code());
    write(0, info.0);
    layout.write_id(frame.raw_id(), &mut write);
    for (i, byte) in frame.data().iter().enumerate() {
        write(layout.data_offset() + i as u8, *byte);
    }
}

/// Deserializes a frame from buffer slots through `read(slot)`.
///
/// The data slots of remote frames are never read.
pub fn decode(mut read: impl FnMut(u8) -> u8) -> CanFrame {
    let info = FrameInfo(read(0));
    let layout = FrameLayout::new(info.extended());
    let id = id_from_raw(layout.read_id(&mut read), info.extended());
    let mut frame = CanFrame {
        id,
        remote: info.remote(),
        dlc: dlc_to_len(info.dlc()),
        data: [0; MAX_DLC as usize],
    };
    if !frame.remote {
        let offset = layout.data_offset();
        for (i, byte) in frame.data[..usize::from(frame.dlc)].iter_mut().enumerate() {
            *byte = read(offset + i as u8);
        }
    }
    frame
}
