//! Handling of messages/frames

pub mod layout;

use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Largest data length code of a classic CAN frame
pub const MAX_DLC: u8 = 8;

/// Classic CAN frame
///
/// Data frames carry exactly `dlc` bytes. Remote frames carry a requested
/// length in `dlc` and no data. Unused data bytes are always zero, so two
/// frames compare equal exactly when they look the same on the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    remote: bool,
    dlc: u8,
    data: [u8; MAX_DLC as usize],
}

impl CanFrame {
    /// Identifier without the format flag: 11 bits for standard frames, 29
    /// bits for extended frames
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw().into(),
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Data length code, 0..=8
    pub fn length_code(&self) -> u8 {
        self.dlc
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > usize::from(MAX_DLC) {
            return None;
        }
        let mut frame = Self {
            id: id.into(),
            remote: false,
            dlc: data.len() as u8,
            data: [0; MAX_DLC as usize],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Some(frame)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > usize::from(MAX_DLC) {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            dlc: dlc as u8,
            data: [0; MAX_DLC as usize],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc.into()
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..usize::from(self.dlc)]
        }
    }
}

/// Builds the identifier from the raw bits held by the controller
pub(crate) fn id_from_raw(raw: u32, extended: bool) -> Id {
    if extended {
        // The mask ensures the ID is in range for a 29-bit integer
        Id::Extended(unsafe { ExtendedId::new_unchecked(raw & ExtendedId::MAX.as_raw()) })
    } else {
        // The mask ensures the ID is in range for a 11-bit integer
        Id::Standard(unsafe { StandardId::new_unchecked(raw as u16 & StandardId::MAX.as_raw()) })
    }
}

/// Converts a data length code to a length in bytes. Codes above 8 are valid
/// on the wire for classic frames and mean 8 bytes.
pub fn dlc_to_len(dlc: u8) -> u8 {
    match dlc {
        0..=8 => dlc,
        9.. => MAX_DLC,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_rejects_too_much_data() {
        let id = StandardId::new(0x10).unwrap();
        assert!(CanFrame::new(id, &[0; 9]).is_none());
        assert!(CanFrame::new_remote(id, 9).is_none());
    }

    #[test]
    fn remote_frame_has_no_data() {
        let frame = CanFrame::new_remote(StandardId::new(0x10).unwrap(), 4).unwrap();
        assert_eq!(frame.dlc(), 4);
        assert!(frame.data().is_empty());
        assert!(frame.is_remote_frame());
    }

    #[test]
    fn raw_id_drops_format() {
        let frame = CanFrame::new(ExtendedId::new(0x1234_5678).unwrap(), &[1]).unwrap();
        assert_eq!(frame.raw_id(), 0x1234_5678);
        assert!(frame.is_extended());
        assert_eq!(id_from_raw(0xffff_ffff, false), Id::Standard(StandardId::MAX));
        assert_eq!(id_from_raw(0xffff_ffff, true), Id::Extended(ExtendedId::MAX));
    }

    #[test]
    fn dlc_above_eight_means_eight_bytes() {
        assert_eq!(dlc_to_len(0), 0);
        assert_eq!(dlc_to_len(8), 8);
        assert_eq!(dlc_to_len(9), 8);
        assert_eq!(dlc_to_len(15), 8);
    }
}
