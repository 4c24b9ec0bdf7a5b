//! Packet sizing and the two alternating write payloads.
//!
//! Sizing rule (ATT MTU → write payload length):
//! ```text
//! MTU <  247        : MTU - 3   (fits one LL PDU with DLE)
//! 247 <= MTU < 498  : 244       (exactly one 251-byte LL PDU)
//! MTU >= 498        : 495       (two LL PDUs, 244 + 251, no waste)
//! ```

use crate::config::{
    ATT_HEADER, DATA_PACKET_SIZE_1, DATA_PACKET_SIZE_2, DESCENDING_SEED, MAX_PACKET_SIZE,
};

/// Derive the write payload length from the negotiated ATT MTU.
pub const fn packet_size(att_mtu: u16) -> u16 {
    if att_mtu < DATA_PACKET_SIZE_1 + ATT_HEADER {
        att_mtu.saturating_sub(ATT_HEADER)
    } else if att_mtu < DATA_PACKET_SIZE_2 + ATT_HEADER {
        DATA_PACKET_SIZE_1
    } else {
        DATA_PACKET_SIZE_2
    }
}

/// Which of the two payload buffers the next write uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadSlot {
    /// `0, 1, 2, ...`
    #[default]
    Ascending,
    /// `243, 242, 241, ...` (wrapping past zero)
    Descending,
}

impl PayloadSlot {
    pub fn other(self) -> Self {
        match self {
            PayloadSlot::Ascending => PayloadSlot::Descending,
            PayloadSlot::Descending => PayloadSlot::Ascending,
        }
    }
}

/// Fixed payload patterns plus the alternating selector bit.
///
/// The selector lives for the whole process; it is not reset on reconnect.
pub struct PayloadBuffers {
    ascending: [u8; MAX_PACKET_SIZE],
    descending: [u8; MAX_PACKET_SIZE],
    next: PayloadSlot,
}

impl PayloadBuffers {
    pub const fn new() -> Self {
        let mut ascending = [0u8; MAX_PACKET_SIZE];
        let mut descending = [0u8; MAX_PACKET_SIZE];
        let mut i = 0;
        while i < MAX_PACKET_SIZE {
            ascending[i] = i as u8;
            descending[i] = DESCENDING_SEED.wrapping_sub(i as u8);
            i += 1;
        }
        Self {
            ascending,
            descending,
            next: PayloadSlot::Ascending,
        }
    }

    /// Slot the next write will be sourced from.
    pub fn next_slot(&self) -> PayloadSlot {
        self.next
    }

    /// First `len` bytes of the currently selected buffer.
    pub fn current(&self, len: usize) -> &[u8] {
        let len = len.min(MAX_PACKET_SIZE);
        match self.next {
            PayloadSlot::Ascending => &self.ascending[..len],
            PayloadSlot::Descending => &self.descending[..len],
        }
    }

    /// Switch to the other buffer. Only called after an accepted write.
    pub fn flip(&mut self) {
        self.next = self.next.other();
    }
}

impl Default for PayloadBuffers {
    fn default() -> Self {
        Self::new()
    }
}
