//! Byte counters and the per-second rate report.

/// Convert a byte count accumulated over one second into kbit/s
/// (`floor(bytes * 8 / 1000)`).
pub fn kbps(bytes: u32) -> u32 {
    (u64::from(bytes) * 8 / 1000) as u32
}

/// RX (notifications received) and TX (write commands completed) bytes
/// since the last report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteCounters {
    rx_bytes: u32,
    tx_bytes: u32,
}

impl ByteCounters {
    pub const fn new() -> Self {
        Self {
            rx_bytes: 0,
            tx_bytes: 0,
        }
    }

    pub fn rx_bytes(&self) -> u32 {
        self.rx_bytes
    }

    pub fn tx_bytes(&self) -> u32 {
        self.tx_bytes
    }

    pub fn add_rx(&mut self, bytes: u32) {
        self.rx_bytes = self.rx_bytes.saturating_add(bytes);
    }

    pub fn add_tx(&mut self, bytes: u32) {
        self.tx_bytes = self.tx_bytes.saturating_add(bytes);
    }

    pub fn clear_tx(&mut self) {
        self.tx_bytes = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Turn each non-zero counter into a rate and reset it. Zero counters
    /// produce no entry.
    pub fn drain(&mut self) -> RateReport {
        let rx_kbps = take_rate(&mut self.rx_bytes);
        let tx_kbps = take_rate(&mut self.tx_bytes);
        RateReport { rx_kbps, tx_kbps }
    }
}

fn take_rate(counter: &mut u32) -> Option<u32> {
    if *counter == 0 {
        return None;
    }
    let rate = kbps(*counter);
    *counter = 0;
    Some(rate)
}

/// One reporting interval's result. `None` means nothing to report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateReport {
    pub rx_kbps: Option<u32>,
    pub tx_kbps: Option<u32>,
}

impl RateReport {
    pub fn is_empty(&self) -> bool {
        self.rx_kbps.is_none() && self.tx_kbps.is_none()
    }
}
