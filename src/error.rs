//! Unified error type for the throughput client.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The transport cannot take another outbound write right now.
    /// Recoverable: the congestion gate closes until it clears.
    TransportRejected,

    /// A collaborator operation failed (discovery, MTU, CCCD toggle...).
    /// Logged; the operation is abandoned until the next trigger or reconnect.
    TransportFailed(BleError),

    /// No buffer available for an outbound control write.
    ResourceExhausted,

    /// Event does not match the current connection / mode state
    /// (stale connection, stale mode epoch, unknown handle).
    StateInconsistent,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// GAP / GATT raw error code from the SoftDevice.
    Raw(u32),
    /// Scan was cancelled or could not start.
    ScanFailed,
    /// Connection attempt failed.
    ConnectFailed,
    /// ATT MTU exchange could not be requested or failed.
    MtuExchangeFailed,
    /// Throughput service was not found.
    DiscoveryFailed,
    /// CCCD enable/disable write failed.
    NotifyFailed,
    /// Write command rejected for a reason other than congestion.
    WriteFailed,
}

/// SoftDevice `NRF_ERROR_NO_MEM`: no buffer left for the request.
pub const NRF_ERROR_NO_MEM: u32 = 4;

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        match e {
            BleError::Raw(NRF_ERROR_NO_MEM) => Error::ResourceExhausted,
            e => Error::TransportFailed(e),
        }
    }
}
