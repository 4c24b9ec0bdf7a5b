//! Application-wide constants and compile-time configuration.
//!
//! Peer identity, GATT layout, timing parameters, and link tuning
//! live here so they can be tuned in one place.

// Peer / GATT layout

/// Complete local name the throughput server advertises.
pub const PEER_NAME: &[u8] = b"TPUT";

/// Throughput service UUID `1aec0d20-5d1e-43d3-af17-080732cb7bcc`,
/// little-endian byte order as it appears on air.
pub const TPUT_SERVICE_UUID: [u8; 16] = [
    0xCC, 0x7B, 0xCB, 0x32, 0x07, 0x08, 0x17, 0xAF, 0xD3, 0x43, 0x1E, 0x5D, 0x20, 0x0D, 0xEC, 0x1A,
];

/// CCCD of the notify characteristic, relative to the service handle.
pub const CCCD_HANDLE_OFFSET: u16 = 3;

/// Value handle of the write characteristic, relative to the service handle.
pub const WRITE_HANDLE_OFFSET: u16 = 5;

/// CCCD value length (bytes).
pub const CCCD_LEN: usize = 2;

// ATT / packet sizing

/// ATT header deducted from the MTU (1 byte opcode + 2 byte handle).
pub const ATT_HEADER: u16 = 3;

/// Packet size that fills one 251-byte LL PDU after L2CAP + ATT headers.
pub const DATA_PACKET_SIZE_1: u16 = 244;

/// Packet size spanning exactly two LL PDUs (244 + 251).
pub const DATA_PACKET_SIZE_2: u16 = 495;

/// Largest write payload ever produced.
pub const MAX_PACKET_SIZE: usize = DATA_PACKET_SIZE_2 as usize;

/// ATT MTU requested in the MTU exchange.
pub const REQUESTED_ATT_MTU: u16 = 512;

/// First byte of the descending payload buffer.
pub const DESCENDING_SEED: u8 = 243;

// Timing

/// Write scheduler cadence (ms).
pub const WRITE_TICK_MS: u64 = 1;

/// Rate report period (ms).
pub const REPORT_PERIOD_MS: u64 = 1000;

/// Delay between a mode change and the CCCD write, so an in-flight
/// notification-enable write can land first (ms).
pub const MODE_SETTLE_MS: u64 = 2000;

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// Scan window before giving up on finding the peer (seconds).
pub const BLE_SCAN_DURATION_SECS: u64 = 30;

// Link tuning

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms, 12 = 15 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Connection interval unit in microseconds.
pub const CONN_INTERVAL_UNIT_US: u32 = 1250;

/// LL data length requested after connect (octets).
pub const LL_MAX_OCTETS: u16 = 251;

/// LL time for `LL_MAX_OCTETS` on the 1M PHY (µs).
pub const LL_MAX_TIME_US: u16 = 2120;

/// GAP event length reserved per connection (1.25 ms units).
pub const GAP_EVENT_LENGTH: u16 = 320;

/// Write-command TX queue depth given to the SoftDevice.
pub const WRITE_CMD_TX_QUEUE_SIZE: u8 = 8;

// Status LED

/// Blink half-period while scanning (ms). 500 = 1 Hz.
pub const LED_BLINK_HALF_PERIOD_MS: u64 = 500;
