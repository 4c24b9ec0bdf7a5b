//! State of the single BLE link.

use crate::config::{CCCD_HANDLE_OFFSET, CONN_INTERVAL_UNIT_US, WRITE_HANDLE_OFFSET};

use super::packet::packet_size;

/// Connection handle assigned by the BLE stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(pub u16);

/// 48-bit BLE device address, little-endian as delivered by the stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress(pub [u8; 6]);

/// LE PHY in use for one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phy {
    #[default]
    Unknown,
    Le1M,
    Le2M,
    LeCoded,
}

impl Phy {
    /// Symbol rate in Msym/s for log lines (0 when unknown, 1 for Coded).
    pub fn mega_symbols(self) -> u8 {
        match self {
            Phy::Unknown => 0,
            Phy::Le1M | Phy::LeCoded => 1,
            Phy::Le2M => 2,
        }
    }
}

/// GATT handles of the throughput service, derived from the service handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandles {
    pub service: u16,
    pub cccd: u16,
    pub write: u16,
}

impl ServiceHandles {
    pub fn from_service(service: u16) -> Self {
        Self {
            service,
            cccd: service.wrapping_add(CCCD_HANDLE_OFFSET),
            write: service.wrapping_add(WRITE_HANDLE_OFFSET),
        }
    }
}

/// Scan and connection status folded into one value (drives the LED).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkPhase {
    #[default]
    Idle,
    Scanning,
    Connected,
}

/// Everything known about the active link. All-default when disconnected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub conn: Option<ConnectionId>,
    pub peer: PeerAddress,
    pub mtu: u16,
    pub packet_size: u16,
    pub rx_phy: Phy,
    pub tx_phy: Phy,
    /// Connection interval in microseconds.
    pub conn_interval_us: u32,
    pub service: Option<ServiceHandles>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// True if `conn` is the link we are tracking.
    pub fn is_current(&self, conn: ConnectionId) -> bool {
        self.conn == Some(conn)
    }

    pub fn link_up(&mut self, conn: ConnectionId, peer: PeerAddress) {
        *self = Self {
            conn: Some(conn),
            peer,
            ..Self::default()
        };
    }

    /// Store the negotiated MTU and derive the packet size from it.
    pub fn set_mtu(&mut self, mtu: u16) -> u16 {
        self.mtu = mtu;
        self.packet_size = packet_size(mtu);
        self.packet_size
    }

    pub fn set_phys(&mut self, rx: Phy, tx: Phy) {
        self.rx_phy = rx;
        self.tx_phy = tx;
    }

    /// `units` are 1.25 ms steps as reported by the controller.
    pub fn set_conn_interval(&mut self, units: u16) {
        self.conn_interval_us = u32::from(units) * CONN_INTERVAL_UNIT_US;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
