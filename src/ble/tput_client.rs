//! BLE GATT client for the throughput service.
//!
//! After the GAP connection and MTU exchange, this module:
//! 1. Discovers the throughput service by its 128-bit UUID.
//! 2. Derives the service handle (the CCCD and write handles sit at
//!    fixed offsets from it, see `config`).
//! 3. Writes the CCCD to turn server notifications on or off.
//! 4. Counts received notification bytes until the connection drops.

use crate::config::TPUT_SERVICE_UUID;
use crate::error::BleError;
use crate::tput::{ConnectionId, NotifyConfig};
use defmt::{debug, info, warn};
use nrf_softdevice::ble::gatt_client::{
    self, Characteristic, Descriptor, DiscoverError, HvxType, WriteError,
};
use nrf_softdevice::ble::{Connection, Uuid};

/// Hand-rolled client: the service is located by UUID, characteristics
/// are addressed by their offset from the service declaration.
pub struct TputServiceClient {
    service_handle: Option<u16>,
}

impl TputServiceClient {
    /// Handle of the service declaration.
    pub fn service_handle(&self) -> Option<u16> {
        self.service_handle
    }
}

impl gatt_client::Client for TputServiceClient {
    /// Payload length of one notification.
    type Event = usize;

    fn uuid() -> Uuid {
        Uuid::new_128(&TPUT_SERVICE_UUID)
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            service_handle: None,
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        _descriptors: &[Descriptor],
    ) {
        // Service declaration precedes its first characteristic declaration.
        let candidate = characteristic.handle_decl.saturating_sub(1);
        debug!(
            "characteristic decl={} value={}",
            characteristic.handle_decl, characteristic.handle_value
        );
        self.service_handle = Some(match self.service_handle {
            Some(current) => current.min(candidate),
            None => candidate,
        });
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        match self.service_handle {
            Some(_) => Ok(()),
            None => Err(DiscoverError::ServiceIncomplete),
        }
    }

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        _handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        match type_ {
            HvxType::Notification => Some(data.len()),
            _ => None,
        }
    }
}

/// Discover the throughput service on the connected peripheral.
pub async fn discover(conn: &Connection) -> Result<(TputServiceClient, u16), BleError> {
    info!("Discovering throughput service...");

    let client: TputServiceClient = gatt_client::discover(conn)
        .await
        .map_err(|_| BleError::DiscoveryFailed)?;

    let handle = client
        .service_handle()
        .ok_or(BleError::DiscoveryFailed)?;

    info!("Custom throughput service found (handle {})", handle);
    Ok((client, handle))
}

/// Write the CCCD described by `config` (write request, waits for the
/// response).
pub async fn write_cccd(conn: &Connection, config: &NotifyConfig) -> Result<(), BleError> {
    gatt_client::write(conn, config.cccd_handle, &config.cccd_value())
        .await
        .map_err(|e| {
            warn!("CCCD update failed. Error: {:?}", e);
            match e {
                WriteError::Raw(raw) => BleError::Raw(raw as u32),
                _ => BleError::NotifyFailed,
            }
        })
}

/// Count notifications until the connection drops.
pub async fn run_notification_loop(conn: &Connection, id: ConnectionId, client: &TputServiceClient) {
    info!("Notification loop started");

    let _disconnected = gatt_client::run(conn, client, |len| {
        if crate::ble::with_state(|s| s.on_notification(id, len)).is_err() {
            debug!("notification for stale connection dropped");
        }
    })
    .await;

    info!("Notification loop ended (connection closed)");
}
