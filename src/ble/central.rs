//! Link owner: scan, connect, set up the link and hold it until it drops.
//!
//! Sequence per connection:
//! 1. Wait for a scan request from the trigger worker.
//! 2. Scan for `TPUT`, connect to the first match.
//! 3. Tune the link (data length, 2M PHY), exchange the ATT MTU.
//! 4. Discover the throughput service and apply the current mode's
//!    notification setting.
//! 5. Count notifications until the link drops, then reset everything.
//!
//! MTU exchange or discovery failures are not retried: the link is
//! closed and a new trigger press is needed.

use defmt::{error, info, warn};
use embassy_time::{with_timeout, Duration};
use nrf_softdevice::ble::{central, gatt_client, Address, Connection, PhySet};
use nrf_softdevice::{raw, Softdevice};

use crate::ble::tput_client::{self, TputServiceClient};
use crate::ble::{
    publish, scanner, set_connection, with_state, StatusEvent, CONGESTION_CLEARED, LINK_DOWN,
    SCAN_REQUEST,
};
use crate::config::{
    BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN, BLE_SCAN_DURATION_SECS, BLE_SLAVE_LATENCY,
    BLE_SUP_TIMEOUT, LL_MAX_OCTETS, LL_MAX_TIME_US, REQUESTED_ATT_MTU,
};
use crate::error::BleError;
use crate::tput::{ConnectionId, LinkPhase, PeerAddress, Phy};

#[embassy_executor::task]
pub async fn link_task(sd: &'static Softdevice) -> ! {
    loop {
        SCAN_REQUEST.wait().await;

        with_state(|s| s.on_scan_started());
        publish(StatusEvent::Phase(LinkPhase::Scanning));

        let conn = match find_and_connect(sd).await {
            Ok(conn) => conn,
            Err(e) => {
                if let Some(e) = e {
                    publish(StatusEvent::Error(e));
                }
                with_state(|s| s.on_scan_stopped());
                publish(StatusEvent::Phase(LinkPhase::Idle));
                continue;
            }
        };

        hold_link(conn).await;

        set_connection(None);
        let previous = with_state(|s| s.on_link_down());
        LINK_DOWN.signal(());
        // The gate is open again; don't leave the pump parked.
        CONGESTION_CLEARED.signal(());
        publish(StatusEvent::Phase(LinkPhase::Idle));

        info!(
            "Disconnected from {:02x} (MTU was {})",
            previous.peer.0, previous.mtu
        );
    }
}

/// `Err(None)` means the scan window closed without finding the peer.
async fn find_and_connect(sd: &Softdevice) -> Result<Connection, Option<BleError>> {
    let address = match scanner::find_peer(sd).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            info!("Peer not found, press the button to scan again");
            return Err(None);
        }
        Err(e) => return Err(Some(e)),
    };

    connect(sd, &address).await.map_err(Some)
}

async fn connect(sd: &Softdevice, address: &Address) -> Result<Connection, BleError> {
    info!("Connecting to {}...", address);

    let whitelist = [address];
    let config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: BLE_CONN_INTERVAL_MIN,
            max_conn_interval: BLE_CONN_INTERVAL_MAX,
            slave_latency: BLE_SLAVE_LATENCY,
            conn_sup_timeout: BLE_SUP_TIMEOUT,
        },
    };

    let timeout = Duration::from_secs(BLE_SCAN_DURATION_SECS);
    match with_timeout(timeout, central::connect(sd, &config)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => {
            error!("Connection failed: {:?}", e);
            Err(BleError::ConnectFailed)
        }
        Err(_) => {
            warn!("Connection attempt timed out");
            Err(BleError::ConnectFailed)
        }
    }
}

/// Returns once the link is gone.
async fn hold_link(mut conn: Connection) {
    let Some(handle) = conn.handle() else {
        warn!("Link dropped before setup");
        return;
    };
    let id = ConnectionId(handle);
    let peer = PeerAddress(conn.peer_address().bytes());

    if with_state(|s| s.on_link_up(id, peer)).is_err() {
        error!("Link up while another link is tracked, closing it");
        let _ = conn.disconnect();
        return;
    }
    set_connection(Some(conn.clone()));
    publish(StatusEvent::Phase(LinkPhase::Connected));
    info!("Connected, conn handle {}", handle);

    tune_link(&mut conn, id);

    let client = match set_up_service(&conn, id).await {
        Ok(client) => client,
        Err(e) => {
            error!("Link setup failed: {:?}, disconnecting", e);
            publish(StatusEvent::Error(e));
            let _ = conn.disconnect();
            return;
        }
    };

    tput_client::run_notification_loop(&conn, id, &client).await;
}

fn tune_link(conn: &mut Connection, id: ConnectionId) {
    if let Ok(interval_us) = with_state(|s| s.on_conn_params_updated(id, BLE_CONN_INTERVAL_MAX)) {
        info!("Connection interval: up to {} us", interval_us);
    }

    if conn
        .data_length_update(Some(&raw::ble_gap_data_length_params_t {
            max_tx_octets: LL_MAX_OCTETS,
            max_rx_octets: LL_MAX_OCTETS,
            max_tx_time_us: LL_MAX_TIME_US,
            max_rx_time_us: LL_MAX_TIME_US,
        }))
        .is_err()
    {
        warn!("data_length_update error");
    }

    if conn.phy_update(PhySet::M2, PhySet::M2).is_err() {
        warn!("phy_update error");
    } else if with_state(|s| s.on_phy_updated(id, Phy::Le2M, Phy::Le2M)).is_ok() {
        info!("PHY: {} Msym/s", Phy::Le2M.mega_symbols());
    }
}

/// MTU exchange, service discovery and the first CCCD write.
async fn set_up_service(conn: &Connection, id: ConnectionId) -> Result<TputServiceClient, BleError> {
    gatt_client::att_mtu_exchange(conn, REQUESTED_ATT_MTU)
        .await
        .map_err(|e| {
            warn!("MTU exchange failed: {:?}", e);
            BleError::MtuExchangeFailed
        })?;

    let mtu = conn.att_mtu();
    let request = with_state(|s| s.on_mtu_negotiated(id, mtu))
        .map_err(|_| BleError::MtuExchangeFailed)?;
    info!("ATT MTU {} -> packet size {}", mtu, request.packet_size);

    let (client, service_handle) = tput_client::discover(conn).await?;

    let config = with_state(|s| s.on_service_discovered(id, service_handle))
        .map_err(|_| BleError::DiscoveryFailed)?;

    let result = tput_client::write_cccd(conn, &config).await;
    match with_state(|s| s.on_notify_config_complete(&config, result)) {
        Ok(writes) => info!(
            "Throughput service ready (notify {}, writes {})",
            config.enable, writes
        ),
        // Mode stays, writes stay off until the next trigger.
        Err(e) => warn!("Initial notification setup: {:?}", e),
    }

    Ok(client)
}
