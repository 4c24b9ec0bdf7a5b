//! BLE GAP scanner - finds the throughput server.
//!
//! Uses the SoftDevice Central-role scanning API. The first advertiser
//! whose Complete Local Name is `TPUT` stops the scan. The scan window is
//! enforced with a timeout around the whole scan, so it also ends when
//! nothing advertises at all.

use crate::ble::adv_parser::{has_complete_name, local_name};
use crate::config::{BLE_SCAN_DURATION_SECS, PEER_NAME};
use crate::error::BleError;
use defmt::{info, warn};
use embassy_time::{with_timeout, Duration};
use nrf_softdevice::ble::{central, Address};
use nrf_softdevice::Softdevice;

/// Scan for up to `BLE_SCAN_DURATION_SECS` seconds.
///
/// Returns `Ok(None)` when the window closes without a match.
pub async fn find_peer(sd: &Softdevice) -> Result<Option<Address>, BleError> {
    info!("Scanning..... ({} s window)", BLE_SCAN_DURATION_SECS);

    let config = central::ScanConfig {
        // Active scan so names carried in scan responses are seen too.
        active: true,
        ..Default::default()
    };

    let window = Duration::from_secs(BLE_SCAN_DURATION_SECS);

    let scan = central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        if has_complete_name(data, PEER_NAME) {
            let address = Address::from_raw(params.peer_addr);
            info!(
                "Found peer {=[u8]:a} with BDA {} (RSSI {})",
                local_name(data).unwrap_or(&[]),
                address,
                params.rssi
            );
            return Some(address);
        }

        None
    });

    let result = match with_timeout(window, scan).await {
        Ok(result) => result.map(Some),
        Err(_) => {
            info!("Scan window closed");
            Ok(None)
        }
    };

    match result {
        Ok(found) => {
            info!("Scanning stopped");
            Ok(found)
        }
        Err(e) => {
            warn!("BLE scan ended with error: {:?}", e);
            Err(BleError::ScanFailed)
        }
    }
}
