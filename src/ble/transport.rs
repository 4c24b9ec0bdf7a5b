//! SoftDevice side of the write path.
//!
//! `SoftDeviceTransport` hands write commands to the SoftDevice TX queue.
//! The SoftDevice has no "queue drained" callback for the application,
//! so congestion is cleared by [`congestion_task`]: once the pump reports
//! a full queue it waits one connection interval (the queue empties at
//! every connection event) and then reopens the gate.

use defmt::{debug, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use nrf_softdevice::ble::gatt_client::{self, TryWriteError};
use nrf_softdevice::ble::Connection;

use crate::ble::{with_state, CONGESTION_CLEARED};
use crate::config::CONN_INTERVAL_UNIT_US;
use crate::error::BleError;
use crate::tput::{GattTransport, SubmitOutcome, WriteCommand};

/// Raised by the write pump when a submission came back congested.
pub static CONGESTED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub struct SoftDeviceTransport<'a> {
    conn: &'a Connection,
}

impl<'a> SoftDeviceTransport<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl GattTransport for SoftDeviceTransport<'_> {
    fn send_write(&mut self, cmd: WriteCommand) -> SubmitOutcome {
        // Write command: no ATT response, the SoftDevice copies the payload.
        match gatt_client::try_write_without_response(self.conn, cmd.handle, &cmd.payload) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TryWriteError::BufferFull) => SubmitOutcome::Congested,
            Err(e) => {
                warn!("write command rejected: {:?}", e);
                SubmitOutcome::Failed(BleError::WriteFailed)
            }
        }
    }

    // WRITE_CMD_TX_COMPLETE never reaches the application; a queued write
    // is as confirmed as it gets.
    fn confirms_on_accept(&self) -> bool {
        true
    }
}

/// Reopens the congestion gate one connection event after it closed.
#[embassy_executor::task]
pub async fn congestion_task() -> ! {
    loop {
        CONGESTED.wait().await;

        let interval_us = with_state(|s| s.link().conn_interval_us).max(CONN_INTERVAL_UNIT_US);
        Timer::after_micros(u64::from(interval_us)).await;

        if with_state(|s| s.on_congestion_cleared()) {
            debug!("TX queue drained, resuming writes");
            CONGESTION_CLEARED.signal(());
        }
    }
}
