//! 1 ms write worker.
//!
//! Each tick runs one `ThroughputState::pump` inside the state lock:
//! `try_write_without_response` never blocks, so building the write,
//! handing it to the SoftDevice and booking the answer happen in one
//! critical section. A closed congestion gate parks the worker on
//! `CONGESTION_CLEARED` instead of spinning on the tick.

use defmt::warn;
use embassy_time::{Duration, Ticker};

use crate::ble::transport::{SoftDeviceTransport, CONGESTED};
use crate::ble::{connection, publish, with_state, StatusEvent, CONGESTION_CLEARED};
use crate::config::WRITE_TICK_MS;
use crate::tput::PumpOutcome;

#[embassy_executor::task]
pub async fn write_pump_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(WRITE_TICK_MS));

    loop {
        ticker.next().await;

        let Some(conn) = connection() else {
            continue;
        };
        // The SoftDevice never reports TX completion, so TX bytes are counted
        // when it queues the write (SoftDeviceTransport::confirms_on_accept),
        // not when the packet leaves the radio.
        let mut transport = SoftDeviceTransport::new(&conn);

        match with_state(|s| s.pump(&mut transport)) {
            PumpOutcome::Idle | PumpOutcome::Sent => {}
            PumpOutcome::Blocked => {
                CONGESTED.signal(());
                CONGESTION_CLEARED.wait().await;
                ticker.reset();
            }
            PumpOutcome::Failed(e) => {
                warn!("Write command failed: {:?}", e);
                publish(StatusEvent::Error(e));
            }
        }
    }
}
