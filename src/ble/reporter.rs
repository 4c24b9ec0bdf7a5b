//! 1 s rate reporter.

use defmt::info;
use embassy_time::{Duration, Ticker};

use crate::ble::{publish, with_state, StatusEvent};
use crate::config::REPORT_PERIOD_MS;

#[embassy_executor::task]
pub async fn reporter_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(REPORT_PERIOD_MS));

    loop {
        ticker.next().await;

        let report = with_state(|s| s.report_tick());
        if report.is_empty() {
            continue;
        }

        if let Some(rx) = report.rx_kbps {
            info!("GATT NOTIFICATION : Client Throughput (RX) = {} kbps", rx);
        }
        if let Some(tx) = report.tx_kbps {
            info!("GATT WRITE        : Client Throughput (TX) = {} kbps", tx);
        }
        publish(StatusEvent::Rates(report));
    }
}
