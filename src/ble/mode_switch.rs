//! Trigger worker: turns button presses into scans or mode changes.
//!
//! A mode change stops writes at once. The CCCD write for the new mode
//! goes out after `MODE_SETTLE_MS`, and writes resume only when it
//! succeeds. A second press or a disconnect during the settle delay
//! drops the pending CCCD write.

use defmt::{info, warn};
use embassy_futures::select::{select3, Either3};
use embassy_time::{Duration, Timer};

use crate::ble::tput_client::write_cccd;
use crate::ble::{connection, publish, with_state, StatusEvent, LINK_DOWN, SCAN_REQUEST, TRIGGER};
use crate::config::MODE_SETTLE_MS;
use crate::error::Error;
use crate::tput::{NotifyConfig, TriggerAction};

#[embassy_executor::task]
pub async fn mode_switch_task() -> ! {
    let mut pending: Option<NotifyConfig> = None;

    loop {
        let pressed = match pending.take() {
            None => {
                TRIGGER.wait().await;
                true
            }
            Some(config) => {
                let settle = Timer::after(Duration::from_millis(MODE_SETTLE_MS));
                match select3(settle, TRIGGER.wait(), LINK_DOWN.wait()).await {
                    Either3::First(()) => {
                        apply(config).await;
                        false
                    }
                    Either3::Second(()) => true,
                    Either3::Third(()) => false,
                }
            }
        };

        if pressed {
            pending = handle_trigger();
        }
    }
}

fn handle_trigger() -> Option<NotifyConfig> {
    match with_state(|s| s.on_trigger()) {
        TriggerAction::StartScan => {
            info!("Start scanning");
            SCAN_REQUEST.signal(());
            None
        }
        TriggerAction::AlreadyScanning => {
            info!("Scan already in progress");
            None
        }
        TriggerAction::ModeChanged { mode, config } => {
            info!("Transfer mode: {}", mode.label());
            publish(StatusEvent::Mode(mode));
            // A stale link-down must not cancel this settle delay.
            LINK_DOWN.reset();
            config
        }
    }
}

async fn apply(config: NotifyConfig) {
    if !with_state(|s| s.notify_config_current(&config)) {
        return;
    }
    let Some(conn) = connection() else {
        return;
    };

    let result = write_cccd(&conn, &config).await;

    match with_state(|s| s.on_notify_config_complete(&config, result)) {
        Ok(true) => info!("Notifications {}, writes enabled", on_off(config.enable)),
        Ok(false) => info!("Notifications {}", on_off(config.enable)),
        Err(Error::TransportFailed(e)) => {
            warn!("Notification toggle failed, writes stay off: {:?}", e);
            publish(StatusEvent::Error(e));
        }
        Err(Error::ResourceExhausted) => {
            warn!("No SoftDevice buffer for the CCCD write, writes stay off");
        }
        Err(_) => info!("Superseded notification toggle ignored"),
    }
}

fn on_off(enable: bool) -> &'static str {
    if enable {
        "on"
    } else {
        "off"
    }
}
