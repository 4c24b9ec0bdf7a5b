//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Central** role:
//!
//! 1. **Scanner** - finds the peer advertising the complete local name
//!    `TPUT`.
//! 2. **Central** - connects, tunes the link (PHY, data length, MTU),
//!    discovers the throughput service and counts notifications until
//!    the link drops.
//! 3. **Transport** - hands write commands to the SoftDevice and turns
//!    its answers into core events.
//! 4. **Mode switch / write pump / reporter** - the three workers that
//!    drive the shared [`ThroughputState`].
//!
//! All workers share one `ThroughputState` behind a critical-section
//! mutex and wake each other through the signals defined here.

pub mod adv_parser;
pub mod central;
pub mod mode_switch;
pub mod reporter;
pub mod scanner;
pub mod tput_client;
pub mod transport;
pub mod write_pump;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use nrf_softdevice::ble::Connection;

use crate::error::BleError;
use crate::tput::{LinkPhase, RateReport, ThroughputState, TransferMode};

/// The process-wide throughput state. Every context goes through
/// [`with_state`]; no lock is ever held across an `.await`.
static STATE: Mutex<CriticalSectionRawMutex, RefCell<ThroughputState>> =
    Mutex::new(RefCell::new(ThroughputState::new()));

/// Handle of the live connection, for workers that issue GATT operations.
static CONNECTION: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// Debounced trigger button press.
pub static TRIGGER: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Trigger asked for a scan while disconnected.
pub static SCAN_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Transport can take write commands again.
pub static CONGESTION_CLEARED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Link dropped; cancels pending mode-settle delays.
pub static LINK_DOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Latest link phase for the status LED.
pub static PHASE: Signal<CriticalSectionRawMutex, LinkPhase> = Signal::new();

/// Status lines for the display task.
pub static STATUS: Channel<CriticalSectionRawMutex, StatusEvent, 8> = Channel::new();

/// Events the BLE side publishes for the UI.
#[derive(Clone, Copy, defmt::Format)]
pub enum StatusEvent {
    Phase(LinkPhase),
    Mode(TransferMode),
    Rates(RateReport),
    Error(BleError),
}

/// Run `f` on the shared state inside the critical section.
pub fn with_state<R>(f: impl FnOnce(&mut ThroughputState) -> R) -> R {
    STATE.lock(|state| f(&mut state.borrow_mut()))
}

/// Clone of the live connection, if any.
pub fn connection() -> Option<Connection> {
    CONNECTION.lock(|c| c.borrow().clone())
}

fn set_connection(conn: Option<Connection>) {
    CONNECTION.lock(|c| *c.borrow_mut() = conn);
}

/// Push a status event to the LED and display. Never blocks: a full
/// status queue just drops the event.
pub fn publish(event: StatusEvent) {
    if let StatusEvent::Phase(phase) = event {
        PHASE.signal(phase);
    }
    let _ = STATUS.try_send(event);
}
