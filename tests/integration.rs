//! Integration tests for the host-testable throughput core.

use std::sync::{Arc, Mutex};
use std::thread;

use ble_tput_client::tput::{
    ConnectionId, GattTransport, LinkPhase, PayloadSlot, PeerAddress, PumpOutcome, SubmitOutcome,
    TransferMode, TriggerAction, WriteCommand, WriteCompletion, WritePoll,
};
use ble_tput_client::{Error, ThroughputState};

const CONN: ConnectionId = ConnectionId(0);
const SERVICE: u16 = 16;

#[derive(Default)]
struct RecordingTransport {
    sent: Vec<WriteCommand>,
    congested: bool,
    confirms: bool,
}

impl GattTransport for RecordingTransport {
    fn send_write(&mut self, cmd: WriteCommand) -> SubmitOutcome {
        if self.congested {
            return SubmitOutcome::Congested;
        }
        self.sent.push(cmd);
        SubmitOutcome::Accepted
    }

    fn confirms_on_accept(&self) -> bool {
        self.confirms
    }
}

fn connect(state: &mut ThroughputState, mtu: u16) {
    assert_eq!(state.on_trigger(), TriggerAction::StartScan);
    state.on_link_up(CONN, PeerAddress([0xC0, 0xFF, 0xEE, 0, 0, 1])).unwrap();
    let discovery = state.on_mtu_negotiated(CONN, mtu).unwrap();
    assert_eq!(discovery.conn, CONN);
    let config = state.on_service_discovered(CONN, SERVICE).unwrap();
    assert!(config.enable);
    assert_eq!(state.on_notify_config_complete(&config, Ok(())), Ok(true));
}

#[test]
fn mtu_250_sends_244_byte_writes() {
    let mut state = ThroughputState::new();
    connect(&mut state, 250);
    assert_eq!(state.link().packet_size, 244);

    let mut transport = RecordingTransport::default();
    assert_eq!(state.pump(&mut transport), PumpOutcome::Sent);
    assert_eq!(state.pump(&mut transport), PumpOutcome::Sent);

    let first = &transport.sent[0];
    assert_eq!(first.handle, SERVICE + 5);
    assert_eq!(first.payload.len(), 244);
    assert_eq!(first.slot, PayloadSlot::Ascending);
    assert_eq!(first.payload[..4], [0, 1, 2, 3]);

    let second = &transport.sent[1];
    assert_eq!(second.slot, PayloadSlot::Descending);
    assert_eq!(second.payload[..3], [243, 242, 241]);
}

#[test]
fn ten_thousand_bytes_report_80_kbps() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    for _ in 0..40 {
        state.on_notification(CONN, 250).unwrap();
    }

    let report = state.report_tick();
    assert_eq!(report.rx_kbps, Some(80));
    assert_eq!(report.tx_kbps, None);
    assert_eq!(state.counters().rx_bytes(), 0);
    assert!(state.report_tick().is_empty());
}

#[test]
fn three_triggers_cycle_back_to_notify_and_write() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    let mut seen = Vec::new();
    for _ in 0..3 {
        match state.on_trigger() {
            TriggerAction::ModeChanged { mode, config } => {
                let config = config.expect("service is known");
                assert_eq!(config.cccd_handle, SERVICE + 3);
                assert_eq!(config.enable, mode.notifications_enabled());
                state.on_notify_config_complete(&config, Ok(())).unwrap();
                seen.push(mode);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    assert_eq!(
        seen,
        [
            TransferMode::NotifyOnly,
            TransferMode::WriteOnly,
            TransferMode::NotifyAndWrite
        ]
    );
    assert_eq!(state.mode(), TransferMode::NotifyAndWrite);
    assert!(state.writes_enabled());
}

#[test]
fn congested_gate_stops_submissions_until_cleared() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    let mut transport = RecordingTransport {
        congested: true,
        ..Default::default()
    };
    assert_eq!(state.pump(&mut transport), PumpOutcome::Blocked);
    assert!(!state.gate_ready());

    // Transport would accept now, but nobody has said so.
    transport.congested = false;
    for _ in 0..100 {
        assert_eq!(state.pump(&mut transport), PumpOutcome::Blocked);
    }
    assert!(transport.sent.is_empty());
    assert_eq!(state.counters().tx_bytes(), 0);

    assert!(state.on_congestion_cleared());
    assert_eq!(state.pump(&mut transport), PumpOutcome::Sent);
    // Retry reuses the buffer the congested attempt wanted.
    assert_eq!(transport.sent[0].slot, PayloadSlot::Ascending);
}

#[test]
fn tx_counts_on_completion_only() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    let mut transport = RecordingTransport::default();
    for _ in 0..3 {
        assert_eq!(state.pump(&mut transport), PumpOutcome::Sent);
    }
    assert_eq!(state.counters().tx_bytes(), 0);

    let added = state
        .on_write_complete(WriteCompletion { conn: CONN, count: 2 })
        .unwrap();
    assert_eq!(added, 2 * 244);
    assert_eq!(state.counters().tx_bytes(), 488);
}

#[test]
fn disconnect_resets_everything() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    let mut transport = RecordingTransport {
        congested: true,
        ..Default::default()
    };
    state.pump(&mut transport);
    state.on_notification(CONN, 100).unwrap();
    let pending = match state.on_trigger() {
        TriggerAction::ModeChanged { config, .. } => config.unwrap(),
        other => panic!("unexpected {:?}", other),
    };

    let previous = state.on_link_down();
    assert_eq!(previous.conn, Some(CONN));
    assert_eq!(previous.packet_size, 244);

    assert_eq!(state.phase(), LinkPhase::Idle);
    assert!(!state.is_connected());
    assert_eq!(state.mode(), TransferMode::NotifyAndWrite);
    assert!(state.gate_ready());
    assert_eq!(state.counters().rx_bytes(), 0);
    assert_eq!(state.next_write(), WritePoll::Idle);
    assert!(state.report_tick().is_empty());

    // Leftovers from the dead link are refused.
    assert!(!state.notify_config_current(&pending));
    assert_eq!(
        state.on_notify_config_complete(&pending, Ok(())),
        Err(Error::StateInconsistent)
    );
    assert_eq!(
        state.on_notification(CONN, 10),
        Err(Error::StateInconsistent)
    );

    // A new trigger scans again.
    assert_eq!(state.on_trigger(), TriggerAction::StartScan);
}

#[test]
fn shared_state_survives_concurrent_workers() {
    let state = Arc::new(Mutex::new(ThroughputState::new()));
    connect(&mut state.lock().unwrap(), 247);

    let rx = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            for _ in 0..1000 {
                state.lock().unwrap().on_notification(CONN, 100).unwrap();
            }
        })
    };

    let tx = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let mut transport = RecordingTransport::default();
            for _ in 0..500 {
                let mut s = state.lock().unwrap();
                assert_eq!(s.pump(&mut transport), PumpOutcome::Sent);
                s.on_write_complete(WriteCompletion { conn: CONN, count: 1 })
                    .unwrap();
            }
            transport.sent.len()
        })
    };

    rx.join().unwrap();
    let sent = tx.join().unwrap();

    let s = state.lock().unwrap();
    assert_eq!(sent, 500);
    assert_eq!(s.counters().rx_bytes(), 100_000);
    assert_eq!(s.counters().tx_bytes(), 500 * 244);
    assert_eq!(s.scheduler().in_flight(), 0);
}

#[test]
fn mode_change_between_ticks_sends_and_counts_nothing_more() {
    let mut state = ThroughputState::new();
    connect(&mut state, 247);

    let mut transport = RecordingTransport {
        confirms: true,
        ..Default::default()
    };
    assert_eq!(state.pump(&mut transport), PumpOutcome::Sent);
    assert_eq!(state.counters().tx_bytes(), 244);

    let TriggerAction::ModeChanged { mode, .. } = state.on_trigger() else {
        panic!("expected a mode change");
    };
    assert_eq!(mode, TransferMode::NotifyOnly);

    for _ in 0..10 {
        assert_eq!(state.pump(&mut transport), PumpOutcome::Idle);
    }
    assert_eq!(transport.sent.len(), 1);
    assert_eq!(state.counters().tx_bytes(), 0);
}
