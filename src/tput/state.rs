//! The single shared state object every execution context works on.
//!
//! One `ThroughputState` lives for the whole process behind one lock.
//! Each handler below is one event from one context:
//!
//! | Context              | Handlers                                             |
//! |----------------------|------------------------------------------------------|
//! | trigger worker       | `on_trigger`, `notify_config_current`                |
//! | BLE stack callbacks  | `on_link_up/down`, `on_mtu_negotiated`, `on_*`       |
//! | 1 ms write worker    | `pump` (poll, submit and book under one lock)        |
//! | 1 s report worker    | `report_tick`                                        |

use crate::config::{CCCD_LEN, TPUT_SERVICE_UUID};
use crate::error::{BleError, Error};

use super::counters::{ByteCounters, RateReport};
use super::gate::CongestionGate;
use super::link::{ConnectionId, ConnectionState, LinkPhase, PeerAddress, Phy, ServiceHandles};
use super::mode::{ModeMachine, TransferMode};
use super::scheduler::{
    GattTransport, SubmitOutcome, WriteCompletion, WritePoll, WriteScheduler,
};

/// Primary service discovery the link owner must start after the MTU
/// exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryRequest {
    pub conn: ConnectionId,
    pub packet_size: u16,
    pub service_uuid: [u8; 16],
}

/// CCCD write that puts the peer's notifications in line with the mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NotifyConfig {
    pub conn: ConnectionId,
    pub cccd_handle: u16,
    pub enable: bool,
    pub epoch: u32,
}

impl NotifyConfig {
    /// Little-endian CCCD value (bit 0 = notifications).
    pub fn cccd_value(&self) -> [u8; CCCD_LEN] {
        [u8::from(self.enable), 0]
    }
}

/// What the trigger worker has to do after a button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerAction {
    /// Disconnected and idle: start looking for the peer.
    StartScan,
    /// Disconnected but a scan (or connect) is already running.
    AlreadyScanning,
    /// Mode advanced. `config` is `None` while the service is unknown.
    ModeChanged {
        mode: TransferMode,
        config: Option<NotifyConfig>,
    },
}

/// Outcome of feeding one tick through the write pump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PumpOutcome {
    Idle,
    Sent,
    /// The scheduler must wait for a congestion-cleared event.
    Blocked,
    Failed(BleError),
}

pub struct ThroughputState {
    phase: LinkPhase,
    link: ConnectionState,
    mode: ModeMachine,
    gate: CongestionGate,
    counters: ByteCounters,
    scheduler: WriteScheduler,
}

impl ThroughputState {
    pub const fn new() -> Self {
        Self {
            phase: LinkPhase::Idle,
            link: ConnectionState {
                conn: None,
                peer: PeerAddress([0; 6]),
                mtu: 0,
                packet_size: 0,
                rx_phy: Phy::Unknown,
                tx_phy: Phy::Unknown,
                conn_interval_us: 0,
                service: None,
            },
            mode: ModeMachine::new(),
            gate: CongestionGate::new(),
            counters: ByteCounters::new(),
            scheduler: WriteScheduler::new(),
        }
    }

    // Read access

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn link(&self) -> &ConnectionState {
        &self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn mode(&self) -> TransferMode {
        self.mode.mode()
    }

    pub fn notify_enabled(&self) -> bool {
        self.mode.notify_enabled()
    }

    pub fn writes_enabled(&self) -> bool {
        self.mode.writes_enabled()
    }

    pub fn gate_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn counters(&self) -> ByteCounters {
        self.counters
    }

    pub fn scheduler(&self) -> &WriteScheduler {
        &self.scheduler
    }

    // Scan / connection events

    pub fn on_scan_started(&mut self) {
        if !self.link.is_connected() {
            self.phase = LinkPhase::Scanning;
        }
    }

    /// Scan ended (timeout, error, or peer found and connecting failed).
    pub fn on_scan_stopped(&mut self) {
        self.phase = if self.link.is_connected() {
            LinkPhase::Connected
        } else {
            LinkPhase::Idle
        };
    }

    pub fn on_link_up(&mut self, conn: ConnectionId, peer: PeerAddress) -> Result<(), Error> {
        if self.link.is_connected() {
            return Err(Error::StateInconsistent);
        }
        self.link.link_up(conn, peer);
        self.phase = LinkPhase::Connected;
        Ok(())
    }

    /// Record the negotiated MTU and hand back the discovery to run next.
    pub fn on_mtu_negotiated(
        &mut self,
        conn: ConnectionId,
        mtu: u16,
    ) -> Result<DiscoveryRequest, Error> {
        if !self.link.is_current(conn) {
            return Err(Error::StateInconsistent);
        }
        let packet_size = self.link.set_mtu(mtu);
        Ok(DiscoveryRequest {
            conn,
            packet_size,
            service_uuid: TPUT_SERVICE_UUID,
        })
    }

    /// Throughput service found at `service_handle`. Stages the current
    /// mode's notification setting; writes start once it completes.
    pub fn on_service_discovered(
        &mut self,
        conn: ConnectionId,
        service_handle: u16,
    ) -> Result<NotifyConfig, Error> {
        if !self.link.is_current(conn) {
            return Err(Error::StateInconsistent);
        }
        self.link.service = Some(ServiceHandles::from_service(service_handle));
        self.mode.restage();
        self.notify_config().ok_or(Error::StateInconsistent)
    }

    pub fn on_phy_updated(&mut self, conn: ConnectionId, rx: Phy, tx: Phy) -> Result<(), Error> {
        if !self.link.is_current(conn) {
            return Err(Error::StateInconsistent);
        }
        self.link.set_phys(rx, tx);
        Ok(())
    }

    pub fn on_conn_params_updated(&mut self, conn: ConnectionId, units: u16) -> Result<u32, Error> {
        if !self.link.is_current(conn) {
            return Err(Error::StateInconsistent);
        }
        self.link.set_conn_interval(units);
        Ok(self.link.conn_interval_us)
    }

    /// Link lost. Always authoritative: every dependent field goes back to
    /// its boot value in the same critical section, and any pending mode
    /// transition becomes stale. Returns the state that was torn down.
    pub fn on_link_down(&mut self) -> ConnectionState {
        let previous = self.link;
        self.link.clear();
        self.phase = LinkPhase::Idle;
        self.mode.reset();
        self.gate.open();
        self.counters.clear();
        self.scheduler.reset();
        previous
    }

    // Mode trigger

    pub fn on_trigger(&mut self) -> TriggerAction {
        if !self.link.is_connected() {
            return match self.phase {
                LinkPhase::Idle => {
                    self.phase = LinkPhase::Scanning;
                    TriggerAction::StartScan
                }
                _ => TriggerAction::AlreadyScanning,
            };
        }

        let mode = self.mode.advance();
        self.counters.clear_tx();
        TriggerAction::ModeChanged {
            mode,
            config: self.notify_config(),
        }
    }

    fn notify_config(&self) -> Option<NotifyConfig> {
        let conn = self.link.conn?;
        let handles = self.link.service?;
        Some(NotifyConfig {
            conn,
            cccd_handle: handles.cccd,
            enable: self.mode.notify_enabled(),
            epoch: self.mode.epoch(),
        })
    }

    /// Still worth sending after the settle delay? False once a newer
    /// transition or a disconnect has superseded it.
    pub fn notify_config_current(&self, config: &NotifyConfig) -> bool {
        self.link.is_current(config.conn) && self.mode.epoch() == config.epoch
    }

    /// Result of the CCCD write. Returns whether writes are now enabled.
    pub fn on_notify_config_complete(
        &mut self,
        config: &NotifyConfig,
        result: Result<(), BleError>,
    ) -> Result<bool, Error> {
        if !self.link.is_current(config.conn) {
            return Err(Error::StateInconsistent);
        }
        self.mode.complete(config.epoch, result)
    }

    // Transport events

    pub fn on_notification(&mut self, conn: ConnectionId, len: usize) -> Result<(), Error> {
        if !self.link.is_current(conn) {
            return Err(Error::StateInconsistent);
        }
        self.counters.add_rx(len as u32);
        Ok(())
    }

    /// Write commands confirmed sent. Adds `packet_size` per confirmed
    /// write to the TX counter and returns the bytes added.
    pub fn on_write_complete(&mut self, completion: WriteCompletion) -> Result<u32, Error> {
        if !self.link.is_current(completion.conn) {
            return Err(Error::StateInconsistent);
        }
        let confirmed = self.scheduler.on_completed(completion.count);
        let bytes = confirmed * u32::from(self.link.packet_size);
        self.counters.add_tx(bytes);
        Ok(bytes)
    }

    /// Transport can take writes again. Returns `true` if the write worker
    /// is suspended on the gate and must be woken.
    pub fn on_congestion_cleared(&mut self) -> bool {
        self.gate.open()
    }

    // Write pump (1 ms worker)

    pub fn next_write(&self) -> WritePoll {
        self.scheduler
            .poll(&self.link, self.mode.writes_enabled(), &self.gate)
    }

    fn on_write_submitted(&mut self, outcome: SubmitOutcome) -> Result<(), Error> {
        self.scheduler.on_submitted(outcome, &mut self.gate)
    }

    /// Poll, submit and book-keep one tick in one go. The caller holds the
    /// state for the whole call, so a trigger or link-down can never land
    /// between building a write and booking its result.
    pub fn pump<T: GattTransport>(&mut self, transport: &mut T) -> PumpOutcome {
        match self.next_write() {
            WritePoll::Idle => PumpOutcome::Idle,
            WritePoll::Blocked => PumpOutcome::Blocked,
            WritePoll::Ready(cmd) => {
                let conn = cmd.conn;
                let outcome = transport.send_write(cmd);
                match self.on_write_submitted(outcome) {
                    Ok(()) => {
                        if transport.confirms_on_accept() {
                            let _ = self.on_write_complete(WriteCompletion { conn, count: 1 });
                        }
                        PumpOutcome::Sent
                    }
                    Err(Error::TransportRejected) => PumpOutcome::Blocked,
                    Err(Error::TransportFailed(e)) => PumpOutcome::Failed(e),
                    Err(_) => PumpOutcome::Failed(BleError::WriteFailed),
                }
            }
        }
    }

    // Rate reporter (1 s worker)

    /// Drain the counters into a report. Nothing is reported (and nothing
    /// drained) while disconnected.
    pub fn report_tick(&mut self) -> RateReport {
        if !self.link.is_connected() {
            return RateReport::default();
        }
        self.counters.drain()
    }
}

impl Default for ThroughputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tput::packet::PayloadSlot;
    use crate::tput::scheduler::WriteCommand;

    const CONN: ConnectionId = ConnectionId(1);

    #[derive(Default)]
    struct MockTransport {
        sent: std::vec::Vec<WriteCommand>,
        congested: bool,
        confirms: bool,
    }

    impl GattTransport for MockTransport {
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

    /// Connected, MTU 247, service at 9, initial CCCD write completed.
    fn ready_state() -> ThroughputState {
        let mut s = ThroughputState::new();
        assert_eq!(s.on_trigger(), TriggerAction::StartScan);
        s.on_link_up(CONN, PeerAddress([1, 2, 3, 4, 5, 6])).unwrap();
        s.on_mtu_negotiated(CONN, 247).unwrap();
        let cfg = s.on_service_discovered(CONN, 9).unwrap();
        assert_eq!(s.on_notify_config_complete(&cfg, Ok(())), Ok(true));
        s
    }

    #[test]
    fn boot_state() {
        let s = ThroughputState::new();
        assert_eq!(s.phase(), LinkPhase::Idle);
        assert_eq!(s.mode(), TransferMode::NotifyAndWrite);
        assert!(s.gate_ready());
        assert!(!s.writes_enabled());
    }

    #[test]
    fn trigger_while_disconnected_scans_once() {
        let mut s = ThroughputState::new();
        assert_eq!(s.on_trigger(), TriggerAction::StartScan);
        assert_eq!(s.phase(), LinkPhase::Scanning);
        assert_eq!(s.on_trigger(), TriggerAction::AlreadyScanning);
        assert_eq!(s.mode(), TransferMode::NotifyAndWrite);
    }

    #[test]
    fn scan_stop_without_link_returns_to_idle() {
        let mut s = ThroughputState::new();
        s.on_trigger();
        s.on_scan_stopped();
        assert_eq!(s.phase(), LinkPhase::Idle);
        assert_eq!(s.on_trigger(), TriggerAction::StartScan);
    }

    #[test]
    fn mtu_for_other_connection_is_rejected() {
        let mut s = ThroughputState::new();
        s.on_link_up(CONN, PeerAddress::default()).unwrap();
        assert_eq!(
            s.on_mtu_negotiated(ConnectionId(7), 247),
            Err(Error::StateInconsistent)
        );
    }

    #[test]
    fn mtu_drives_discovery_request() {
        let mut s = ThroughputState::new();
        s.on_link_up(CONN, PeerAddress::default()).unwrap();
        let req = s.on_mtu_negotiated(CONN, 250).unwrap();
        assert_eq!(req.packet_size, 244);
        assert_eq!(req.service_uuid, TPUT_SERVICE_UUID);
        assert_eq!(s.link().mtu, 250);
    }

    #[test]
    fn discovery_stages_initial_mode() {
        let mut s = ThroughputState::new();
        s.on_link_up(CONN, PeerAddress::default()).unwrap();
        s.on_mtu_negotiated(CONN, 247).unwrap();
        let cfg = s.on_service_discovered(CONN, 9).unwrap();
        assert!(cfg.enable);
        assert_eq!(cfg.cccd_handle, 12);
        assert_eq!(cfg.cccd_value(), [1, 0]);
        assert!(!s.writes_enabled());
    }

    #[test]
    fn trigger_cycles_modes_and_zeroes_tx() {
        let mut s = ready_state();
        let mut t = MockTransport::default();
        assert_eq!(s.pump(&mut t), PumpOutcome::Sent);
        s.on_write_complete(WriteCompletion { conn: CONN, count: 1 })
            .unwrap();
        assert_eq!(s.counters().tx_bytes(), 244);

        let TriggerAction::ModeChanged { mode, config } = s.on_trigger() else {
            panic!("expected mode change");
        };
        assert_eq!(mode, TransferMode::NotifyOnly);
        assert_eq!(s.counters().tx_bytes(), 0);
        assert!(!s.writes_enabled());
        let config = config.unwrap();
        assert!(config.enable);

        // Writes stay halted while the CCCD write is outstanding.
        assert_eq!(s.pump(&mut t), PumpOutcome::Idle);
        assert_eq!(s.on_notify_config_complete(&config, Ok(())), Ok(false));
        assert_eq!(s.pump(&mut t), PumpOutcome::Idle);
    }

    #[test]
    fn write_only_disables_notifications_and_resumes_writes() {
        let mut s = ready_state();
        s.on_trigger();
        let TriggerAction::ModeChanged { mode, config } = s.on_trigger() else {
            panic!("expected mode change");
        };
        assert_eq!(mode, TransferMode::WriteOnly);
        let config = config.unwrap();
        assert!(!config.enable);
        assert_eq!(config.cccd_value(), [0, 0]);
        assert_eq!(s.on_notify_config_complete(&config, Ok(())), Ok(true));

        let mut t = MockTransport::default();
        assert_eq!(s.pump(&mut t), PumpOutcome::Sent);
    }

    #[test]
    fn superseded_config_is_not_current() {
        let mut s = ready_state();
        let TriggerAction::ModeChanged { config: Some(first), .. } = s.on_trigger() else {
            panic!("expected mode change");
        };
        s.on_trigger();
        assert!(!s.notify_config_current(&first));
        assert_eq!(
            s.on_notify_config_complete(&first, Ok(())),
            Err(Error::StateInconsistent)
        );
    }

    #[test]
    fn congestion_blocks_until_cleared() {
        let mut s = ready_state();
        let mut t = MockTransport {
            congested: true,
            ..Default::default()
        };
        assert_eq!(s.pump(&mut t), PumpOutcome::Blocked);
        assert!(!s.gate_ready());
        assert_eq!(s.scheduler().next_slot(), PayloadSlot::Ascending);

        t.congested = false;
        for _ in 0..100 {
            assert_eq!(s.pump(&mut t), PumpOutcome::Blocked);
        }
        assert!(t.sent.is_empty());

        assert!(s.on_congestion_cleared());
        assert!(!s.on_congestion_cleared());
        assert_eq!(s.pump(&mut t), PumpOutcome::Sent);
        assert_eq!(t.sent.len(), 1);
    }

    #[test]
    fn tx_counts_only_on_completion() {
        let mut s = ready_state();
        let mut t = MockTransport::default();
        s.pump(&mut t);
        s.pump(&mut t);
        assert_eq!(s.counters().tx_bytes(), 0);
        assert_eq!(
            s.on_write_complete(WriteCompletion { conn: CONN, count: 2 }),
            Ok(488)
        );
        assert_eq!(s.counters().tx_bytes(), 488);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut s = ready_state();
        let mut t = MockTransport::default();
        s.pump(&mut t);
        assert_eq!(
            s.on_write_complete(WriteCompletion {
                conn: ConnectionId(5),
                count: 1
            }),
            Err(Error::StateInconsistent)
        );
        assert_eq!(s.counters().tx_bytes(), 0);
    }

    #[test]
    fn payloads_alternate() {
        let mut s = ready_state();
        let mut t = MockTransport::default();
        s.pump(&mut t);
        s.pump(&mut t);
        s.pump(&mut t);
        assert_eq!(t.sent[0].slot, PayloadSlot::Ascending);
        assert_eq!(t.sent[1].slot, PayloadSlot::Descending);
        assert_eq!(t.sent[2].slot, PayloadSlot::Ascending);
        assert_eq!(t.sent[1].payload[0], 243);
    }

    #[test]
    fn link_down_resets_everything() {
        let mut s = ready_state();
        let mut t = MockTransport {
            congested: true,
            ..Default::default()
        };
        s.pump(&mut t);
        assert!(!s.gate_ready());
        s.on_trigger();
        s.on_notification(CONN, 100).unwrap();

        let previous = s.on_link_down();
        assert_eq!(previous.conn, Some(CONN));
        assert_eq!(*s.link(), ConnectionState::default());
        assert_eq!(s.phase(), LinkPhase::Idle);
        assert_eq!(s.mode(), TransferMode::NotifyAndWrite);
        assert!(s.gate_ready());
        assert_eq!(s.counters(), ByteCounters::new());
        assert_eq!(s.scheduler().in_flight(), 0);
    }

    #[test]
    fn report_tick_requires_connection() {
        let mut s = ThroughputState::new();
        assert!(s.report_tick().is_empty());

        let mut s = ready_state();
        s.on_notification(CONN, 10_000).unwrap();
        let report = s.report_tick();
        assert_eq!(report.rx_kbps, Some(80));
        assert_eq!(report.tx_kbps, None);
        assert_eq!(s.counters().rx_bytes(), 0);
        assert!(s.report_tick().is_empty());
    }

    #[test]
    fn eager_transport_counts_tx_within_the_tick() {
        let mut s = ready_state();
        let mut t = MockTransport {
            confirms: true,
            ..Default::default()
        };
        assert_eq!(s.pump(&mut t), PumpOutcome::Sent);
        assert_eq!(s.counters().tx_bytes(), 244);
        assert_eq!(s.scheduler().in_flight(), 0);
    }

    #[test]
    fn trigger_between_ticks_halts_the_next_write() {
        let mut s = ready_state();
        let mut t = MockTransport {
            confirms: true,
            ..Default::default()
        };
        assert_eq!(s.pump(&mut t), PumpOutcome::Sent);
        let slot_before = s.scheduler().next_slot();

        assert!(matches!(s.on_trigger(), TriggerAction::ModeChanged { .. }));
        assert_eq!(s.pump(&mut t), PumpOutcome::Idle);

        assert_eq!(t.sent.len(), 1);
        assert_eq!(s.counters().tx_bytes(), 0);
        assert_eq!(s.scheduler().next_slot(), slot_before);
    }

    #[test]
    fn congested_pump_after_link_down_leaves_gate_open() {
        let mut s = ready_state();
        s.on_link_down();
        let mut t = MockTransport {
            congested: true,
            ..Default::default()
        };
        assert_eq!(s.pump(&mut t), PumpOutcome::Idle);
        assert!(s.gate_ready());
    }

    #[test]
    fn scan_window_timeout_allows_a_new_scan() {
        let mut s = ThroughputState::new();
        assert_eq!(s.on_trigger(), TriggerAction::StartScan);
        assert_eq!(s.on_trigger(), TriggerAction::AlreadyScanning);

        s.on_scan_stopped();
        assert_eq!(s.phase(), LinkPhase::Idle);
        assert_eq!(s.on_trigger(), TriggerAction::StartScan);
    }

    #[test]
    fn phy_and_interval_updates() {
        let mut s = ready_state();
        s.on_phy_updated(CONN, Phy::Le2M, Phy::Le2M).unwrap();
        assert_eq!(s.link().rx_phy, Phy::Le2M);
        assert_eq!(s.on_conn_params_updated(CONN, 12), Ok(15_000));
        assert_eq!(
            s.on_conn_params_updated(ConnectionId(9), 12),
            Err(Error::StateInconsistent)
        );
    }
}
