//! Write pump - decides on every tick whether a write command goes out.
//!
//! Submission and completion are separate: a write counts toward TX
//! throughput only once the transport reports it completed, never when
//! it is merely accepted.

use heapless::Vec;

use crate::config::MAX_PACKET_SIZE;
use crate::error::{BleError, Error};

use super::gate::CongestionGate;
use super::link::{ConnectionId, ConnectionState};
use super::packet::{PayloadBuffers, PayloadSlot};

/// Owned write-command payload.
pub type Payload = Vec<u8, MAX_PACKET_SIZE>;

/// A write command ready to hand to the transport. The transport takes
/// ownership; the pump never sees the buffer again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteCommand {
    pub conn: ConnectionId,
    pub handle: u16,
    pub slot: PayloadSlot,
    pub payload: Payload,
}

/// Immediate answer of the transport to a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitOutcome {
    Accepted,
    Congested,
    Failed(BleError),
}

/// The part of the BLE host stack the pump writes into.
pub trait GattTransport {
    /// Submit a write command (no response). Must not block.
    fn send_write(&mut self, cmd: WriteCommand) -> SubmitOutcome;

    /// True when the stack reports no separate TX-complete event, so an
    /// accepted write is its own completion.
    fn confirms_on_accept(&self) -> bool {
        false
    }
}

/// What the pump decided for one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WritePoll {
    /// Not connected, service unknown, or writes disabled by the mode.
    Idle,
    /// Congestion gate closed: wait for the cleared event.
    Blocked,
    Ready(WriteCommand),
}

/// Asynchronous confirmation that write commands left the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteCompletion {
    pub conn: ConnectionId,
    pub count: u8,
}

/// Payload alternation plus accepted-but-not-completed bookkeeping.
pub struct WriteScheduler {
    buffers: PayloadBuffers,
    in_flight: u32,
}

impl WriteScheduler {
    pub const fn new() -> Self {
        Self {
            buffers: PayloadBuffers::new(),
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn next_slot(&self) -> PayloadSlot {
        self.buffers.next_slot()
    }

    /// Build the write for this tick, if any.
    pub fn poll(
        &self,
        link: &ConnectionState,
        writes_enabled: bool,
        gate: &CongestionGate,
    ) -> WritePoll {
        let (Some(conn), Some(handles)) = (link.conn, link.service) else {
            return WritePoll::Idle;
        };
        if !writes_enabled || link.packet_size == 0 {
            return WritePoll::Idle;
        }
        if !gate.is_ready() {
            return WritePoll::Blocked;
        }

        let mut payload = Payload::new();
        // Cannot fail: packet size never exceeds MAX_PACKET_SIZE.
        let _ = payload.extend_from_slice(self.buffers.current(usize::from(link.packet_size)));

        WritePoll::Ready(WriteCommand {
            conn,
            handle: handles.write,
            slot: self.buffers.next_slot(),
            payload,
        })
    }

    /// Apply the transport's answer to a submission.
    pub fn on_submitted(
        &mut self,
        outcome: SubmitOutcome,
        gate: &mut CongestionGate,
    ) -> Result<(), Error> {
        match outcome {
            SubmitOutcome::Accepted => {
                self.buffers.flip();
                self.in_flight = self.in_flight.saturating_add(1);
                Ok(())
            }
            SubmitOutcome::Congested => {
                gate.close();
                Err(Error::TransportRejected)
            }
            SubmitOutcome::Failed(e) => Err(Error::TransportFailed(e)),
        }
    }

    /// Number of completions that match writes we actually submitted.
    /// Extra completions are dropped.
    pub fn on_completed(&mut self, count: u8) -> u32 {
        let confirmed = u32::from(count).min(self.in_flight);
        self.in_flight -= confirmed;
        confirmed
    }

    /// Forget in-flight writes (link gone). The payload slot is kept.
    pub fn reset(&mut self) {
        self.in_flight = 0;
    }
}

impl Default for WriteScheduler {
    fn default() -> Self {
        Self::new()
    }
}
