//! Throughput core - transfer-mode state machine, flow-controlled write
//! pump, and byte counters.
//!
//! Everything here is hardware-free: the BLE stack is reached only
//! through [`GattTransport`] and the event handlers on
//! [`ThroughputState`], so the whole core runs under `cargo test` on the
//! host. The firmware keeps one `ThroughputState` behind a blocking
//! mutex and drives it from its embassy tasks.

pub mod counters;
pub mod gate;
pub mod link;
pub mod mode;
pub mod packet;
pub mod scheduler;
pub mod state;

pub use counters::{kbps, ByteCounters, RateReport};
pub use gate::CongestionGate;
pub use link::{ConnectionId, ConnectionState, LinkPhase, PeerAddress, Phy, ServiceHandles};
pub use mode::{ModeMachine, TransferMode};
pub use packet::{packet_size, PayloadBuffers, PayloadSlot};
pub use scheduler::{
    GattTransport, Payload, SubmitOutcome, WriteCommand, WriteCompletion, WritePoll,
    WriteScheduler,
};
pub use state::{DiscoveryRequest, NotifyConfig, PumpOutcome, ThroughputState, TriggerAction};
