/// Outbound flow-control flag. Closed when a write is rejected as
/// congested, opened again by the transport's congestion-cleared event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CongestionGate {
    ready: bool,
}

impl CongestionGate {
    pub const fn new() -> Self {
        Self { ready: true }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn close(&mut self) {
        self.ready = false;
    }

    /// Open the gate. Returns `true` if it was closed, i.e. a suspended
    /// scheduler needs waking.
    pub fn open(&mut self) -> bool {
        let was_closed = !self.ready;
        self.ready = true;
        was_closed
    }
}

impl Default for CongestionGate {
    fn default() -> Self {
        Self::new()
    }
}
