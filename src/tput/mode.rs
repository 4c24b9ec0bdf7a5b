//! Transfer-mode state machine.
//!
//! ```text
//! NotifyAndWrite -> NotifyOnly -> WriteOnly -> NotifyAndWrite -> ...
//! ```
//!
//! A transition halts writes at once. They only resume when the CCCD
//! write for the new mode completes successfully. Every transition bumps
//! an epoch so completions that belong to an older transition (or an
//! older connection) can be told apart and dropped.

use crate::error::{BleError, Error};

/// Data transfer mode selected by the trigger button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Server → client notifications only.
    NotifyOnly,
    /// Client → server write commands only.
    WriteOnly,
    /// Both directions at once.
    #[default]
    NotifyAndWrite,
}

impl TransferMode {
    /// Next mode in the fixed cycle.
    pub fn next(self) -> Self {
        match self {
            TransferMode::NotifyAndWrite => TransferMode::NotifyOnly,
            TransferMode::NotifyOnly => TransferMode::WriteOnly,
            TransferMode::WriteOnly => TransferMode::NotifyAndWrite,
        }
    }

    pub fn notifications_enabled(self) -> bool {
        matches!(self, TransferMode::NotifyOnly | TransferMode::NotifyAndWrite)
    }

    pub fn writes_enabled(self) -> bool {
        matches!(self, TransferMode::WriteOnly | TransferMode::NotifyAndWrite)
    }

    /// Short label for logs and the status screen.
    pub fn label(self) -> &'static str {
        match self {
            TransferMode::NotifyOnly => "GATT Notif StoC",
            TransferMode::WriteOnly => "GATT Write CtoS",
            TransferMode::NotifyAndWrite => "GATT Notif+Write",
        }
    }
}

/// Mode plus the two derived switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModeMachine {
    mode: TransferMode,
    notify_enabled: bool,
    writes_enabled: bool,
    epoch: u32,
}

impl ModeMachine {
    pub const fn new() -> Self {
        Self {
            mode: TransferMode::NotifyAndWrite,
            notify_enabled: false,
            writes_enabled: false,
            epoch: 0,
        }
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Requested notification state of the peer (may still be in flight).
    pub fn notify_enabled(&self) -> bool {
        self.notify_enabled
    }

    /// Whether the write scheduler may submit right now.
    pub fn writes_enabled(&self) -> bool {
        self.writes_enabled
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Step to the next mode and halt writes until the CCCD write lands.
    pub fn advance(&mut self) -> TransferMode {
        self.mode = self.mode.next();
        self.stage();
        self.mode
    }

    /// Re-apply the current mode without moving (used after discovery).
    pub fn restage(&mut self) {
        self.stage();
    }

    fn stage(&mut self) {
        self.writes_enabled = false;
        self.notify_enabled = self.mode.notifications_enabled();
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Outcome of the CCCD write issued for `epoch`.
    ///
    /// On success, writes resume if the mode wants them. On failure the
    /// mode stays changed but writes stay off until the next trigger.
    pub fn complete(&mut self, epoch: u32, result: Result<(), BleError>) -> Result<bool, Error> {
        if epoch != self.epoch {
            return Err(Error::StateInconsistent);
        }
        match result {
            Ok(()) => {
                self.writes_enabled = self.mode.writes_enabled();
                Ok(self.writes_enabled)
            }
            Err(e) => {
                self.writes_enabled = false;
                Err(Error::from(e))
            }
        }
    }

    /// Back to the boot state. The epoch keeps counting so anything issued
    /// before the reset is recognised as stale.
    pub fn reset(&mut self) {
        self.mode = TransferMode::NotifyAndWrite;
        self.notify_enabled = false;
        self.writes_enabled = false;
        self.epoch = self.epoch.wrapping_add(1);
    }
}
