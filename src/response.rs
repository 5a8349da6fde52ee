//! Outcome of a command sent through the registry.

use serde::{Deserialize, Serialize};

/// What happened to a [`Mutation`](crate::Mutation) handed to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dispatch {
    /// The device was offline; nothing was applied or sent.
    Skipped,
    /// Applied locally and acknowledged by the transport.
    Sent { power: bool, color: bool },
    /// Applied locally, but the device went offline or was reconnected
    /// before the transport answered; the answer was dropped.
    Superseded,
}

impl Dispatch {
    pub fn was_sent(&self) -> bool {
        matches!(self, Dispatch::Sent { .. })
    }
}
