//! Inbound commands to the node service.
//!
//! Commands arrive as JSON on the command topic, are queued by the bus
//! handler and applied by [`NodeService`](super::service::NodeService) on
//! its next tick. Every field is optional; unknown fields are ignored.
//!
//! ```json
//! {"telemetry": false, "status_interval": 300, "blink": 2}
//! ```

use serde::Deserialize;

use crate::config::{STATUS_INTERVAL_MAX_SECS, STATUS_INTERVAL_MIN_SECS};
use crate::error::CommandError;

/// Largest blink count a command may request.
pub const MAX_COMMAND_BLINKS: u8 = 10;

/// A decoded command payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NodeCommand {
    /// Enable or pause telemetry publishing.
    #[serde(default)]
    pub telemetry: Option<bool>,
    /// New diagnostics report period (seconds).
    #[serde(default)]
    pub status_interval: Option<u32>,
    /// Arm the indicator for this many blinks.
    #[serde(default)]
    pub blink: Option<u8>,
}

impl NodeCommand {
    /// Decode and range-check a command body.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let cmd: Self = serde_json::from_str(text.trim()).map_err(|_| CommandError::Malformed)?;

        if let Some(secs) = cmd.status_interval {
            if !(STATUS_INTERVAL_MIN_SECS..=STATUS_INTERVAL_MAX_SECS).contains(&secs) {
                return Err(CommandError::OutOfRange("status_interval"));
            }
        }
        if let Some(n) = cmd.blink {
            if n > MAX_COMMAND_BLINKS {
                return Err(CommandError::OutOfRange("blink"));
            }
        }
        Ok(cmd)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
