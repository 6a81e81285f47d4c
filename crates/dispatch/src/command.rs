//! Controller command vocabulary.

use serde::{Deserialize, Serialize};

/// Commands a lock controller understands.
///
/// The serialized names are the controller wire protocol and the console's
/// `cmd` values, so they stay camelCase where the original firmware expects
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Engage the lock.
    #[serde(rename = "lock")]
    Lock,
    /// Release the lock.
    #[serde(rename = "unlock")]
    Unlock,
    /// Push the full allow-list to the controller.
    #[serde(rename = "refreshPermission")]
    RefreshPermission,
}

impl CommandKind {
    /// Wire name, doubling as the controller URL path segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::RefreshPermission => "refreshPermission",
        }
    }

    /// Parse a console `cmd` value. Case-sensitive, like the firmware.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lock" => Some(Self::Lock),
            "unlock" => Some(Self::Unlock),
            "refreshPermission" => Some(Self::RefreshPermission),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully materialized command, ready for the transport.
///
/// Payloads are built at send time, not enqueue time, so a queued
/// `refreshPermission` always ships the allow-list as it stands when the
/// request goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPayload {
    /// Which command to issue.
    pub kind: CommandKind,
    /// Active key UIDs, present only for `refreshPermission`.
    pub keys: Option<Vec<String>>,
}

impl CommandPayload {
    /// Payload for a `lock` command.
    #[must_use]
    pub const fn lock() -> Self {
        Self {
            kind: CommandKind::Lock,
            keys: None,
        }
    }

    /// Payload for an `unlock` command.
    #[must_use]
    pub const fn unlock() -> Self {
        Self {
            kind: CommandKind::Unlock,
            keys: None,
        }
    }

    /// Payload for a `refreshPermission` command carrying the complete
    /// allow-list. An empty list is a valid payload: it revokes everything.
    #[must_use]
    pub const fn refresh_permission(keys: Vec<String>) -> Self {
        Self {
            kind: CommandKind::RefreshPermission,
            keys: Some(keys),
        }
    }

    /// JSON body for the controller request, `None` for bodiless commands.
    #[must_use]
    pub fn body(&self) -> Option<serde_json::Value> {
        self.keys
            .as_ref()
            .map(|keys| serde_json::json!({ "keys": keys }))
    }
}

/// Terminal result of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The controller accepted the command.
    Acknowledged,
    /// The attempt budget is exhausted; carries the last error.
    Failed(String),
}

impl CommandOutcome {
    /// Whether the controller accepted the command.
    #[must_use]
    pub const fn is_acknowledged(&self) -> bool {
        matches!(self, Self::Acknowledged)
    }
}
