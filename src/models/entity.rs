use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of monitored target: a JSON-RPC fullnode or a user-facing dApp
/// URL. Stored as `"rpc"` / `"dapp"` in the `checks` and `incidents` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A JSON-RPC fullnode endpoint.
    Rpc,
    /// A decentralized-application URL.
    Dapp,
}

impl EntityKind {
    /// The stable string form used in the database and in metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Rpc => "rpc",
            EntityKind::Dapp => "dapp",
        }
    }

    /// Parses the stored string form back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rpc" => Some(EntityKind::Rpc),
            "dapp" => Some(EntityKind::Dapp),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_stored_form() {
        assert_eq!(EntityKind::parse("rpc"), Some(EntityKind::Rpc));
        assert_eq!(EntityKind::parse("dapp"), Some(EntityKind::Dapp));
        assert_eq!(EntityKind::parse("other"), None);
        assert_eq!(EntityKind::Rpc.to_string(), "rpc");
    }
}
