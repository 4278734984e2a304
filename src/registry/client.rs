//! A logical device identity and its classification.

use std::collections::BTreeSet;

use pairsync_proto::{ClientId, NetworkInfo, ProbeInfo};

/// Normalized device class, derived from the free-form `client_type` a
/// client reports on `join`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientType {
    Pc,
    App,
    Unknown,
}

impl ClientType {
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "app" | "android" | "ios" => Self::App,
            "pc" | "windows" | "macos" | "linux" | "cli" | "web" => Self::Pc,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn is_pc(self) -> bool {
        matches!(self, Self::Pc)
    }

    #[must_use]
    pub fn is_app(self) -> bool {
        matches!(self, Self::App)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pc => "pc",
            Self::App => "app",
            Self::Unknown => "unknown",
        }
    }
}

/// A device identity the registry tracks, possibly across several sockets.
#[derive(Clone, Debug)]
pub struct Client {
    pub client_id: ClientId,
    pub sockets: BTreeSet<u64>,
    pub client_type: ClientType,
    pub device_name: String,
    pub room: Option<pairsync_proto::RoomId>,
    pub joined_at_ms: i64,
    pub last_seen_ms: i64,
    pub network: NetworkInfo,
    pub probe: ProbeInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_aliases() {
        assert!(ClientType::classify("Android").is_app());
        assert!(ClientType::classify("ios").is_app());
        assert!(ClientType::classify("PC").is_pc());
        assert!(ClientType::classify("macOS").is_pc());
        assert_eq!(ClientType::classify("toaster").as_str(), "unknown");
    }
}
