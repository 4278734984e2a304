//! Network and LAN-probe metadata carried on `join` / `peer_network_update`.

use serde::{Deserialize, Serialize};

/// Network metadata a client reports about its current attachment point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub network_id_hash: Option<String>,
    #[serde(default)]
    pub network_epoch: Option<i64>,
}

/// The pc-type peer's advertised LAN probe endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    #[serde(default)]
    pub probe_url: Option<String>,
    #[serde(default)]
    pub probe_ttl_ms: Option<u64>,
}

/// Outcome of an app peer probing a pc peer's LAN endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok,
    Fail,
    Timeout,
}

impl ProbeOutcome {
    /// Coerces any string the app might send into a known outcome,
    /// defaulting unknown values to [`ProbeOutcome::Fail`] per the spec.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "ok" => Self::Ok,
            "timeout" => Self::Timeout,
            _ => Self::Fail,
        }
    }
}
