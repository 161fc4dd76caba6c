use crate::transport::TransportConfig;
use callroom_core::IceServerConfig;
use callroom_core::utils::DEFAULT_STUN_ADDR;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TEARDOWN_COOLDOWN_MS: u64 = 1000;
const DEFAULT_NEGOTIATION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Settings shared by every session a [`crate::CallManager`] starts.
///
/// Missing keys fall back to their defaults. `negotiationTimeoutMs: null`
/// disables the negotiation timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub teardown_cooldown_ms: u64,
    pub negotiation_timeout_ms: Option<u64>,
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            teardown_cooldown_ms: DEFAULT_TEARDOWN_COOLDOWN_MS,
            negotiation_timeout_ms: Some(DEFAULT_NEGOTIATION_TIMEOUT_MS),
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn teardown_cooldown(&self) -> Duration {
        Duration::from_millis(self.teardown_cooldown_ms)
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}
