use callroom_core::IceServerConfig;
use callroom_core::utils::DEFAULT_STUN_ADDR;

/// Peer connection settings (STUN/TURN).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}
