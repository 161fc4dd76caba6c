pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::SessionConfig;
pub use error::*;
pub use session::{CallHandle, CallManager, MediaState, SessionEvent, SessionSnapshot};
pub use signaling::{MemoryRelay, SignalingRelay};
pub use transport::{PeerConnectionFactory, WebrtcConnectionFactory};
