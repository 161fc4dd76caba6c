use serde::{Deserialize, Serialize};

/// Lifecycle phase of one call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionPhase {
    Idle,
    AcquiringMedia,
    Negotiating,
    Connected,
    Ending,
    Closed,
    Error,
}

impl ConnectionPhase {
    pub fn can_transition_to(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;

        match (self, next) {
            (Idle, AcquiringMedia) => true,
            (AcquiringMedia, Negotiating | Error) => true,
            (Negotiating, Connected | Error) => true,
            (Ending, Closed) => true,
            (Ending | Closed, _) => false,
            (_, Ending) => true,
            _ => false,
        }
    }

    /// Teardown has started or finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionPhase::Ending | ConnectionPhase::Closed)
    }
}
