mod participant;
mod phase;
mod room;
mod signaling;

pub use participant::{ParticipantId, Role, compute_role};
pub use phase::ConnectionPhase;
pub use room::{CallRoom, CandidateCollection, RoomId};
pub use signaling::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
