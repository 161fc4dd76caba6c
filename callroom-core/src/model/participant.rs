use crate::model::room::CandidateCollection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a call participant, as issued by the identity provider.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side of the offer/answer exchange a peer plays for the whole session.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    /// Sub-collection this peer appends its own candidates to.
    pub fn outgoing_candidates(self) -> CandidateCollection {
        match self {
            Role::Offerer => CandidateCollection::OfferCandidates,
            Role::Answerer => CandidateCollection::AnswerCandidates,
        }
    }

    /// Sub-collection holding the remote peer's candidates.
    pub fn incoming_candidates(self) -> CandidateCollection {
        self.opposite().outgoing_candidates()
    }

    pub fn opposite(self) -> Role {
        match self {
            Role::Offerer => Role::Answerer,
            Role::Answerer => Role::Offerer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Offerer => f.write_str("offerer"),
            Role::Answerer => f.write_str("answerer"),
        }
    }
}

/// Assigns the negotiation role of `local` in a call with `remote`.
///
/// The participant whose identifier sorts first (byte-wise lexicographic
/// order) is the [`Role::Offerer`]. Both peers evaluate this on their own and
/// always reach complementary answers, so no coordination round-trip is
/// needed. Equal identifiers resolve to `Offerer`; a participant calling
/// itself is rejected before this point.
pub fn compute_role(local: &ParticipantId, remote: &ParticipantId) -> Role {
    if local.0 <= remote.0 {
        Role::Offerer
    } else {
        Role::Answerer
    }
}
