use crate::model::signaling::SessionDescription;
use crate::utils::CALL_ROOMS_COLLECTION;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a call room. Rooms are keyed by the conversation the call
/// was started from, so both participants derive the same id.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn for_conversation(conversation_id: &str) -> Self {
        Self(conversation_id.to_owned())
    }

    /// Document path of the room record inside the relay.
    pub fn path(&self) -> String {
        format!("{}/{}", CALL_ROOMS_COLLECTION, self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared record both peers use to exchange session descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRoom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<SessionDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<SessionDescription>,
}

impl CallRoom {
    pub fn with_offer(offer: SessionDescription) -> Self {
        Self {
            offer: Some(offer),
            answer: None,
        }
    }

    pub fn with_answer(answer: SessionDescription) -> Self {
        Self {
            offer: None,
            answer: Some(answer),
        }
    }

    /// Merge-write: fields present in `patch` win, absent ones are kept.
    pub fn merge(&mut self, patch: CallRoom) {
        if let Some(offer) = patch.offer {
            self.offer = Some(offer);
        }
        if let Some(answer) = patch.answer {
            self.answer = Some(answer);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offer.is_none() && self.answer.is_none()
    }
}

/// The two append-only candidate lists kept under every room.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CandidateCollection {
    #[serde(rename = "offerCandidates")]
    OfferCandidates,
    #[serde(rename = "answerCandidates")]
    AnswerCandidates,
}

impl CandidateCollection {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateCollection::OfferCandidates => "offerCandidates",
            CandidateCollection::AnswerCandidates => "answerCandidates",
        }
    }
}

impl fmt::Display for CandidateCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
