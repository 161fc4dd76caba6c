pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Name of the relay collection that stores call rooms.
pub const CALL_ROOMS_COLLECTION: &str = "videoCalls";
