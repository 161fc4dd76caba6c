mod candidate_buffer;
mod connection_wrapper;
mod peer_connection;
mod transport_config;
mod transport_event;

pub use candidate_buffer::*;
pub use connection_wrapper::*;
pub use peer_connection::*;
pub use transport_config::*;
pub use transport_event::*;

#[cfg(test)]
pub(crate) mod test_peer;
