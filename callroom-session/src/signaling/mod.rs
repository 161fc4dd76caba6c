mod memory_relay;
mod signaling_bridge;
mod signaling_relay;
mod subscription;

pub use memory_relay::*;
pub use signaling_bridge::*;
pub use signaling_relay::*;
pub use subscription::*;
