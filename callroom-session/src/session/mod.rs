mod call_handle;
mod call_manager;
mod lifecycle;
mod session;
mod session_command;
mod session_event;

pub use call_handle::*;
pub use call_manager::*;
pub use lifecycle::*;
pub use session::*;
pub use session_command::*;
pub use session_event::*;
