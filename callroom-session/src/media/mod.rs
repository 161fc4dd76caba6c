mod acquisition;
mod media_devices;
mod media_track;
mod screen_share;

pub use acquisition::*;
pub use media_devices::*;
pub use media_track::*;
pub use screen_share::*;
