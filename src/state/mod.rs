mod autofix;
mod log;
mod status;

pub use autofix::AutoFix;
pub use log::{default_greeting, MessageLog};
pub use status::{StatusTracker, SystemStatus};
