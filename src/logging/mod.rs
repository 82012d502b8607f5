pub mod logger;
pub mod screen;

pub use logger::{init_logger, SessionLogger};
pub use screen::{OnScreenMessage, OnScreenMessages};

/// Log target for diagnostics meant for the player's screen as well as the
/// log file.
pub const SCREEN_TARGET: &str = "screen";
