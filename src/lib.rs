//! Lifecycle coordination for a multiplayer game session hosted on an
//! external online session provider: create, find-and-join, and
//! destroy-then-recreate, driven by asynchronous provider completions.

pub mod config;
pub mod logging;
pub mod provider;
pub mod session;
pub mod travel;

pub use config::{ConfigError, SessionConfig};
pub use provider::null::{LanNetwork, NullProvider};
pub use provider::{
    completion_channel, CompletionSink, CompletionStream, JoinSessionResult, ProviderCompletion,
    ProviderError, SearchResult, SessionHandle, SessionProvider,
};
pub use session::settings::{NetworkMode, SearchQuery, SessionSettings, SERVER_NAME_KEY};
pub use session::{OutcomeReason, SessionCoordinator, SessionEvent, SessionListener};
pub use travel::{TravelError, TravelHandler, TravelType};
