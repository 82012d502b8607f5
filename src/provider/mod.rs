pub mod null;

use crate::session::settings::{SearchQuery, SessionSettings};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

// ── Handles & session records ───────────────────────────────────────────────

/// Opaque provider handle identifying an advertised session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub Uuid);

impl SessionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A session registered under a local name (hosted or joined).
#[derive(Debug, Clone)]
pub struct NamedSession {
    pub name: String,
    pub handle: SessionHandle,
    pub is_host: bool,
    pub settings: SessionSettings,
}

/// One entry of a find result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub handle: SessionHandle,
    /// Host that owns the session; `None` for incomplete records.
    pub owner: Option<String>,
    /// Advertised settings, including the display-name attribute.
    pub settings: SessionSettings,
    pub ping_ms: Option<u32>,
}

impl SearchResult {
    /// Only valid results can be joined.
    pub fn is_valid(&self) -> bool {
        self.owner.is_some() && !self.handle.is_nil()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.settings.server_name()
    }
}

// ── Completions ─────────────────────────────────────────────────────────────

/// Typed outcome of a join request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JoinSessionResult {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

impl JoinSessionResult {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Asynchronous notification delivered once per accepted provider request.
#[derive(Debug, Clone)]
pub enum ProviderCompletion {
    CreateSession {
        session_name: String,
        success: bool,
    },
    DestroySession {
        session_name: String,
        success: bool,
    },
    FindSessions {
        success: bool,
        results: Vec<SearchResult>,
    },
    JoinSession {
        session_name: String,
        result: JoinSessionResult,
    },
}

/// Sending half handed to providers; the coordinator owns the receiver.
pub type CompletionSink = mpsc::UnboundedSender<ProviderCompletion>;
pub type CompletionStream = mpsc::UnboundedReceiver<ProviderCompletion>;

/// Channel over which a provider reports completions.
pub fn completion_channel() -> (CompletionSink, CompletionStream) {
    mpsc::unbounded_channel()
}

// ── Provider capability ─────────────────────────────────────────────────────

/// The online session backend, consumed as an opaque capability.
///
/// Every request method returns immediately. `Ok(())` means the request was
/// accepted and exactly one matching `ProviderCompletion` will be pushed to
/// the provider's sink later. `Err` means it was rejected on the spot and no
/// completion follows.
pub trait SessionProvider {
    /// Name of the concrete backend, e.g. `"NULL"` or `"STEAM"`.
    fn subsystem_name(&self) -> &str;

    /// The session currently registered under `session_name`, if any.
    fn named_session(&self, session_name: &str) -> Option<NamedSession>;

    fn create_session(
        &mut self,
        session_name: &str,
        settings: &SessionSettings,
    ) -> Result<(), ProviderError>;

    fn destroy_session(&mut self, session_name: &str) -> Result<(), ProviderError>;

    fn find_sessions(&mut self, query: &SearchQuery) -> Result<(), ProviderError>;

    fn join_session(
        &mut self,
        session_name: &str,
        result: &SearchResult,
    ) -> Result<(), ProviderError>;

    /// Address a client should connect to for a joined session.
    fn resolved_connect_address(&self, session_name: &str) -> Option<String>;
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Synchronous rejection of a provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    SessionExists(String),
    SessionNotFound(String),
    InvalidSearchResult,
    /// The completion sink has no receiver any more.
    Disconnected,
    Backend(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionExists(name) => write!(f, "session \"{name}\" already exists"),
            Self::SessionNotFound(name) => write!(f, "session \"{name}\" not found"),
            Self::InvalidSearchResult => write!(f, "search result is not joinable"),
            Self::Disconnected => write!(f, "completion receiver dropped"),
            Self::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ── Tests ───────────────────────────────────────────────────────────────────
