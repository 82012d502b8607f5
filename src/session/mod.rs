pub mod coordinator;
pub mod settings;

pub use coordinator::SessionCoordinator;

use crate::provider::JoinSessionResult;

// ── Session Event ───────────────────────────────────────────────────────────

/// Why a `ServerOutcome` was emitted. The boolean alone is overloaded; the
/// reason tells the conditions apart without changing when or how often the
/// outcome fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeReason {
    /// Create or join was requested with an empty display name.
    EmptyServerName,
    Created,
    CreateFailed,
    /// The old session was still registered after its destroy completed or
    /// was rejected, so the recreate was abandoned. A provider that removes
    /// the session before signalling destroy never triggers this.
    RecreateFailed,
    /// The search mechanism itself finished (says nothing about a match).
    SearchCompleted,
    SearchFailed,
    /// The search ran but no session carried the requested name.
    NoMatchingServer,
}

/// Events emitted by the coordinator to the application / UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The create/search outcome channel.
    ServerOutcome { success: bool, reason: OutcomeReason },
    /// A server was requested with an empty display name.
    EmptyServerName,
    /// A join did not end in a connect. Only emitted when
    /// `SessionConfig::report_join_failures` is set.
    JoinFailed { result: JoinSessionResult },
}

impl SessionEvent {
    pub(crate) fn outcome(success: bool, reason: OutcomeReason) -> Self {
        Self::ServerOutcome { success, reason }
    }
}

// ── Listener ────────────────────────────────────────────────────────────────

/// UI collaborator notified about conditions it must show to the user. The
/// coordinator holds it weakly.
pub trait SessionListener: Send + Sync {
    fn created_server_with_no_name(&self);
}

// ── Coordinator state ───────────────────────────────────────────────────────

/// Whether a create is waiting on the destruction of a stale session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum RecreateState {
    #[default]
    Idle,
    PendingRecreate { desired_name: String },
}

impl RecreateState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingRecreate { .. })
    }

    pub fn desired_name(&self) -> Option<&str> {
        match self {
            Self::PendingRecreate { desired_name } => Some(desired_name),
            Self::Idle => None,
        }
    }

    /// Take the pending name out, leaving `Idle` behind.
    pub fn take(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Self::PendingRecreate { desired_name } => Some(desired_name),
            Self::Idle => None,
        }
    }
}

/// Whether a find-then-join flow is waiting on search results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum SearchState {
    #[default]
    Idle,
    Searching { target: String },
}

impl SearchState {
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Searching { target } => Some(target),
            Self::Idle => None,
        }
    }

    pub fn take(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Self::Searching { target } => Some(target),
            Self::Idle => None,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
