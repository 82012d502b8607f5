use crate::config::SessionConfig;
use crate::logging::SCREEN_TARGET;
use crate::provider::{
    CompletionStream, JoinSessionResult, ProviderCompletion, SearchResult, SessionProvider,
};
use crate::session::settings::{NetworkMode, SearchQuery, SessionSettings};
use crate::session::{
    OutcomeReason, RecreateState, SearchState, SessionEvent, SessionListener,
};
use crate::travel::{listen_url, TravelHandler, TravelType};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

// ── Constants ───────────────────────────────────────────────────────────────

/// Capacity of the outcome broadcast channel.
const EVENT_CAPACITY: usize = 64;

// ── SessionCoordinator ──────────────────────────────────────────────────────

/// Owns the lifecycle of the one session this process hosts or joins.
///
/// Requests (`create_server`, `join_server`) return immediately; the outcome
/// arrives later as a `SessionEvent`, after the provider's completion has
/// been fed through `poll` / `next_completion` / `handle_completion`.
/// Completions are handled one at a time on the caller's thread.
///
/// One coordinator per process: its session name is fixed at construction.
pub struct SessionCoordinator<P, T> {
    config: SessionConfig,
    provider: P,
    travel: T,
    completions: CompletionStream,
    recreate: RecreateState,
    search: SearchState,
    listener: Option<Weak<dyn SessionListener>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<P: SessionProvider, T: TravelHandler> SessionCoordinator<P, T> {
    /// Build a coordinator over `provider`, whose completions must arrive on
    /// `completions`.
    ///
    /// The caller receives `SessionEvent`s on the returned receiver; more
    /// receivers can be added with `subscribe`.
    pub fn new(
        config: SessionConfig,
        provider: P,
        travel: T,
        completions: CompletionStream,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let (events, event_rx) = broadcast::channel(EVENT_CAPACITY);

        log::info!(
            "Session coordinator ready for \"{}\" on {} ({:?})",
            config.session_name,
            provider.subsystem_name(),
            NetworkMode::for_subsystem(provider.subsystem_name()),
        );

        let coordinator = Self {
            config,
            provider,
            travel,
            completions,
            recreate: RecreateState::Idle,
            search: SearchState::Idle,
            listener: None,
            events,
        };
        (coordinator, event_rx)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn session_name(&self) -> &str {
        &self.config.session_name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Register the UI listener. Only the most recent one is kept, weakly.
    pub fn add_listener(&mut self, listener: &Arc<dyn SessionListener>) {
        self.listener = Some(Arc::downgrade(listener));
    }

    /// Whether the active provider is `subsystem_name` (e.g. `"STEAM"`).
    pub fn is_subsystem_active(&self, subsystem_name: &str) -> bool {
        self.provider.subsystem_name() == subsystem_name
    }

    /// LAN or presence, derived from the provider active right now.
    pub fn network_mode(&self) -> NetworkMode {
        NetworkMode::for_subsystem(self.provider.subsystem_name())
    }

    /// Name a create is waiting to use once the stale session is destroyed.
    pub fn pending_recreate_name(&self) -> Option<String> {
        self.recreate.desired_name().map(str::to_string)
    }

    /// Display name the in-flight search will try to join.
    pub fn search_target(&self) -> Option<String> {
        self.search.target().map(str::to_string)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[cfg(test)]
    fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn travel(&self) -> &T {
        &self.travel
    }

    // ── Requests ────────────────────────────────────────────────────────

    /// Host a new session published under `server_name`.
    ///
    /// If a session already exists under our name it is destroyed first and
    /// the create is issued from the destroy completion. Requests made while
    /// that destroy is pending only replace the name to use.
    pub fn create_server(&mut self, server_name: &str) {
        log::info!(target: SCREEN_TARGET, "Creating server \"{server_name}\"");

        if server_name.is_empty() {
            if let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) {
                listener.created_server_with_no_name();
            }
            log::warn!(target: SCREEN_TARGET, "Server name cannot be empty");
            self.emit(SessionEvent::EmptyServerName);
            self.emit(SessionEvent::outcome(false, OutcomeReason::EmptyServerName));
            return;
        }

        if self.recreate.is_pending() {
            log::info!("Destroy already pending, recreate will use \"{server_name}\" instead");
            self.recreate = RecreateState::PendingRecreate {
                desired_name: server_name.to_string(),
            };
            return;
        }

        if self
            .provider
            .named_session(&self.config.session_name)
            .is_some()
        {
            log::info!(target: SCREEN_TARGET, "Session already exists, destroying it");
            self.recreate = RecreateState::PendingRecreate {
                desired_name: server_name.to_string(),
            };
            self.destroy_session();
            return;
        }

        let settings = SessionSettings::hosted(
            self.config.public_connections,
            self.network_mode(),
            server_name,
        );

        if let Err(e) = self
            .provider
            .create_session(&self.config.session_name, &settings)
        {
            log::error!("Create session request rejected: {e}");
            self.on_create_session_complete(false);
        }
    }

    /// Search for a session published under `server_name` and join the first
    /// one found.
    ///
    /// Starting a new search before the previous one completed is a caller
    /// error; the newer target replaces the older one.
    pub fn join_server(&mut self, server_name: &str) {
        log::info!(target: SCREEN_TARGET, "Joining server \"{server_name}\"");

        if server_name.is_empty() {
            log::warn!(target: SCREEN_TARGET, "Server name cannot be empty");
            self.emit(SessionEvent::outcome(false, OutcomeReason::EmptyServerName));
            return;
        }

        if let Some(previous) = self.search.target() {
            log::warn!("Search for \"{previous}\" still in flight, replacing it with \"{server_name}\"");
        }

        let query = SearchQuery::new(self.network_mode(), self.config.max_search_results);
        self.search = SearchState::Searching {
            target: server_name.to_string(),
        };

        if let Err(e) = self.provider.find_sessions(&query) {
            log::error!("Find sessions request rejected: {e}");
            self.on_find_sessions_complete(false, Vec::new());
        }
    }

    fn destroy_session(&mut self) {
        if let Err(e) = self.provider.destroy_session(&self.config.session_name) {
            log::warn!("Destroy session request rejected: {e}");
            self.on_destroy_session_complete(false);
        }
    }

    // ── Completions ─────────────────────────────────────────────────────

    /// Handle every completion already queued, in arrival order. Returns how
    /// many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Wait for the next completion and handle it. Returns `false` once the
    /// provider side of the channel is gone.
    pub async fn next_completion(&mut self) -> bool {
        match self.completions.recv().await {
            Some(completion) => {
                self.handle_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Dispatch a single provider completion.
    pub fn handle_completion(&mut self, completion: ProviderCompletion) {
        match completion {
            ProviderCompletion::CreateSession {
                session_name,
                success,
            } => {
                if self.is_ours(&session_name) {
                    self.on_create_session_complete(success);
                }
            }
            ProviderCompletion::DestroySession {
                session_name,
                success,
            } => {
                if self.is_ours(&session_name) {
                    self.on_destroy_session_complete(success);
                }
            }
            ProviderCompletion::FindSessions { success, results } => {
                self.on_find_sessions_complete(success, results);
            }
            ProviderCompletion::JoinSession {
                session_name,
                result,
            } => {
                if self.is_ours(&session_name) {
                    self.on_join_session_complete(result);
                }
            }
        }
    }

    fn on_create_session_complete(&mut self, success: bool) {
        log::info!(target: SCREEN_TARGET, "Create session complete: {success}");

        let reason = if success {
            OutcomeReason::Created
        } else {
            OutcomeReason::CreateFailed
        };
        self.emit(SessionEvent::outcome(success, reason));

        if success {
            let url = listen_url(&self.config.host_level);
            log::info!("Hosting, travelling to {url}");
            self.travel.server_travel(&url);
        }
    }

    fn on_destroy_session_complete(&mut self, success: bool) {
        log::info!(target: SCREEN_TARGET, "Destroy session complete: {success}");

        let Some(desired_name) = self.recreate.take() else {
            return;
        };

        // Recreating on top of a surviving session would destroy it again,
        // forever.
        if self
            .provider
            .named_session(&self.config.session_name)
            .is_some()
        {
            log::error!(
                "Session \"{}\" survived destruction, not recreating \"{desired_name}\"",
                self.config.session_name
            );
            self.emit(SessionEvent::outcome(false, OutcomeReason::RecreateFailed));
            return;
        }

        self.create_server(&desired_name);
    }

    fn on_find_sessions_complete(&mut self, success: bool, results: Vec<SearchResult>) {
        let reason = if success {
            OutcomeReason::SearchCompleted
        } else {
            OutcomeReason::SearchFailed
        };
        self.emit(SessionEvent::outcome(success, reason));

        let wanted = self.search.take();
        if !success {
            log::warn!("Find sessions failed");
            return;
        }
        let Some(wanted) = wanted.filter(|name| !name.is_empty()) else {
            return;
        };

        if results.is_empty() {
            log::info!(target: SCREEN_TARGET, "No servers found");
        } else {
            log::info!(target: SCREEN_TARGET, "Found {} server(s)", results.len());
        }

        match find_server(&results, &wanted) {
            Some(result) => {
                log::info!(target: SCREEN_TARGET, "{wanted}");
                if let Err(e) = self
                    .provider
                    .join_session(&self.config.session_name, result)
                {
                    log::error!("Join session request rejected: {e}");
                    self.on_join_session_complete(JoinSessionResult::UnknownError);
                }
            }
            None => {
                log::info!(target: SCREEN_TARGET, "Couldn't find server \"{wanted}\"");
                self.emit(SessionEvent::outcome(false, OutcomeReason::NoMatchingServer));
            }
        }
    }

    fn on_join_session_complete(&mut self, result: JoinSessionResult) {
        if !result.is_success() {
            log::warn!(target: SCREEN_TARGET, "Join session failed: {result:?}");
            self.report_join_failure(result);
            return;
        }

        log::info!(target: SCREEN_TARGET, "Successfully joined session");

        let Some(address) = self
            .provider
            .resolved_connect_address(&self.config.session_name)
        else {
            log::warn!(target: SCREEN_TARGET, "Could not resolve connect address");
            self.report_join_failure(JoinSessionResult::CouldNotRetrieveAddress);
            return;
        };

        log::info!("Connecting to {address}");
        if let Err(e) = self.travel.client_travel(&address, TravelType::Absolute) {
            log::warn!("Client travel to {address} failed: {e}");
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn is_ours(&self, session_name: &str) -> bool {
        let ours = session_name == self.config.session_name;
        if !ours {
            log::debug!("Ignoring completion for foreign session \"{session_name}\"");
        }
        ours
    }

    fn report_join_failure(&self, result: JoinSessionResult) {
        if self.config.report_join_failures {
            self.emit(SessionEvent::JoinFailed { result });
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// First valid result whose published display name equals `server_name`
/// exactly. Order is the provider's; later matches are never considered.
pub fn find_server<'a>(results: &'a [SearchResult], server_name: &str) -> Option<&'a SearchResult> {
    results
        .iter()
        .find(|r| r.is_valid() && r.server_name() == Some(server_name))
}

// ── Tests ───────────────────────────────────────────────────────────────────
