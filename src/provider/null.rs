use super::{
    CompletionSink, JoinSessionResult, NamedSession, ProviderCompletion, ProviderError,
    SearchResult, SessionHandle, SessionProvider,
};
use crate::session::settings::{SearchQuery, SessionSettings, NULL_SUBSYSTEM};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ── LanNetwork ──────────────────────────────────────────────────────────────

/// A session advertised on the simulated LAN.
#[derive(Debug, Clone)]
struct AdvertisedSession {
    handle: SessionHandle,
    owner: String,
    host_address: String,
    settings: SessionSettings,
    open_connections: u32,
}

/// In-process stand-in for the local network: every `NullProvider` built on
/// a clone of the same `LanNetwork` sees the others' advertised sessions.
#[derive(Debug, Clone, Default)]
pub struct LanNetwork {
    advertised: Arc<Mutex<Vec<AdvertisedSession>>>,
}

impl LanNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently advertised.
    pub fn advertised_count(&self) -> usize {
        self.advertised.lock().len()
    }

    /// Open public connections left on an advertised session.
    pub fn open_connections(&self, handle: SessionHandle) -> Option<u32> {
        self.advertised
            .lock()
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.open_connections)
    }

    fn advertise(&self, session: AdvertisedSession) {
        self.advertised.lock().push(session);
    }

    fn withdraw(&self, handle: SessionHandle) {
        self.advertised.lock().retain(|s| s.handle != handle);
    }

    fn search(&self, query: &SearchQuery, exclude_owner: &str) -> Vec<SearchResult> {
        self.advertised
            .lock()
            .iter()
            .filter(|s| s.owner != exclude_owner && query.matches(&s.settings))
            .take(query.max_results as usize)
            .map(|s| SearchResult {
                handle: s.handle,
                owner: Some(s.owner.clone()),
                settings: s.settings.advertised(),
                ping_ms: None,
            })
            .collect()
    }

    /// Reserve one public connection. Returns the host address on success.
    fn reserve(&self, handle: SessionHandle) -> Result<String, JoinSessionResult> {
        let mut advertised = self.advertised.lock();
        let session = advertised
            .iter_mut()
            .find(|s| s.handle == handle)
            .ok_or(JoinSessionResult::SessionDoesNotExist)?;

        if session.open_connections == 0 {
            return Err(JoinSessionResult::SessionIsFull);
        }
        session.open_connections -= 1;
        Ok(session.host_address.clone())
    }

    fn release(&self, handle: SessionHandle) {
        let mut advertised = self.advertised.lock();
        if let Some(session) = advertised.iter_mut().find(|s| s.handle == handle) {
            session.open_connections =
                (session.open_connections + 1).min(session.settings.num_public_connections);
        }
    }
}

// ── NullProvider ────────────────────────────────────────────────────────────

/// A local session registered with this provider.
#[derive(Debug, Clone)]
struct LocalSession {
    session: NamedSession,
    /// Set for joined sessions: where the host can be reached.
    host_address: Option<String>,
}

/// LAN-only provider with no transport: sessions live in a shared
/// `LanNetwork` and every request completes on the next dispatch.
pub struct NullProvider {
    network: LanNetwork,
    /// Identifies this player/host on the network.
    owner: String,
    /// Address peers connect to when joining a session hosted here.
    host_address: String,
    sessions: HashMap<String, LocalSession>,
    sink: CompletionSink,
}

impl NullProvider {
    pub fn new(
        network: LanNetwork,
        owner: impl Into<String>,
        host_address: impl Into<String>,
        sink: CompletionSink,
    ) -> Self {
        Self {
            network,
            owner: owner.into(),
            host_address: host_address.into(),
            sessions: HashMap::new(),
            sink,
        }
    }

    fn complete(&self, completion: ProviderCompletion) -> Result<(), ProviderError> {
        self.sink
            .send(completion)
            .map_err(|_| ProviderError::Disconnected)
    }
}

impl SessionProvider for NullProvider {
    fn subsystem_name(&self) -> &str {
        NULL_SUBSYSTEM
    }

    fn named_session(&self, session_name: &str) -> Option<NamedSession> {
        self.sessions.get(session_name).map(|s| s.session.clone())
    }

    fn create_session(
        &mut self,
        session_name: &str,
        settings: &SessionSettings,
    ) -> Result<(), ProviderError> {
        if self.sessions.contains_key(session_name) {
            return Err(ProviderError::SessionExists(session_name.to_string()));
        }

        let handle = SessionHandle::new();
        if settings.should_advertise {
            self.network.advertise(AdvertisedSession {
                handle,
                owner: self.owner.clone(),
                host_address: self.host_address.clone(),
                settings: settings.clone(),
                open_connections: settings.num_public_connections,
            });
        }

        self.sessions.insert(
            session_name.to_string(),
            LocalSession {
                session: NamedSession {
                    name: session_name.to_string(),
                    handle,
                    is_host: true,
                    settings: settings.clone(),
                },
                host_address: None,
            },
        );

        log::debug!("NULL: created session \"{session_name}\" ({handle})");

        self.complete(ProviderCompletion::CreateSession {
            session_name: session_name.to_string(),
            success: true,
        })
    }

    fn destroy_session(&mut self, session_name: &str) -> Result<(), ProviderError> {
        let local = self
            .sessions
            .remove(session_name)
            .ok_or_else(|| ProviderError::SessionNotFound(session_name.to_string()))?;

        // Withdraw before signalling so a recreate never sees the old session.
        if local.session.is_host {
            self.network.withdraw(local.session.handle);
        } else {
            self.network.release(local.session.handle);
        }

        log::debug!("NULL: destroyed session \"{session_name}\"");

        self.complete(ProviderCompletion::DestroySession {
            session_name: session_name.to_string(),
            success: true,
        })
    }

    fn find_sessions(&mut self, query: &SearchQuery) -> Result<(), ProviderError> {
        let results = self.network.search(query, &self.owner);
        log::debug!("NULL: search matched {} session(s)", results.len());

        self.complete(ProviderCompletion::FindSessions {
            success: true,
            results,
        })
    }

    fn join_session(
        &mut self,
        session_name: &str,
        result: &SearchResult,
    ) -> Result<(), ProviderError> {
        if !result.is_valid() {
            return Err(ProviderError::InvalidSearchResult);
        }

        let outcome = if self.sessions.contains_key(session_name) {
            JoinSessionResult::AlreadyInSession
        } else {
            match self.network.reserve(result.handle) {
                Ok(host_address) => {
                    self.sessions.insert(
                        session_name.to_string(),
                        LocalSession {
                            session: NamedSession {
                                name: session_name.to_string(),
                                handle: result.handle,
                                is_host: false,
                                settings: result.settings.clone(),
                            },
                            host_address: Some(host_address),
                        },
                    );
                    JoinSessionResult::Success
                }
                Err(failure) => failure,
            }
        };

        log::debug!("NULL: join \"{session_name}\" -> {outcome:?}");

        self.complete(ProviderCompletion::JoinSession {
            session_name: session_name.to_string(),
            result: outcome,
        })
    }

    fn resolved_connect_address(&self, session_name: &str) -> Option<String> {
        self.sessions
            .get(session_name)
            .and_then(|s| s.host_address.clone())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{completion_channel, CompletionStream};
    use crate::session::settings::NetworkMode;

    const SESSION: &str = "Game Session";

    fn provider(network: &LanNetwork, owner: &str) -> (NullProvider, CompletionStream) {
        let (sink, stream) = completion_channel();
        let address = format!("{owner}.lan:7777");
        (NullProvider::new(network.clone(), owner, address, sink), stream)
    }

    fn lan_settings(name: &str) -> SessionSettings {
        SessionSettings::hosted(2, NetworkMode::Lan, name)
    }

    fn lan_query() -> SearchQuery {
        SearchQuery::new(NetworkMode::Lan, 9999)
    }

    /// Issue a find and return the results from its completion.
    fn find(provider: &mut NullProvider, stream: &mut CompletionStream) -> Vec<SearchResult> {
        provider.find_sessions(&lan_query()).unwrap();
        match stream.try_recv().unwrap() {
            ProviderCompletion::FindSessions { success, results } => {
                assert!(success);
                results
            }
            other => panic!("Expected FindSessions, got {other:?}"),
        }
    }

    fn join_result(stream: &mut CompletionStream) -> JoinSessionResult {
        match stream.try_recv().unwrap() {
            ProviderCompletion::JoinSession { result, .. } => result,
            other => panic!("Expected JoinSession, got {other:?}"),
        }
    }

    // ── Create / destroy ────────────────────────────────────────────────

    #[test]
    fn test_create_registers_and_advertises() {
        let network = LanNetwork::new();
        let (mut host, mut stream) = provider(&network, "host");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();

        assert!(matches!(
            stream.try_recv(),
            Ok(ProviderCompletion::CreateSession { success: true, .. })
        ));
        let named = host.named_session(SESSION).unwrap();
        assert!(named.is_host);
        assert_eq!(named.settings.server_name(), Some("Alice"));
        assert_eq!(network.advertised_count(), 1);
        assert_eq!(network.open_connections(named.handle), Some(2));
    }

    #[test]
    fn test_create_duplicate_is_rejected() {
        let network = LanNetwork::new();
        let (mut host, mut stream) = provider(&network, "host");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();
        let _ = stream.try_recv();

        let err = host.create_session(SESSION, &lan_settings("Bob")).unwrap_err();
        assert_eq!(err, ProviderError::SessionExists(SESSION.into()));
        assert!(stream.try_recv().is_err(), "rejection must not complete");
    }

    #[test]
    fn test_unadvertised_session_is_not_published() {
        let network = LanNetwork::new();
        let (mut host, _stream) = provider(&network, "host");

        let mut settings = lan_settings("Hidden");
        settings.should_advertise = false;
        host.create_session(SESSION, &settings).unwrap();

        assert!(host.named_session(SESSION).is_some());
        assert_eq!(network.advertised_count(), 0);
    }

    #[test]
    fn test_destroy_withdraws_before_completing() {
        let network = LanNetwork::new();
        let (mut host, mut stream) = provider(&network, "host");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();
        let _ = stream.try_recv();

        host.destroy_session(SESSION).unwrap();
        assert!(host.named_session(SESSION).is_none());
        assert_eq!(network.advertised_count(), 0);
        assert!(matches!(
            stream.try_recv(),
            Ok(ProviderCompletion::DestroySession { success: true, .. })
        ));
    }

    #[test]
    fn test_destroy_unknown_is_rejected() {
        let network = LanNetwork::new();
        let (mut host, _stream) = provider(&network, "host");
        assert_eq!(
            host.destroy_session(SESSION),
            Err(ProviderError::SessionNotFound(SESSION.into()))
        );
    }

    #[test]
    fn test_dropped_receiver_reports_disconnected() {
        let network = LanNetwork::new();
        let (mut host, stream) = provider(&network, "host");
        drop(stream);

        assert_eq!(
            host.find_sessions(&lan_query()),
            Err(ProviderError::Disconnected)
        );
    }

    // ── Find ────────────────────────────────────────────────────────────

    #[test]
    fn test_find_excludes_own_and_preserves_order() {
        let network = LanNetwork::new();
        let (mut a, _sa) = provider(&network, "a");
        let (mut b, _sb) = provider(&network, "b");
        let (mut client, mut stream) = provider(&network, "client");

        a.create_session(SESSION, &lan_settings("Carl")).unwrap();
        b.create_session(SESSION, &lan_settings("Bob")).unwrap();
        client.create_session("own", &lan_settings("Mine")).unwrap();
        let _ = stream.try_recv();

        let results = find(&mut client, &mut stream);
        let names: Vec<_> = results.iter().filter_map(|r| r.server_name()).collect();
        assert_eq!(names, vec!["Carl", "Bob"]);
        assert!(results.iter().all(SearchResult::is_valid));
    }

    #[test]
    fn test_find_respects_mode_and_ceiling() {
        let network = LanNetwork::new();
        let (mut a, _sa) = provider(&network, "a");
        let (mut b, _sb) = provider(&network, "b");
        let (mut client, mut stream) = provider(&network, "client");

        a.create_session(SESSION, &lan_settings("Lan")).unwrap();
        b.create_session(
            SESSION,
            &SessionSettings::hosted(2, NetworkMode::Presence, "Online"),
        )
        .unwrap();

        let results = find(&mut client, &mut stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].server_name(), Some("Lan"));

        client
            .find_sessions(&SearchQuery::new(NetworkMode::Lan, 0))
            .unwrap();
        assert!(matches!(
            stream.try_recv(),
            Ok(ProviderCompletion::FindSessions { results, .. }) if results.is_empty()
        ));
    }

    // ── Join ────────────────────────────────────────────────────────────

    #[test]
    fn test_join_consumes_connection_and_resolves_address() {
        let network = LanNetwork::new();
        let (mut host, _sh) = provider(&network, "host");
        let (mut client, mut stream) = provider(&network, "client");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();
        let result = find(&mut client, &mut stream).remove(0);

        client.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut stream), JoinSessionResult::Success);
        assert_eq!(
            client.resolved_connect_address(SESSION).as_deref(),
            Some("host.lan:7777")
        );
        assert_eq!(network.open_connections(result.handle), Some(1));

        // Hosts have nothing to connect to.
        assert_eq!(host.resolved_connect_address(SESSION), None);

        // Leaving gives the connection back.
        client.destroy_session(SESSION).unwrap();
        assert_eq!(network.open_connections(result.handle), Some(2));
    }

    #[test]
    fn test_join_twice_is_already_in_session() {
        let network = LanNetwork::new();
        let (mut host, _sh) = provider(&network, "host");
        let (mut client, mut stream) = provider(&network, "client");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();
        let result = find(&mut client, &mut stream).remove(0);

        client.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut stream), JoinSessionResult::Success);
        client.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut stream), JoinSessionResult::AlreadyInSession);
    }

    #[test]
    fn test_join_full_session() {
        let network = LanNetwork::new();
        let (mut host, _sh) = provider(&network, "host");
        host.create_session(SESSION, &SessionSettings::hosted(1, NetworkMode::Lan, "Solo"))
            .unwrap();

        let (mut first, mut s1) = provider(&network, "first");
        let (mut second, mut s2) = provider(&network, "second");
        let result = find(&mut first, &mut s1).remove(0);

        first.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut s1), JoinSessionResult::Success);

        second.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut s2), JoinSessionResult::SessionIsFull);
        assert!(second.named_session(SESSION).is_none());
    }

    #[test]
    fn test_join_vanished_session() {
        let network = LanNetwork::new();
        let (mut host, _sh) = provider(&network, "host");
        let (mut client, mut stream) = provider(&network, "client");

        host.create_session(SESSION, &lan_settings("Alice")).unwrap();
        let result = find(&mut client, &mut stream).remove(0);
        host.destroy_session(SESSION).unwrap();

        client.join_session(SESSION, &result).unwrap();
        assert_eq!(join_result(&mut stream), JoinSessionResult::SessionDoesNotExist);
        assert_eq!(client.resolved_connect_address(SESSION), None);
    }

    #[test]
    fn test_join_invalid_result_is_rejected() {
        let network = LanNetwork::new();
        let (mut client, mut stream) = provider(&network, "client");

        let result = SearchResult {
            handle: SessionHandle::new(),
            owner: None,
            settings: lan_settings("Ghost"),
            ping_ms: None,
        };
        assert_eq!(
            client.join_session(SESSION, &result),
            Err(ProviderError::InvalidSearchResult)
        );
        assert!(stream.try_recv().is_err());
    }
}
