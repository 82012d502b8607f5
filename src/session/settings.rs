use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Constants ───────────────────────────────────────────────────────────────

/// Attribute key under which a session publishes its display name. Create
/// and find must agree on it exactly.
pub const SERVER_NAME_KEY: &str = "SERVER_NAME";

/// Subsystem name of the LAN-only provider.
pub const NULL_SUBSYSTEM: &str = "NULL";

// ── Network mode ────────────────────────────────────────────────────────────

/// How sessions are advertised and discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkMode {
    /// Local broadcast only.
    Lan,
    /// Through the provider's online presence system.
    Presence,
}

impl NetworkMode {
    /// The LAN-only provider implies LAN mode; every other provider is
    /// presence-capable.
    pub fn for_subsystem(subsystem_name: &str) -> Self {
        if subsystem_name == NULL_SUBSYSTEM {
            Self::Lan
        } else {
            Self::Presence
        }
    }

    pub fn is_lan(self) -> bool {
        self == Self::Lan
    }
}

// ── Attributes ──────────────────────────────────────────────────────────────

/// Where a custom attribute is visible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Advertisement {
    DontAdvertise,
    ViaOnlineService,
    ViaOnlineServiceAndPing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionAttribute {
    pub value: String,
    pub advertisement: Advertisement,
}

// ── SessionSettings ─────────────────────────────────────────────────────────

/// Descriptor submitted with a create request and published with the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettings {
    pub num_public_connections: u32,
    pub allow_join_in_progress: bool,
    pub is_dedicated: bool,
    pub should_advertise: bool,
    pub use_lobbies_if_available: bool,
    pub uses_presence: bool,
    pub allow_join_via_presence: bool,
    pub is_lan_match: bool,
    pub attributes: BTreeMap<String, SessionAttribute>,
}

impl SessionSettings {
    /// Settings for a listen-server game session: join in progress, not
    /// dedicated, advertised, lobby/presence based when available.
    pub fn hosted(num_public_connections: u32, mode: NetworkMode, display_name: &str) -> Self {
        let mut settings = Self {
            num_public_connections,
            allow_join_in_progress: true,
            is_dedicated: false,
            should_advertise: true,
            use_lobbies_if_available: true,
            uses_presence: true,
            allow_join_via_presence: true,
            is_lan_match: mode.is_lan(),
            attributes: BTreeMap::new(),
        };
        settings.set(
            SERVER_NAME_KEY,
            display_name,
            Advertisement::ViaOnlineServiceAndPing,
        );
        settings
    }

    pub fn set(&mut self, key: &str, value: &str, advertisement: Advertisement) {
        self.attributes.insert(
            key.to_string(),
            SessionAttribute {
                value: value.to_string(),
                advertisement,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|a| a.value.as_str())
    }

    /// The published display name, if any.
    pub fn server_name(&self) -> Option<&str> {
        self.get(SERVER_NAME_KEY)
    }

    /// Copy of these settings with only the advertised attributes, i.e. what
    /// a searching client gets to see.
    pub fn advertised(&self) -> Self {
        let mut public = self.clone();
        public
            .attributes
            .retain(|_, attr| attr.advertisement != Advertisement::DontAdvertise);
        public
    }
}

// ── SearchQuery ─────────────────────────────────────────────────────────────

/// Parameters of a find request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub is_lan_query: bool,
    pub max_results: u32,
    /// Only return sessions discoverable through presence.
    pub presence_only: bool,
}

impl SearchQuery {
    pub fn new(mode: NetworkMode, max_results: u32) -> Self {
        Self {
            is_lan_query: mode.is_lan(),
            max_results,
            presence_only: true,
        }
    }

    /// Whether a session published with `settings` satisfies this query.
    pub fn matches(&self, settings: &SessionSettings) -> bool {
        settings.should_advertise
            && settings.is_lan_match == self.is_lan_query
            && (!self.presence_only || settings.uses_presence)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_mode_for_subsystem() {
        assert_eq!(NetworkMode::for_subsystem("NULL"), NetworkMode::Lan);
        assert_eq!(NetworkMode::for_subsystem("STEAM"), NetworkMode::Presence);
        // Exact, case-sensitive comparison.
        assert_eq!(NetworkMode::for_subsystem("null"), NetworkMode::Presence);
    }

    #[test]
    fn test_hosted_settings() {
        let settings = SessionSettings::hosted(2, NetworkMode::Presence, "Alice");
        assert_eq!(settings.num_public_connections, 2);
        assert!(settings.allow_join_in_progress);
        assert!(!settings.is_dedicated);
        assert!(settings.should_advertise);
        assert!(settings.use_lobbies_if_available);
        assert!(settings.uses_presence);
        assert!(settings.allow_join_via_presence);
        assert!(!settings.is_lan_match);
        assert_eq!(settings.server_name(), Some("Alice"));
        assert_eq!(
            settings.attributes[SERVER_NAME_KEY].advertisement,
            Advertisement::ViaOnlineServiceAndPing
        );

        let lan = SessionSettings::hosted(2, NetworkMode::Lan, "Alice");
        assert!(lan.is_lan_match);
    }

    #[test]
    fn test_advertised_hides_private_attributes() {
        let mut settings = SessionSettings::hosted(2, NetworkMode::Lan, "Alice");
        settings.set("PASSWORD", "hunter2", Advertisement::DontAdvertise);

        let public = settings.advertised();
        assert_eq!(public.server_name(), Some("Alice"));
        assert_eq!(public.get("PASSWORD"), None);
    }

    #[test]
    fn test_query_matching() {
        let query = SearchQuery::new(NetworkMode::Lan, 10);
        assert!(query.presence_only);

        let lan = SessionSettings::hosted(2, NetworkMode::Lan, "A");
        let online = SessionSettings::hosted(2, NetworkMode::Presence, "B");
        assert!(query.matches(&lan));
        assert!(!query.matches(&online));

        let mut hidden = lan.clone();
        hidden.should_advertise = false;
        assert!(!query.matches(&hidden));

        let mut no_presence = lan;
        no_presence.uses_presence = false;
        assert!(!query.matches(&no_presence));
    }
}
