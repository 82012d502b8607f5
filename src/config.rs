use serde::{Deserialize, Serialize};

// ── Constants ───────────────────────────────────────────────────────────────

/// Fixed provider-level name of the session this process owns or joins.
pub const DEFAULT_SESSION_NAME: &str = "Project W Session Name";

/// Level the host travels to once its session is created.
pub const DEFAULT_HOST_LEVEL: &str = "/Game/Levels/TwoPlayerGame";

/// Public connections advertised for a hosted session.
pub const DEFAULT_PUBLIC_CONNECTIONS: u32 = 2;

/// Effectively "return every match".
pub const DEFAULT_MAX_SEARCH_RESULTS: u32 = 9999;

const ENV_SESSION_NAME: &str = "MPSESSIONS_SESSION_NAME";
const ENV_HOST_LEVEL: &str = "MPSESSIONS_HOST_LEVEL";
const ENV_MAX_SEARCH_RESULTS: &str = "MPSESSIONS_MAX_SEARCH_RESULTS";
const ENV_REPORT_JOIN_FAILURES: &str = "MPSESSIONS_REPORT_JOIN_FAILURES";

// ── SessionConfig ───────────────────────────────────────────────────────────

/// Construction-time settings for a `SessionCoordinator`.
///
/// The session name is fixed for the coordinator's lifetime; it is not
/// chosen per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub session_name: String,
    pub host_level: String,
    pub public_connections: u32,
    pub max_search_results: u32,
    /// Emit `SessionEvent::JoinFailed` when a join does not lead to a
    /// connect. Off by default: join failures are only logged.
    pub report_join_failures: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.into(),
            host_level: DEFAULT_HOST_LEVEL.into(),
            public_connections: DEFAULT_PUBLIC_CONNECTIONS,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            report_join_failures: false,
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by any `MPSESSIONS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (used by tests).
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_SESSION_NAME) {
            config.session_name = name;
        }
        if let Some(level) = lookup(ENV_HOST_LEVEL) {
            config.host_level = level;
        }
        if let Some(raw) = lookup(ENV_MAX_SEARCH_RESULTS) {
            config.max_search_results = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_SEARCH_RESULTS,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_REPORT_JOIN_FAILURES) {
            config.report_join_failures = parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: ENV_REPORT_JOIN_FAILURES,
                value: raw.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_name.trim().is_empty() {
            return Err(ConfigError::EmptySessionName);
        }
        if self.host_level.trim().is_empty() {
            return Err(ConfigError::EmptyHostLevel);
        }
        if self.public_connections == 0 {
            return Err(ConfigError::NoPublicConnections);
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptySessionName,
    EmptyHostLevel,
    NoPublicConnections,
    InvalidValue { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySessionName => write!(f, "session name cannot be empty"),
            Self::EmptyHostLevel => write!(f, "host level cannot be empty"),
            Self::NoPublicConnections => write!(f, "public connections must be at least 1"),
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: \"{value}\""),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Tests ───────────────────────────────────────────────────────────────────
