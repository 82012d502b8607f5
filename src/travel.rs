// ── Travel ──────────────────────────────────────────────────────────────────

/// Option appended to a level URL to host it as a listen server.
const LISTEN_OPTION: &str = "listen";

/// How a client travel address is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelType {
    /// Full address, replacing the current one.
    Absolute,
    /// Relative to the current URL.
    Relative,
}

/// Engine-side actions the coordinator triggers once a session is usable.
pub trait TravelHandler {
    /// Begin hosting and move every connected participant to `url`.
    fn server_travel(&mut self, url: &str);

    /// Connect the local controlling client to `address`.
    fn client_travel(&mut self, address: &str, travel_type: TravelType) -> Result<(), TravelError>;
}

/// `"<level>?listen"`, the URL a host travels to after creating its session.
pub fn listen_url(level: &str) -> String {
    if level.contains('?') {
        format!("{level}&{LISTEN_OPTION}")
    } else {
        format!("{level}?{LISTEN_OPTION}")
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TravelError {
    /// There is no local controlling client to move.
    NoLocalPlayer,
    InvalidAddress(String),
}

impl std::fmt::Display for TravelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoLocalPlayer => write!(f, "no local player controller"),
            Self::InvalidAddress(addr) => write!(f, "invalid travel address: \"{addr}\""),
        }
    }
}

impl std::error::Error for TravelError {}

// ── Tests ───────────────────────────────────────────────────────────────────
