use log::Level;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

// ── Constants ───────────────────────────────────────────────────────────────

/// How long a message stays on screen.
const DISPLAY_DURATION: Duration = Duration::from_secs(15);

/// Oldest messages are dropped beyond this many.
const MAX_MESSAGES: usize = 32;

// ── On-screen messages ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnScreenMessage {
    pub level: Level,
    pub text: String,
    pub shown_at: Instant,
}

/// Short-lived diagnostics for an overlay. Fed by the logger for records
/// with the `screen` target.
#[derive(Debug)]
pub struct OnScreenMessages {
    messages: Mutex<VecDeque<OnScreenMessage>>,
    lifetime: Duration,
    capacity: usize,
}

impl Default for OnScreenMessages {
    fn default() -> Self {
        Self::with_limits(DISPLAY_DURATION, MAX_MESSAGES)
    }
}

impl OnScreenMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(lifetime: Duration, capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            lifetime,
            capacity,
        }
    }

    pub fn push(&self, level: Level, text: impl Into<String>) {
        self.push_at(level, text, Instant::now());
    }

    fn push_at(&self, level: Level, text: impl Into<String>, now: Instant) {
        let mut messages = self.messages.lock();
        messages.push_back(OnScreenMessage {
            level,
            text: text.into(),
            shown_at: now,
        });
        while messages.len() > self.capacity {
            messages.pop_front();
        }
    }

    /// Messages still on screen, oldest first.
    pub fn visible(&self) -> Vec<OnScreenMessage> {
        self.visible_at(Instant::now())
    }

    fn visible_at(&self, now: Instant) -> Vec<OnScreenMessage> {
        let mut messages = self.messages.lock();
        messages.retain(|m| now.saturating_duration_since(m.shown_at) < self.lifetime);
        messages.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_expire() {
        let screen = OnScreenMessages::new();
        let start = Instant::now();

        screen.push_at(Level::Info, "Creating server", start);
        screen.push_at(Level::Warn, "Server name cannot be empty", start + Duration::from_secs(10));

        let texts = |v: Vec<OnScreenMessage>| v.into_iter().map(|m| m.text).collect::<Vec<_>>();

        assert_eq!(
            texts(screen.visible_at(start + Duration::from_secs(5))),
            vec!["Creating server", "Server name cannot be empty"]
        );
        assert_eq!(
            texts(screen.visible_at(start + Duration::from_secs(16))),
            vec!["Server name cannot be empty"]
        );
        assert!(screen.visible_at(start + Duration::from_secs(30)).is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let screen = OnScreenMessages::with_limits(Duration::from_secs(60), 3);
        for i in 0..5 {
            screen.push(Level::Info, format!("msg {i}"));
        }

        let visible = screen.visible();
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[0].text, "msg 2");
        assert_eq!(visible[2].text, "msg 4");
    }

    #[test]
    fn test_clear() {
        let screen = OnScreenMessages::new();
        screen.push(Level::Info, "hello");
        screen.clear();
        assert!(screen.visible().is_empty());
    }
}
