//! Heuristic detection of automated user agents.
//!
//! The check is a plain case-insensitive substring match against a list of
//! markers. It misses plenty of crawlers and flags the odd browser whose
//! identification string happens to contain a marker; nothing more reliable
//! is observable from the client side, so the result is reported as a hint.

/// Markers matched when no explicit list is configured.
pub const DEFAULT_BOT_MARKERS: &[&str] =
    &["bot", "googlebot", "crawler", "spider", "robot", "crawling"];

/// Substring heuristic flagging user agents that look automated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotHeuristic {
    markers: Vec<String>,
}

impl BotHeuristic {
    /// Build a heuristic from arbitrary markers.
    ///
    /// Markers are lowercased and trimmed; blank entries are dropped. An empty
    /// list yields a heuristic that never flags anything.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = markers
            .into_iter()
            .filter_map(|marker| {
                let trimmed = marker.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
            })
            .collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Returns `true` when `agent` contains any marker, ignoring case.
    pub fn is_bot(&self, agent: &str) -> bool {
        let agent = agent.to_lowercase();
        self.markers
            .iter()
            .any(|marker| agent.contains(marker.as_str()))
    }
}

impl Default for BotHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_MARKERS)
    }
}
