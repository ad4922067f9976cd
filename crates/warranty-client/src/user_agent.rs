//! Browser identification strings for outbound requests.

use rand::Rng;

/// Desktop browser user agents the service sees regular traffic from.
const DEFAULT_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.2; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Supplies a plausible user agent per request.
///
/// The pool is never empty.
#[derive(Debug, Clone)]
pub struct UserAgentProvider {
    agents: Vec<String>,
}

impl UserAgentProvider {
    /// Rotate through the built-in desktop browser pool.
    #[must_use]
    pub fn rotating() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Always send the same user agent.
    #[must_use]
    pub fn fixed(agent: impl Into<String>) -> Self {
        Self {
            agents: vec![agent.into()],
        }
    }

    /// Build from an optional configured override; blank overrides fall back
    /// to the rotating pool.
    #[must_use]
    pub fn from_override(agent: Option<&str>) -> Self {
        match agent.map(str::trim) {
            Some(agent) if !agent.is_empty() => Self::fixed(agent),
            _ => Self::rotating(),
        }
    }

    /// Pick a user agent for the next request.
    #[must_use]
    pub fn pick(&self) -> &str {
        let idx = rand::thread_rng().gen_range(0..self.agents.len());
        &self.agents[idx]
    }

    /// All user agents this provider may return.
    #[must_use]
    pub fn pool(&self) -> &[String] {
        &self.agents
    }
}

impl Default for UserAgentProvider {
    fn default() -> Self {
        Self::rotating()
    }
}
