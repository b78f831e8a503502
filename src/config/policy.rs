//! Engine policy configuration: matching, trust, moderation, rate limits and
//! the content filter.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::*;

/// Pool and session lifetimes, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Idle TTL re-armed on a pool every time someone joins it (default: 300).
    #[serde(default = "default_queue_ttl")]
    pub queue_ttl: u64,
    /// Minimum gap between two search attempts by one user (default: 3).
    #[serde(default = "default_search_cooldown")]
    pub search_cooldown: u64,
    /// Hard TTL on session records (default: 7 days).
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            queue_ttl: default_queue_ttl(),
            search_cooldown: default_search_cooldown(),
            session_ttl: default_session_ttl(),
        }
    }
}

impl MatchingConfig {
    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl)
    }

    pub fn search_cooldown(&self) -> Duration {
        Duration::from_secs(self.search_cooldown)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }
}

/// Trust score configuration.
///
/// Scores live in `[0, 100]`. Levels: `high` at or above `high`, `normal` at
/// or above `normal`, `low` at or above `low`, `hell` below that.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustConfig {
    #[serde(default = "default_initial_trust")]
    pub initial: i64,
    #[serde(default = "default_high_threshold")]
    pub high: i64,
    #[serde(default = "default_normal_threshold")]
    pub normal: i64,
    #[serde(default = "default_low_threshold")]
    pub low: i64,
    /// Points removed per distinct reporter (default: 10).
    #[serde(default = "default_penalty_per_report")]
    pub penalty_per_report: i64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_trust(),
            high: default_high_threshold(),
            normal: default_normal_threshold(),
            low: default_low_threshold(),
            penalty_per_report: default_penalty_per_report(),
        }
    }
}

/// Report handling and ban escalation.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Distinct in-window reporters that ban a `hell`-level user (default: 3).
    #[serde(default = "default_auto_ban_reports")]
    pub auto_ban_reports: usize,
    /// Seconds a report stays counted (default: 24h).
    #[serde(default = "default_report_window")]
    pub report_window: u64,
    /// Restore the initial trust score on unban (default: false, trust is
    /// kept as it was).
    #[serde(default)]
    pub reset_trust_on_unban: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            auto_ban_reports: default_auto_ban_reports(),
            report_window: default_report_window(),
            reset_trust_on_unban: false,
        }
    }
}

impl ModerationConfig {
    pub fn report_window(&self) -> Duration {
        Duration::from_secs(self.report_window)
    }
}

/// Sliding-window send limit.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds (default: 5).
    #[serde(default = "default_rate_window")]
    pub window: u64,
    /// Messages allowed per window (default: 3).
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: default_rate_window(),
            max_messages: default_max_messages(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window)
    }
}

/// Content filter word lists.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Normalized words masked in relayed text.
    #[serde(default = "default_bad_words")]
    pub bad_words: Vec<String>,
    /// Extensions (with leading dot) refused for documents.
    #[serde(default = "default_dangerous_extensions")]
    pub dangerous_extensions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bad_words: default_bad_words(),
            dangerous_extensions: default_dangerous_extensions(),
        }
    }
}
