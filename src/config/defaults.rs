//! Default value functions for configuration.

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "shadowchat".to_string()
}

// =============================================================================
// Store Defaults
// =============================================================================

pub fn default_store_path() -> String {
    "shadowchat.redb".to_string()
}

pub fn default_sweep_interval() -> u64 {
    60
}

// =============================================================================
// Matching Defaults
// =============================================================================

pub fn default_queue_ttl() -> u64 {
    300
}

pub fn default_search_cooldown() -> u64 {
    3
}

/// Seven days.
pub fn default_session_ttl() -> u64 {
    604_800
}

// =============================================================================
// Trust Defaults
// =============================================================================

pub fn default_initial_trust() -> i64 {
    50
}

pub fn default_high_threshold() -> i64 {
    70
}

pub fn default_normal_threshold() -> i64 {
    40
}

pub fn default_low_threshold() -> i64 {
    20
}

pub fn default_penalty_per_report() -> i64 {
    10
}

// =============================================================================
// Moderation Defaults
// =============================================================================

pub fn default_auto_ban_reports() -> usize {
    3
}

/// 24 hours.
pub fn default_report_window() -> u64 {
    86_400
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub fn default_rate_window() -> u64 {
    5
}

pub fn default_max_messages() -> usize {
    3
}

// =============================================================================
// Filter Defaults
// =============================================================================

pub fn default_bad_words() -> Vec<String> {
    [
        "anjing", "bangsat", "kontol", "memek", "babi", "tolol", "goblok", "setan", "kampret",
        "ngentot", "coli", "seks",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_dangerous_extensions() -> Vec<String> {
    [".exe", ".bat", ".sh", ".cmd", ".msi", ".jar"]
        .into_iter()
        .map(String::from)
        .collect()
}
