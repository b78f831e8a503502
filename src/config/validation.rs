//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, StoreBackend};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("store.path parent directory does not exist: {0}")]
    StorePathInvalid(String),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("trust.initial must be within 0..=100, got {0}")]
    InitialTrustOutOfRange(i64),
    #[error("trust thresholds must satisfy 0 < low < normal < high <= 100, got low={low} normal={normal} high={high}")]
    TrustThresholdsOutOfOrder { low: i64, normal: i64, high: i64 },
    #[error("filter.dangerous_extensions entries must start with '.', got '{0}'")]
    InvalidExtension(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // Store
    if config.store.backend == StoreBackend::Redb {
        let path = Path::new(&config.store.path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::StorePathInvalid(config.store.path.clone()));
        }
    }
    if config.store.sweep_interval == 0 {
        errors.push(ValidationError::ZeroValue("store.sweep_interval"));
    }

    // Lifetimes and windows
    let positive = [
        ("matching.queue_ttl", config.matching.queue_ttl),
        ("matching.session_ttl", config.matching.session_ttl),
        ("moderation.report_window", config.moderation.report_window),
        ("rate_limits.window", config.rate_limits.window),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(name));
        }
    }
    if config.rate_limits.max_messages == 0 {
        errors.push(ValidationError::ZeroValue("rate_limits.max_messages"));
    }
    if config.moderation.auto_ban_reports == 0 {
        errors.push(ValidationError::ZeroValue("moderation.auto_ban_reports"));
    }

    // Trust
    let trust = &config.trust;
    if !(0..=100).contains(&trust.initial) {
        errors.push(ValidationError::InitialTrustOutOfRange(trust.initial));
    }
    if !(0 < trust.low && trust.low < trust.normal && trust.normal < trust.high && trust.high <= 100) {
        errors.push(ValidationError::TrustThresholdsOutOfOrder {
            low: trust.low,
            normal: trust.normal,
            high: trust.high,
        });
    }
    if trust.penalty_per_report <= 0 {
        errors.push(ValidationError::ZeroValue("trust.penalty_per_report"));
    }

    // Filter
    for ext in &config.filter.dangerous_extensions {
        if !ext.starts_with('.') {
            errors.push(ValidationError::InvalidExtension(ext.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
