//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ListenConfig, StoreConfig)
//! - [`policy`]: Engine policy (MatchingConfig, TrustConfig, ModerationConfig, RateLimitConfig, FilterConfig)
//! - [`validation`]: Startup checks returning every problem at once

mod defaults;
mod policy;
mod types;
pub mod validation;

pub use policy::{FilterConfig, MatchingConfig, ModerationConfig, RateLimitConfig, TrustConfig};
pub use types::{Config, ConfigError, ListenConfig, ServerConfig, StoreBackend, StoreConfig};
pub use validation::{ValidationError, validate};
