//! Security module for shadowchat.
//!
//! Provides the abuse controls that gate matching and relay:
//! - **Rate Limiting**: sliding-window send limit per user
//! - **Trust**: clamped per-user trust score and its derived level
//! - **Moderation**: deduplicated reports, auto-ban escalation, ban records
//! - **Filter**: bad-word masking and dangerous file detection
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Security Module                        │
//! ├──────────────┬──────────────┬────────────────┬───────────────┤
//! │ RateLimiter  │ TrustLedger  │ Moderation     │ ContentFilter │
//! │ rate:{id}    │ trust:{id}   │ reports:{id}   │ static lists  │
//! │ scored set   │ clamped int  │ banned:{id}    │ NFD + leet    │
//! └──────────────┴──────────────┴────────────────┴───────────────┘
//! ```

pub mod filter;
pub mod moderation;
pub mod rate_limit;
pub mod trust;

// Re-export primary types for convenience
pub use filter::ContentFilter;
pub use moderation::{ModerationEngine, ReportOutcome};
pub use rate_limit::RateLimiter;
pub use trust::{TrustLedger, TrustLevel};
