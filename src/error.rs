//! Unified error handling for shadowchat.
//!
//! Three layers:
//!
//! - [`Rejection`]: a policy said no. Non-fatal, nothing was mutated, the
//!   transport turns it into a notice for the user.
//! - [`StoreError`]: the backing store failed. Fatal for the operation and
//!   never retried here.
//! - [`DeliveryError`]: the transport could not reach a user.
//!
//! [`EngineError`] is what every public engine operation returns.

use crate::state::UserId;
use crate::store::StoreError;
use thiserror::Error;

// ============================================================================
// Policy rejections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("user is banned")]
    Blocked,

    #[error("sending too fast")]
    RateLimited,

    #[error("already in a chat")]
    AlreadyInChat,

    #[error("already searching")]
    AlreadySearching,

    #[error("search cooldown active")]
    CooldownActive,

    #[error("gender filter requires premium")]
    PremiumOnly,

    #[error("invalid gender filter: {0}")]
    InvalidGenderFilter(String),

    #[error("set your own gender before filtering by gender")]
    GenderRequired,

    #[error("not in a chat")]
    NotInChat,

    #[error("dangerous file type: {0}")]
    DangerousFile(String),

    #[error("no valid interest given")]
    InvalidInterest,

    #[error("too many interests")]
    TooManyInterests,

    #[error("unsupported language: {0}")]
    InvalidLanguage(String),

    #[error("invalid gender: {0}")]
    InvalidGender(String),
}

impl Rejection {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::RateLimited => "rate_limited",
            Self::AlreadyInChat => "already_in_chat",
            Self::AlreadySearching => "already_searching",
            Self::CooldownActive => "cooldown_active",
            Self::PremiumOnly => "premium_only",
            Self::InvalidGenderFilter(_) => "invalid_gender_filter",
            Self::GenderRequired => "gender_required",
            Self::NotInChat => "not_in_chat",
            Self::DangerousFile(_) => "dangerous_file",
            Self::InvalidInterest => "invalid_interest",
            Self::TooManyInterests => "too_many_interests",
            Self::InvalidLanguage(_) => "invalid_language",
            Self::InvalidGender(_) => "invalid_gender",
        }
    }
}

// ============================================================================
// Engine errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl EngineError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(r) => r.error_code(),
            Self::Store(_) => "store_error",
            Self::Corrupt { .. } => "corrupt_record",
        }
    }

    /// The rejection, if this error is a policy rejection.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn corrupt(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// Delivery errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The user has no live connection (blocked the bot, disconnected).
    #[error("user {0} is unreachable")]
    Unreachable(UserId),

    #[error("send channel closed for user {0}")]
    ChannelClosed(UserId),
}
