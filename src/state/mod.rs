//! Per-user state kept in the store.
//!
//! Contains the user identity type, the typed profile record and the
//! symmetric session registry.

mod profile;
mod session;

pub use profile::{
    Gender, Interest, Language, MAX_INTERESTS, ProfileDirectory, ProfileRecord, UserStats,
};
pub use session::{SessionRecord, SessionRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Opaque transport-assigned user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(UserId)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
