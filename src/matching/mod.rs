//! Waiting pools and the pairing algorithm.

mod matcher;
mod pools;

pub use matcher::{Eligibility, Matcher, Route, SearchOutcome, route};
pub use pools::{Claim, Pool, QueuePools};
