//! Store key layout.
//!
//! | Key | Shape |
//! |---|---|
//! | `user:{id}` | pointer to the user's session key |
//! | `session:{a}:{b}` | JSON session record |
//! | `queue:{pool}` | FIFO list of waiting user ids |
//! | `trust:{id}` | integer score |
//! | `reports:{id}` | reporter id -> report time (ms) |
//! | `banned:{id}` | ban reason |
//! | `rate:{id}` | attempt id -> attempt time (ms) |
//! | `active_users` | user id -> last seen (ms) |
//! | `cooldown:search:{id}` | presence flag |
//! | `claim:{id}` | `{pool} {claimant}` while a popped waiter is being paired |
//! | `profile:{id}` | JSON profile record |
//! | `premium:{id}` | presence flag, TTL = remaining premium time |
//! | `stats:{id}:total_chats` | integer counter |

use crate::state::UserId;

pub const ACTIVE_USERS: &str = "active_users";
pub const BANNED_PREFIX: &str = "banned:";
pub const CLAIM_PREFIX: &str = "claim:";
pub const PREMIUM_PREFIX: &str = "premium:";
pub const PROFILE_PREFIX: &str = "profile:";
pub const SESSION_PREFIX: &str = "session:";
pub const TRUST_PREFIX: &str = "trust:";

pub fn user(id: UserId) -> String {
    format!("user:{id}")
}

/// Session key; the lower id always comes first.
pub fn session(a: UserId, b: UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{SESSION_PREFIX}{lo}:{hi}")
}

pub fn queue(pool_name: &str) -> String {
    format!("queue:{pool_name}")
}

pub fn trust(id: UserId) -> String {
    format!("{TRUST_PREFIX}{id}")
}

pub fn reports(id: UserId) -> String {
    format!("reports:{id}")
}

pub fn banned(id: UserId) -> String {
    format!("{BANNED_PREFIX}{id}")
}

pub fn rate(id: UserId) -> String {
    format!("rate:{id}")
}

pub fn search_cooldown(id: UserId) -> String {
    format!("cooldown:search:{id}")
}

pub fn claim(id: UserId) -> String {
    format!("{CLAIM_PREFIX}{id}")
}

pub fn profile(id: UserId) -> String {
    format!("{PROFILE_PREFIX}{id}")
}

pub fn premium(id: UserId) -> String {
    format!("{PREMIUM_PREFIX}{id}")
}

pub fn total_chats(id: UserId) -> String {
    format!("stats:{id}:total_chats")
}

/// Parse the id out of a `{prefix}{id}` key.
pub fn id_after(key: &str, prefix: &str) -> Option<UserId> {
    key.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_order_independent() {
        assert_eq!(session(UserId(9), UserId(2)), "session:2:9");
        assert_eq!(session(UserId(2), UserId(9)), "session:2:9");
    }

    #[test]
    fn id_after_parses_suffix() {
        assert_eq!(id_after("banned:42", BANNED_PREFIX), Some(UserId(42)));
        assert_eq!(id_after("banned:x", BANNED_PREFIX), None);
        assert_eq!(id_after("trust:42", BANNED_PREFIX), None);
    }
}
