//! shadowchat - anonymous one-on-one chat matching, session and trust engine.
//!
//! The [`engine::Engine`] pairs waiting users through named FIFO pools,
//! tracks who is talking to whom, relays messages between partners and keeps
//! a per-user trust score that escalates to isolation and bans. All state
//! lives behind the [`store::Store`] trait; the `shadowchatd` binary exposes
//! the engine over a line-based TCP gateway.

pub mod activity;
pub mod admin;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod matching;
pub mod metrics;
pub mod network;
pub mod relay;
pub mod security;
pub mod state;
pub mod store;
pub mod telemetry;
