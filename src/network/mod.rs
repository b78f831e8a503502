//! Network module.
//!
//! The line gateway: TCP listener, per-client connection tasks, the command
//! set, and the connected-client registry that delivers relayed content.

mod clients;
mod commands;
mod connection;
mod gateway;
mod hub;
mod notice;

pub use clients::{ClientRegistry, render_content};
pub use commands::{Command, ParseError};
pub use connection::Connection;
pub use gateway::Gateway;
pub use hub::Hub;
pub use notice::Notice;
