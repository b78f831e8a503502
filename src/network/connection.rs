//! Connection - handles one line-gateway client.
//!
//! ```text
//! Phase 1: HELLO <user_id>      (anything else closes the connection)
//!    ↓
//! Phase 2: tokio::select! over
//!    ┌──────────────────────┐      ┌──────────────────────────┐
//!    │ inbound lines        │      │ outbound queue           │
//!    │  → Command::parse    │      │  (relays, notices from   │
//!    │  → commands::execute │      │   other connections)     │
//!    │  → replies to sink   │      │  → sink                  │
//!    └──────────────────────┘      └──────────────────────────┘
//! ```
//!
//! An over-long line is dropped with a notice and reading goes on.
//! Disconnecting does not end the user's chat; their partner finds out on
//! the next relay attempt.

use super::commands::{self, Command, ParseError};
use super::hub::Hub;
use super::notice::Notice;
use crate::metrics;
use crate::state::UserId;
use crate::telemetry::{CommandTimer, spans};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{Instrument, Span, debug, info, warn};

/// Longest accepted line, in bytes.
pub const MAX_LINE_LENGTH: usize = 4096;

/// A client connection handler.
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Hub>,
}

/// Parse the identification line.
fn parse_hello(line: &str) -> Option<UserId> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(verb), Some(id), None) if verb.eq_ignore_ascii_case("HELLO") => id.parse().ok(),
        _ => None,
    }
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>) -> Self {
        Self { stream, addr, hub }
    }

    /// Run the connection until the client leaves or is replaced.
    pub async fn run(self) -> anyhow::Result<()> {
        let span = spans::connection(self.addr);
        let Self { stream, hub, .. } = self;
        Self::serve(stream, hub).instrument(span).await
    }

    async fn serve(stream: TcpStream, hub: Arc<Hub>) -> anyhow::Result<()> {
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (mut sink, mut lines) = framed.split();

        let user = match lines.next().await {
            Some(Ok(line)) => match parse_hello(&line) {
                Some(user) => user,
                None => {
                    sink.send("ERROR expected HELLO <user_id>".to_string()).await?;
                    return Ok(());
                }
            },
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        };
        Span::current().record("user", tracing::field::display(user));

        let (conn_id, mut outbound) = hub.clients.register(user);
        metrics::client_connected();
        info!("Client identified");

        let welcome = Notice::Welcome.render(hub.language(user).await);
        let result = async {
            sink.send(welcome).await?;
            // Framed yields one `None` after a decode error, then reads on.
            let mut resuming = false;
            loop {
                tokio::select! {
                    inbound = lines.next() => match inbound {
                        Some(Ok(line)) => {
                            resuming = false;
                            for reply in handle_line(&hub, user, &line).await {
                                sink.send(reply).await?;
                            }
                        }
                        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                            warn!(max = MAX_LINE_LENGTH, "Input line too long");
                            resuming = true;
                            sink.send(Notice::LineTooLong.render(hub.language(user).await)).await?;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                        None if resuming => resuming = false,
                        None => break,
                    },
                    queued = outbound.recv() => match queued {
                        Some(line) => sink.send(line).await?,
                        None => {
                            debug!("Superseded by a newer connection");
                            break;
                        }
                    },
                }
            }
            anyhow::Ok(())
        }
        .await;

        hub.clients.unregister(user, conn_id);
        metrics::client_disconnected();
        info!("Client disconnected");
        result
    }
}

/// Parse and run one inbound line. Returns the rendered replies.
async fn handle_line(hub: &Hub, user: UserId, line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() {
        return vec![];
    }

    let notices = match Command::parse(line) {
        Ok(command) => {
            let name = command.name();
            let _timer = CommandTimer::new(name);
            commands::execute(hub, user, command)
                .instrument(spans::command(name, &user.to_string()))
                .await
        }
        Err(ParseError::Usage {
            admin_only: true, ..
        }) if !hub.is_admin(user) => vec![],
        Err(ParseError::Usage { usage, .. }) => vec![Notice::Usage(usage)],
        Err(ParseError::Unknown) => vec![Notice::UnknownCommand],
    };

    if notices.is_empty() {
        return vec![];
    }
    let lang = hub.language(user).await;
    notices.iter().map(|n| n.render(lang)).collect()
}
