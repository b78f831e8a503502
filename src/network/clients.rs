//! Connected client registry.
//!
//! Maps each identified user to the outbound queue of their connection. A
//! second `HELLO` for the same id replaces the first connection; the old
//! queue is dropped, which ends the old connection's loop.

use crate::error::DeliveryError;
use crate::relay::{Content, Courier};
use crate::state::UserId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Outbound queue depth per connection.
pub const SEND_QUEUE: usize = 256;

struct ClientHandle {
    conn_id: u64,
    tx: mpsc::Sender<String>,
}

#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<UserId, ClientHandle>,
    next_conn_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection for `user`. Returns its id and outbound queue.
    pub fn register(&self, user: UserId) -> (u64, mpsc::Receiver<String>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SEND_QUEUE);
        if self
            .clients
            .insert(user, ClientHandle { conn_id, tx })
            .is_some()
        {
            debug!(user = %user, "Replaced existing connection");
        }
        (conn_id, rx)
    }

    /// Detach `user` if `conn_id` is still their current connection.
    pub fn unregister(&self, user: UserId, conn_id: u64) {
        self.clients
            .remove_if(&user, |_, handle| handle.conn_id == conn_id);
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.clients.contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue one line for `user`. A full queue counts as unreachable.
    pub fn send(&self, user: UserId, line: String) -> Result<(), DeliveryError> {
        let tx = match self.clients.get(&user) {
            Some(handle) => handle.tx.clone(),
            None => return Err(DeliveryError::Unreachable(user)),
        };
        match tx.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(user = %user, "Send queue full");
                Err(DeliveryError::Unreachable(user))
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::ChannelClosed(user)),
        }
    }
}

/// Wire form of relayed content.
pub fn render_content(content: &Content) -> String {
    fn with_caption(head: String, caption: &Option<String>) -> String {
        match caption {
            Some(caption) => format!("{head} {caption}"),
            None => head,
        }
    }

    match content {
        Content::Text(text) => format!("MSG {text}"),
        Content::Photo { file_id, caption } => with_caption(format!("PHOTO {file_id}"), caption),
        Content::Voice { file_id } => format!("VOICE {file_id}"),
        Content::Sticker { file_id } => format!("STICKER {file_id}"),
        Content::Document {
            file_id,
            file_name,
            caption,
        } => with_caption(format!("DOCUMENT {file_id} {file_name}"), caption),
    }
}

#[async_trait]
impl Courier for ClientRegistry {
    async fn deliver(&self, to: UserId, content: &Content) -> Result<(), DeliveryError> {
        self.send(to, render_content(content))
    }

    async fn typing(&self, to: UserId) {
        let _ = self.send(to, "TYPING".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn newer_connection_replaces_older() {
        let clients = ClientRegistry::new();
        let (first, mut first_rx) = clients.register(UserId(1));
        let (second, mut second_rx) = clients.register(UserId(1));
        assert_ne!(first, second);

        assert!(first_rx.recv().await.is_none());

        clients.unregister(UserId(1), first);
        assert!(clients.is_connected(UserId(1)));

        clients.send(UserId(1), "hi".into()).unwrap();
        assert_eq!(second_rx.recv().await.as_deref(), Some("hi"));

        clients.unregister(UserId(1), second);
        assert_eq!(
            clients.send(UserId(1), "hi".into()),
            Err(DeliveryError::Unreachable(UserId(1)))
        );
    }

    #[tokio::test]
    async fn dropped_receiver_is_reported_closed() {
        let clients = ClientRegistry::new();
        let (_id, rx) = clients.register(UserId(2));
        drop(rx);
        assert_eq!(
            clients
                .deliver(UserId(2), &Content::Text("x".into()))
                .await,
            Err(DeliveryError::ChannelClosed(UserId(2)))
        );
    }

    #[test]
    fn content_wire_format() {
        assert_eq!(
            render_content(&Content::Document {
                file_id: "f1".into(),
                file_name: "notes.pdf".into(),
                caption: Some("read".into()),
            }),
            "DOCUMENT f1 notes.pdf read"
        );
        assert_eq!(
            render_content(&Content::Photo {
                file_id: "p".into(),
                caption: None,
            }),
            "PHOTO p"
        );
    }
}
