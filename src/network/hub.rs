//! State shared by every gateway connection.

use super::clients::ClientRegistry;
use super::notice::Notice;
use crate::engine::Engine;
use crate::state::{Language, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct Hub {
    pub engine: Arc<Engine>,
    pub clients: Arc<ClientRegistry>,
    admins: HashSet<UserId>,
}

impl Hub {
    pub fn new(engine: Arc<Engine>, clients: Arc<ClientRegistry>, admin_ids: &[i64]) -> Self {
        Self {
            engine,
            clients,
            admins: admin_ids.iter().copied().map(UserId).collect(),
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    /// The user's language, falling back to the default on store errors.
    pub async fn language(&self, user: UserId) -> Language {
        self.engine.language(user).await.unwrap_or_default()
    }

    /// Push a notice to another user. Returns whether it was queued.
    pub async fn notify(&self, user: UserId, notice: Notice) -> bool {
        let line = notice.render(self.language(user).await);
        match self.clients.send(user, line) {
            Ok(()) => true,
            Err(e) => {
                debug!(user = %user, error = %e, "Notice not delivered");
                false
            }
        }
    }

    pub async fn notify_admins(&self, notice: Notice) {
        for &admin in &self.admins {
            self.notify(admin, notice.clone()).await;
        }
    }
}
