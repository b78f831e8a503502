//! In-process line gateway for integration testing.

use super::TestEngine;
use shadowchat::engine::Engine;
use shadowchat::network::{ClientRegistry, Gateway, Hub};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A gateway bound to an ephemeral port, served on a background task.
pub struct TestServer {
    addr: SocketAddr,
    pub engine: Arc<Engine>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a gateway over `harness`'s engine with the given admins.
    pub async fn spawn(harness: &TestEngine, admin_ids: &[i64]) -> anyhow::Result<Self> {
        let hub = Arc::new(Hub::new(
            harness.engine.clone(),
            Arc::new(ClientRegistry::new()),
            admin_ids,
        ));
        let gateway = Gateway::bind(SocketAddr::from(([127, 0, 0, 1], 0)), hub).await?;
        let addr = gateway.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = gateway.run().await;
        });
        Ok(Self {
            addr,
            engine: harness.engine.clone(),
            task,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
