//! Integration test common infrastructure.
//!
//! Provides an engine over a manual clock, recording couriers for relay
//! assertions, and an in-process line gateway with a test client.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;

use async_trait::async_trait;
use parking_lot::Mutex;
use shadowchat::clock::ManualClock;
use shadowchat::config::Config;
use shadowchat::engine::Engine;
use shadowchat::error::DeliveryError;
use shadowchat::relay::{Content, Courier};
use shadowchat::state::UserId;
use shadowchat::store::{MemoryStore, SharedStore};
use std::sync::Arc;

/// Smallest valid configuration, plus `extra` TOML appended.
#[allow(dead_code)]
pub fn config_with(extra: &str) -> Config {
    Config::from_toml(&format!(
        "[listen]\naddress = \"127.0.0.1:0\"\n\n[server]\nmetrics_port = 0\n{extra}"
    ))
    .expect("test config parses")
}

/// An engine over a fresh memory store and a manual clock.
#[allow(dead_code)]
pub struct TestEngine {
    pub clock: Arc<ManualClock>,
    pub store: SharedStore,
    pub engine: Arc<Engine>,
}

#[allow(dead_code)]
impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(&config_with(""))
    }

    pub fn with_config(config: &Config) -> Self {
        let clock = Arc::new(ManualClock::default());
        let store: SharedStore = Arc::new(MemoryStore::new(clock.clone()));
        let engine = Arc::new(Engine::new(store.clone(), clock.clone(), config));
        Self {
            clock,
            store,
            engine,
        }
    }

    /// Pair `a` and `b` through the general pool.
    pub async fn pair(&self, a: UserId, b: UserId) {
        self.engine.search(a, None).await.expect("first search");
        self.engine.search(b, None).await.expect("second search");
        assert_eq!(
            self.engine.sessions().partner_of(a).await.unwrap(),
            Some(b)
        );
    }
}

/// Courier that records every delivery.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingCourier {
    pub delivered: Mutex<Vec<(UserId, Content)>>,
    pub typing: Mutex<Vec<UserId>>,
}

#[async_trait]
impl Courier for RecordingCourier {
    async fn deliver(&self, to: UserId, content: &Content) -> Result<(), DeliveryError> {
        self.delivered.lock().push((to, content.clone()));
        Ok(())
    }

    async fn typing(&self, to: UserId) {
        self.typing.lock().push(to);
    }
}

/// Courier whose every delivery fails.
#[allow(dead_code)]
pub struct UnreachableCourier;

#[async_trait]
impl Courier for UnreachableCourier {
    async fn deliver(&self, to: UserId, _content: &Content) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unreachable(to))
    }
}
