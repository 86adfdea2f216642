// In-memory shared document for exercising the remote adapter

use super::transport::{Document, DocumentTransport};
use async_trait::async_trait;
use eyre::{Result, eyre};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct MemoryTransport {
    document: Mutex<Document>,
    latency: Duration,
    fail_fetch: AtomicBool,
    fail_store: AtomicBool,
    stores: AtomicUsize,
}

impl MemoryTransport {
    pub(crate) fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(document.as_object().cloned().unwrap_or_default()),
            latency: Duration::ZERO,
            fail_fetch: AtomicBool::new(false),
            fail_store: AtomicBool::new(false),
            stores: AtomicUsize::new(0),
        }
    }

    /// Delay every fetch and store, widening the read-modify-write window
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn document(&self) -> Value {
        Value::Object(self.document.lock().clone())
    }

    pub(crate) fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl DocumentTransport for MemoryTransport {
    async fn fetch(&self) -> Result<Document> {
        self.wait().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(eyre!("simulated fetch failure"));
        }
        Ok(self.document.lock().clone())
    }

    async fn store(&self, document: &Document) -> Result<()> {
        self.wait().await;
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(eyre!("simulated store failure"));
        }
        *self.document.lock() = document.clone();
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
