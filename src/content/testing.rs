//! Recording transport for tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use super::client::{ApiRequest, ContentClient, ContentError, ProviderSpec, Transport};
use crate::cache::CacheManager;

type Responder = Box<dyn Fn(&ApiRequest) -> Result<Value, ContentError> + Send + Sync>;

/// Answers every request through a closure and remembers what was asked
pub struct FakeTransport {
    responder: Responder,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<Value, ContentError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the same body
    pub fn json(body: Value) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    /// Always fails with the same error
    pub fn failing(error: ContentError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, ContentError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(request.clone());
        (self.responder)(request)
    }
}

/// Builds a client for `spec` over `transport`, caching under a fresh temp dir
pub fn client_for(spec: ProviderSpec, transport: &Arc<FakeTransport>) -> (ContentClient, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache = CacheManager::for_provider(temp_dir.path(), spec.id);
    let transport: Arc<dyn Transport> = transport.clone();
    (ContentClient::new(spec, transport, cache), temp_dir)
}
