//! Shared stubs for integration tests.
//!
//! Each file under `tests/` is its own crate, so helpers used by only one of
//! them would otherwise warn as dead code.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use barrage::{
    ApiRequest, HttpClient, HttpMethod, TestScenario, VirtualUserExecutor,
    client::TransportError,
};

/// What a [`StubClient`] answers to every call.
#[derive(Clone)]
pub enum Reply {
    Status(u16),
    Fail(TransportError),
}

/// In-process [`HttpClient`] that never touches the network.
pub struct StubClient {
    reply: Reply,
    latency: Duration,
    calls: AtomicUsize,
}

impl StubClient {
    pub fn status(code: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Status(code),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Fail(TransportError::Connect("connection refused".to_string())),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(code: u16, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Status(code),
            latency,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn send(
        &self,
        _method: HttpMethod,
        _url: &str,
        _headers: &HashMap<String, String>,
        _body: Option<&serde_json::Value>,
    ) -> Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.reply {
            Reply::Status(code) => Ok(*code),
            Reply::Fail(e) => Err(e.clone()),
        }
    }
}

pub fn executor(client: Arc<StubClient>) -> VirtualUserExecutor {
    VirtualUserExecutor::builder().client(client).build()
}

pub fn scenario(
    users: usize,
    duration_seconds: u64,
    max_requests: usize,
    requests: Vec<ApiRequest>,
) -> TestScenario {
    TestScenario {
        concurrent_users: users,
        duration_seconds,
        requests,
        max_requests,
    }
}

pub fn get(url: &str) -> ApiRequest {
    ApiRequest::new("GET", url)
}
