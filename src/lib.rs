//! barrage: a minimal HTTP load-testing engine.
//!
//! Describe a [`TestScenario`] (a list of requests, a number of concurrent
//! virtual users, and a duration and/or a per-user request cap) and hand it to
//! an [`Executor`]. Every virtual user replays the request list against the
//! target, each attempt becomes a [`TestResult`], and the full list comes back
//! once every user is done. A [`Summary`] reduces that list to totals, averages
//! and a status-code histogram.
//!
//! # Architecture
//!
//! - [`TestScenario`]: immutable description of a run.
//! - [`Executor`]: runs a scenario. [`VirtualUserExecutor`] spawns one task per
//!   virtual user and collects their results through a bounded channel.
//! - [`HttpClient`]: the transport seam. [`client::ReqwestClient`] is the real
//!   one; tests plug in stubs.
//! - [`Metric`]: one observation. [`TestResult`] is the metric for one request.
//! - [`Aggregate`]: mergeable counters built from metrics.
//! - [`Report`]: statistics derived from an aggregate, e.g. [`Summary`].
//! - [`Reporter`]: sends a report somewhere.
//! - [`ProgressBroadcaster`]: best-effort fan-out of live progress lines.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use barrage::{
//!     ApiRequest, Executor, Summary, TestScenario, VirtualUserExecutor,
//!     client::{DEFAULT_TIMEOUT, ReqwestClient},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = VirtualUserExecutor::builder()
//!         .client(Arc::new(ReqwestClient::new(DEFAULT_TIMEOUT)?))
//!         .build();
//!
//!     let scenario = TestScenario {
//!         concurrent_users: 10,
//!         duration_seconds: 5,
//!         requests: vec![ApiRequest::new("GET", "http://localhost:3000/health")],
//!         max_requests: 0,
//!     };
//!     scenario.validate()?;
//!
//!     let results = executor.exec(&scenario).await?;
//!     println!("{:#?}", Summary::from_results(&results));
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! - `server` (default): the `axum` service layer and the `barrage` binary.
//! - `internals`: exposes the virtual user loop and result collector.

extern crate self as barrage;

/// Metric aggregators
pub mod aggregate;
/// HTTP transport seam
pub mod client;
#[cfg(feature = "server")]
/// Service configuration
pub mod config;
/// Error types
pub mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// Single metrics
pub mod metric;
/// Live progress fan-out
pub mod progress;
/// Reports and Reporters
pub mod report;
/// Scenario description and validation
pub mod scenario;
#[cfg(feature = "server")]
/// HTTP routing layer
pub mod server;

pub use aggregate::Aggregate;
pub use client::HttpClient;
pub use error::{ExecutionError, ScenarioError};
pub use executor::{Executor, VirtualUserExecutor};
pub use metric::{Metric, TestResult};
pub use progress::{ProgressBroadcaster, Subscription};
pub use report::{Report, Reporter, Summary};
pub use scenario::{ApiRequest, HttpMethod, TestScenario};

/// Procedural macros to reduce boilerplate
pub mod macros {
    pub use barrage_macros::*;
}
