//! HTTP routing layer.
//!
//! | Route | |
//! |---|---|
//! | `POST /run-test` | run a scenario, respond with every [`crate::TestResult`] |
//! | `POST /summary` | run a scenario, respond with its [`crate::Summary`] |
//! | `POST /report` | like `/summary`, and also hand the summary to the reporter |
//! | `GET /progress` | server-sent events, one per progress line |
//! | `POST /upload` | stream the multipart field `file` into the upload directory |
//! | `GET /health` | liveness |

pub mod error;
pub mod handlers;

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    client::HttpClient, executor::VirtualUserExecutor, progress::ProgressBroadcaster,
    report::ProgressReporter,
};

pub use error::ApiError;

/// Upload body cap used unless configured otherwise (1 GiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 1 << 30;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub executor: VirtualUserExecutor,
    pub progress: ProgressBroadcaster,
    pub reporter: ProgressReporter,
    pub upload_dir: Arc<PathBuf>,
    /// Largest accepted `/upload` request body in bytes; `0` means unlimited.
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn new(
        client: Arc<dyn HttpClient>,
        progress: ProgressBroadcaster,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        let executor = VirtualUserExecutor::builder()
            .client(client)
            .progress(progress.clone())
            .build();

        Self {
            executor,
            reporter: ProgressReporter::new(progress.clone()),
            progress,
            upload_dir: Arc::new(upload_dir.into()),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    pub fn with_upload_max_bytes(mut self, upload_max_bytes: usize) -> Self {
        self.upload_max_bytes = upload_max_bytes;
        self
    }
}

pub fn router(state: AppState) -> Router {
    // Replaces axum's 2 MiB default, which applies to every extractor.
    let upload_limit = match state.upload_max_bytes {
        0 => DefaultBodyLimit::disable(),
        max => DefaultBodyLimit::max(max),
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/run-test", post(handlers::run_test))
        .route("/summary", post(handlers::summary))
        .route("/report", post(handlers::report))
        .route("/progress", get(handlers::progress_stream))
        .route("/upload", post(handlers::upload).layer(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
