use std::{convert::Infallible, path::Path};

use axum::{
    Json,
    extract::{Multipart, State, multipart::Field, rejection::JsonRejection},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio::{fs::File, io::AsyncWriteExt};

use super::{AppState, error::ApiError};
use crate::{
    Executor, Reporter,
    metric::TestResult,
    report::Summary,
    scenario::TestScenario,
};

pub async fn health() -> &'static str {
    "ok"
}

async fn execute(
    state: &AppState,
    payload: Result<Json<TestScenario>, JsonRejection>,
) -> Result<Vec<TestResult>, ApiError> {
    let Json(scenario) = payload?;
    scenario.validate()?;
    tracing::info!(
        users = scenario.concurrent_users,
        duration_seconds = scenario.duration_seconds,
        max_requests = scenario.max_requests,
        requests = scenario.requests.len(),
        "Received scenario"
    );

    Ok(state.executor.exec(&scenario).await?)
}

pub async fn run_test(
    State(state): State<AppState>,
    payload: Result<Json<TestScenario>, JsonRejection>,
) -> Result<Json<Vec<TestResult>>, ApiError> {
    let results = execute(&state, payload).await?;
    Ok(Json(results))
}

pub async fn summary(
    State(state): State<AppState>,
    payload: Result<Json<TestScenario>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    let results = execute(&state, payload).await?;
    Ok(Json(Summary::from_results(&results)))
}

pub async fn report(
    State(state): State<AppState>,
    payload: Result<Json<TestScenario>, JsonRejection>,
) -> Result<Json<Summary>, ApiError> {
    let results = execute(&state, payload).await?;
    let summary = Summary::from_results(&results);
    // The summary is already computed; a reporter failure must not lose it.
    if let Err(e) = state.reporter.report(&summary).await {
        tracing::warn!("Reporter failed: {e}");
    }
    Ok(Json(summary))
}

/// Streams progress lines until the client disconnects or the server stops.
///
/// Dropping the stream drops the subscription, which unregisters it.
pub async fn progress_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.progress.subscribe();
    tracing::debug!("Progress stream {} opened", subscription.id());

    let events = subscription.map(|line| {
        // One event per line; SSE framing cannot carry raw line breaks.
        let line = line.replace(['\r', '\n'], " ");
        Ok(Event::default().data(line))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .and_then(sanitize_file_name)
            .ok_or(ApiError::MissingFile)?;

        tokio::fs::create_dir_all(state.upload_dir.as_path()).await?;
        let path = state.upload_dir.join(file_name);
        let written = match store_field(field, &path).await {
            Ok(written) => written,
            Err(e) => {
                // Never leave a truncated file behind.
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(
                        path = %path.display(),
                        "Failed to remove partial upload: {cleanup}"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!("Stored upload at {} ({written} bytes)", path.display());
        return Ok(format!("file saved at: {}\n", path.display()));
    }
    Err(ApiError::MissingFile)
}

/// Streams a multipart field to `path` chunk by chunk and returns the byte count.
async fn store_field(mut field: Field<'_>, path: &Path) -> Result<u64, ApiError> {
    let mut file = File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Keeps only the final path component, so uploads cannot escape the directory.
fn sanitize_file_name(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("scenario.json", Some("scenario.json"))]
    #[case("../../etc/passwd", Some("passwd"))]
    #[case("/abs/path/data.csv", Some("data.csv"))]
    #[case("..", None)]
    #[case("", None)]
    fn file_names_are_reduced_to_their_last_component(
        #[case] raw: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(sanitize_file_name(raw).as_deref(), expected);
    }
}
