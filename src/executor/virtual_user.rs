use futures::future::join_all;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{
    client::HttpClient,
    error::ExecutionError,
    metric::TestResult,
    progress::ProgressBroadcaster,
    scenario::{ApiRequest, TestScenario},
};
use internals::*;

use std::{sync::Arc, time::Duration};

/// Pause between two passes over the request list.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(10);

/// Results that may sit in the channel before producers have to wait.
pub const DEFAULT_BUFFER: usize = 1024;

/// Executor that runs one task per virtual user.
///
/// - Each user replays the scenario's requests in order until its time budget
///   elapses or it reaches the scenario's per-user `max_requests`.
/// - Results go through a bounded channel drained by a single collector task.
/// - Lifecycle and per-request lines are published to `progress`, if set.
///
/// # Tuning Knobs
///
/// - `pause`: sleep after each pass. Bounds the tightest loop a user can run
///   against an instant endpoint.
/// - `buffer`: capacity of the result channel. A larger buffer lets users run
///   ahead of the collector; a smaller one applies backpressure sooner.
#[derive(Clone, TypedBuilder)]
pub struct VirtualUserExecutor {
    /// Transport used by every virtual user.
    pub client: Arc<dyn HttpClient>,
    /// Where progress lines go. Without one, progress is only traced.
    #[builder(default, setter(strip_option))]
    pub progress: Option<ProgressBroadcaster>,
    #[builder(default = DEFAULT_PAUSE)]
    pub pause: Duration,
    #[builder(default = DEFAULT_BUFFER)]
    pub buffer: usize,
}

impl Executor for VirtualUserExecutor {
    type Error = ExecutionError;

    async fn exec(&self, scenario: &TestScenario) -> Result<Vec<TestResult>, Self::Error> {
        let users = scenario.concurrent_users;
        let started = format!(
            "Starting scenario with {users} concurrent users for {}s (max {} requests per user)...",
            scenario.duration_seconds, scenario.max_requests
        );
        tracing::info!("{started}");
        announce(self.progress.as_ref(), started);

        let buffer = self.buffer.max(1);
        let (results_tx, results_rx) = mpsc::channel(buffer);
        let collector = tokio::spawn(collector_task(results_rx, buffer));

        let ctx = UserContext {
            client: Arc::clone(&self.client),
            progress: self.progress.clone(),
            requests: scenario.requests.clone().into(),
            budget: scenario.time_budget(),
            cap: scenario.max_requests,
            pause: self.pause,
            sink: results_tx,
        };

        tracing::info!("Spawning {users} virtual users...");
        // `ctx` owns the last spare sender; it is gone once the users hold theirs.
        let handles = spawn_users(ctx, users);

        for (i, res) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = res {
                tracing::error!("Virtual user #{} panicked: {e}", i + 1);
            }
        }

        tracing::info!("Collecting results...");
        let results = collector.await?;

        let finished = format!("Scenario finished: {} requests recorded", results.len());
        tracing::info!("{finished}");
        announce(self.progress.as_ref(), finished);
        Ok(results)
    }
}

fn announce(progress: Option<&ProgressBroadcaster>, message: String) {
    if let Some(progress) = progress {
        progress.publish(message);
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Building blocks of the [`VirtualUserExecutor`].
mod internals {
    use super::*;

    /// Everything a virtual user needs, shared by clone.
    #[derive(Clone)]
    pub struct UserContext {
        pub client: Arc<dyn HttpClient>,
        pub progress: Option<ProgressBroadcaster>,
        pub requests: Arc<[ApiRequest]>,
        /// `None` when the request cap is the only bound.
        pub budget: Option<Duration>,
        /// Requests per user; `0` means no cap.
        pub cap: usize,
        pub pause: Duration,
        pub sink: mpsc::Sender<TestResult>,
    }

    /// Spawns `users` tasks numbered `1..=users`.
    ///
    /// Consumes `ctx`, so the caller keeps no sender alive.
    pub fn spawn_users(ctx: UserContext, users: usize) -> Vec<JoinHandle<usize>> {
        (1..=users)
            .map(|id| tokio::spawn(run_virtual_user(id, ctx.clone())))
            .collect()
    }

    /// Drains the result channel until every sender is gone.
    pub async fn collector_task(
        mut rx: mpsc::Receiver<TestResult>,
        batch_size: usize,
    ) -> Vec<TestResult> {
        let mut results = Vec::new();
        // `recv_many` only returns 0 once the channel is closed and empty.
        while rx.recv_many(&mut results, batch_size).await > 0 {}
        results
    }

    /// Runs one virtual user and returns how many requests it issued.
    ///
    /// The deadline and the cap are both checked before every request, never
    /// while one is in flight. A zero budget means the deadline has already
    /// passed; one that overflows the clock leaves only the cap. With neither a budget nor a cap the user would never stop, so it
    /// does not start.
    pub async fn run_virtual_user(id: usize, ctx: UserContext) -> usize {
        let UserContext {
            client,
            progress,
            requests,
            budget,
            cap,
            pause,
            sink,
        } = ctx;

        if requests.is_empty() {
            tracing::debug!("User #{id} has no requests to run");
            return 0;
        }
        if budget.is_none() && cap == 0 {
            tracing::warn!("User #{id} has neither a time budget nor a request cap, skipping");
            return 0;
        }

        // A budget too far out to represent is no deadline at all.
        let deadline = budget.and_then(|b| Instant::now().checked_add(b));
        let expired = || deadline.is_some_and(|d| Instant::now() >= d);
        let capped = |count: usize| cap > 0 && count >= cap;
        let mut count = 0;

        tracing::debug!("User #{id} started");
        announce(progress.as_ref(), format!("User #{id} started"));

        'passes: while !expired() && !capped(count) {
            for request in requests.iter() {
                if expired() || capped(count) {
                    break 'passes;
                }

                let result = execute_request(client.as_ref(), request).await;
                let line = format!(
                    "[{}] {} -> {} ({:?})",
                    result.method, result.url, result.status_code, result.duration
                );
                tracing::trace!("User #{id} {line}");
                announce(progress.as_ref(), line);

                if sink.send(result).await.is_err() {
                    tracing::warn!("User #{id}: result channel closed, stopping");
                    break 'passes;
                }
                count += 1;
            }
            tokio::time::sleep(pause).await;
        }

        tracing::debug!("User #{id} finished after {count} requests");
        announce(
            progress.as_ref(),
            format!("User #{id} finished (total requests: {count})"),
        );
        count
    }

    /// Issues one request and turns the outcome into a [`TestResult`].
    ///
    /// Unsupported methods fail locally without reaching the client.
    pub async fn execute_request(client: &dyn HttpClient, request: &ApiRequest) -> TestResult {
        let start = Instant::now();
        let method = match request.parsed_method() {
            Ok(method) => method,
            Err(raw) => {
                return TestResult::failed(
                    &request.method,
                    &request.url,
                    format!("unsupported method: {raw}"),
                    start.elapsed(),
                );
            }
        };

        match client
            .send(method, &request.url, &request.headers, request.body.as_ref())
            .await
        {
            Ok(status) => {
                TestResult::completed(&request.method, &request.url, status, start.elapsed())
            }
            Err(e) => TestResult::failed(&request.method, &request.url, e, start.elapsed()),
        }
    }
}
