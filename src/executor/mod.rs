//! Executor: fan-out of virtual users and result collection
//!
//! The `Executor` trait is the runtime that executes a [`TestScenario`].
//! barrage ships one implementation, [`VirtualUserExecutor`], which mirrors how
//! a person would drive a service by hand: each virtual user replays the
//! scenario's request list in order, over and over, until its time budget runs
//! out or it has issued `max_requests` requests.
//!
//! # High-level flow
//! 1. A bounded result channel is created and a collector task starts draining
//!    it right away, so memory use tracks the buffer size rather than the
//!    expected number of results.
//! 2. `concurrent_users` tasks are spawned, numbered from 1. Each holds a clone
//!    of the channel's sender.
//! 3. Every user loops over the request list. Before each request it checks its
//!    deadline and its cap; a request already in flight always completes and is
//!    always recorded.
//! 4. After each full pass a user sleeps for `pause` (10ms by default). This is
//!    a coarse floor on the per-user request rate, not a rate scheduler.
//! 5. The executor joins every user, drops the last sender, and awaits the
//!    collector, which returns once the channel is closed and empty.
//!
//! # Ordering
//! Within a user, results are emitted in scenario order. Across users the
//! returned list is in completion order, which is not meaningful: treat it as a
//! multiset.
//!
//! # Failures
//! A request that fails in transport becomes a [`TestResult`] with status `0`
//! and a non-empty error; nothing is retried and nothing aborts the run. A user
//! task that panics is logged and its already-delivered results are kept.
pub mod virtual_user;
pub use virtual_user::VirtualUserExecutor;

use crate::{metric::TestResult, scenario::TestScenario};
use std::future::Future;

/// The runtime hook that executes a [`TestScenario`].
pub trait Executor
where
    Self: Send + Sync + Sized,
{
    type Error;

    /// Run the scenario to completion and return one result per attempt.
    fn exec(
        &self,
        scenario: &TestScenario,
    ) -> impl Future<Output = Result<Vec<TestResult>, Self::Error>> + Send;
}
