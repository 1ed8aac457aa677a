use std::{collections::BTreeMap, fmt::Debug, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Metric, macros::aggregate, metric::TestResult};

/// The `Aggregate` trait defines how raw [`Metric`] values are collected into an
/// intermediate, mergeable representation.
///
/// Aggregates store counts and sums, never derived statistics. Averages and
/// rates belong in a [`crate::Report`], which is built from an aggregate.
///
/// # Implementor notes
/// - `merge` must be associative and commutative: partial aggregates may be
///   combined in any order.
/// - `consume` is called once per metric and should stay cheap.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    ///
    /// This default implementation calls [`Aggregate::consume`] for each metric.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine two different aggregates into one.
    fn merge(&mut self, other: Self);
}

/// Raw counters behind a [`crate::report::Summary`].
///
/// A result counts as a success when its error is empty, so an HTTP 500 that
/// completed is a success here and shows up under its status code.
#[aggregate]
pub struct SummaryAggregate {
    pub count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_latency: Duration,
    pub by_status_code: BTreeMap<u16, usize>,
}

impl Aggregate for SummaryAggregate {
    type Metric = TestResult;

    fn new() -> Self {
        SummaryAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        self.count += 1;
        if metric.is_success() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.total_latency += metric.duration;
        *self.by_status_code.entry(metric.status_code).or_default() += 1;
    }

    fn merge(&mut self, other: Self) {
        self.count += other.count;
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.total_latency += other.total_latency;
        for (status, count) in other.by_status_code {
            *self.by_status_code.entry(status).or_default() += count;
        }
    }
}
