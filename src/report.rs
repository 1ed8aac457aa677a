use std::{collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Aggregate,
    aggregate::SummaryAggregate,
    metric::TestResult,
    progress::ProgressBroadcaster,
};

/// A [`Report`] is the processed form of an [`Aggregate`].
///
/// Reports derive final statistics (averages, rates, ratios) from raw counters.
/// They are plain data: no I/O, built with a [`From<A>`] conversion, and
/// serializable so a [`Reporter`] or the HTTP layer can ship them anywhere.
pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

/// A [`Reporter`] consumes a [`Report`] and performs the side effects:
/// printing it, logging it, pushing it to listeners.
#[async_trait]
pub trait Reporter<A: Aggregate, R: Report<A>>: Send + Sync {
    async fn report(&self, report: &R) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Aggregate statistics over one run.
///
/// `total_seconds` sums per-request elapsed time, so `requests_per_second` is
/// the throughput a single sequential client would observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub failures: usize,
    pub average_seconds: f64,
    pub total_seconds: f64,
    pub requests_per_second: f64,
    pub by_status_code: BTreeMap<u16, usize>,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut agg = SummaryAggregate::new();
        agg.aggregate(results);
        Self::from(agg)
    }
}

impl From<SummaryAggregate> for Summary {
    fn from(value: SummaryAggregate) -> Self {
        let total_seconds = value.total_latency.as_secs_f64();
        let average_seconds = if value.count > 0 {
            total_seconds / value.count as f64
        } else {
            0.0
        };
        let requests_per_second = if total_seconds > 0.0 {
            value.count as f64 / total_seconds
        } else {
            0.0
        };

        Self {
            total: value.count,
            success: value.success_count,
            failures: value.failure_count,
            average_seconds,
            total_seconds,
            requests_per_second,
            by_status_code: value.by_status_code,
        }
    }
}

impl Report<SummaryAggregate> for Summary {}

/// Logs each summary and forwards it, as one JSON line, to progress listeners.
#[derive(Clone)]
pub struct ProgressReporter {
    progress: ProgressBroadcaster,
}

impl ProgressReporter {
    pub fn new(progress: ProgressBroadcaster) -> Self {
        Self { progress }
    }
}

#[async_trait]
impl Reporter<SummaryAggregate, Summary> for ProgressReporter {
    async fn report(
        &self,
        report: &Summary,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            total = report.total,
            success = report.success,
            failures = report.failures,
            rps = report.requests_per_second,
            "Run summary"
        );
        let line = serde_json::to_string(report)?;
        self.progress.publish(format!("summary: {line}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;

    #[test]
    fn empty_results_give_zeroed_summary() {
        let summary = Summary::from_results(&[]);

        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_seconds, 0.0);
        assert_eq!(summary.requests_per_second, 0.0);
        assert!(summary.by_status_code.is_empty());
    }

    #[test]
    fn derived_fields_follow_totals() {
        let results = vec![
            TestResult::completed("GET", "http://a", 200, Duration::from_millis(500)),
            TestResult::completed("GET", "http://a", 200, Duration::from_millis(1500)),
            TestResult::failed("POST", "http://b", "refused", Duration::from_secs(2)),
            TestResult::completed("DELETE", "http://c", 404, Duration::ZERO),
        ];
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.success + summary.failures, summary.total);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.total_seconds, 4.0);
        assert_eq!(summary.average_seconds, 1.0);
        assert_eq!(summary.requests_per_second, 1.0);
        assert_eq!(summary.by_status_code.get(&200), Some(&2));
        assert_eq!(summary.by_status_code.get(&0), Some(&1));
    }

    #[test]
    fn instant_results_have_zero_rate() {
        let results = vec![TestResult::completed("GET", "http://a", 200, Duration::ZERO); 3];
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.total_seconds, 0.0);
        assert_eq!(summary.requests_per_second, 0.0);
    }

    #[test]
    fn encodes_literal_keys() {
        let summary = Summary::from_results(&[TestResult::completed(
            "GET",
            "http://a",
            201,
            Duration::from_secs(1),
        )]);
        let json = serde_json::to_value(&summary).unwrap();

        for key in [
            "total",
            "success",
            "failures",
            "average_seconds",
            "total_seconds",
            "requests_per_second",
            "by_status_code",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["by_status_code"]["201"], 1);
    }

    #[tokio::test]
    async fn progress_reporter_publishes_summary() {
        let progress = ProgressBroadcaster::new(4);
        let mut sub = progress.subscribe();
        let reporter = ProgressReporter::new(progress.clone());

        reporter.report(&Summary::from_results(&[])).await.unwrap();

        let line = sub.next().await.unwrap();
        assert!(line.starts_with("summary: {\"total\":0"));
    }
}
