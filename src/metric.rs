use std::{fmt::Debug, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use crate::macros::metric;

/// A `Metric` is a single observation produced by a virtual user.
///
/// Metrics are the most granular data the engine handles. They are collected
/// by the executor, reduced by an [`crate::Aggregate`] and turned into
/// statistics by a [`crate::Report`].
///
/// Metrics cross task boundaries (virtual user → collector → caller), so they
/// must be `Send + Sync + Clone`, and serializable so the service layer can
/// return them as-is.
///
/// Use the [`crate::macros::metric`] attribute to derive everything at once.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialEq + Send + Sync + Debug + Clone,
{
}

/// Outcome of one request attempt.
///
/// Exactly one `TestResult` exists per attempt. A transport failure carries
/// status `0` and a non-empty `error`; a completed HTTP exchange carries its
/// status code and an empty `error`, whatever the status class.
#[metric]
pub struct TestResult {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Elapsed time, encoded as integer nanoseconds.
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
}

impl TestResult {
    /// A completed exchange.
    pub fn completed(
        method: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
        duration: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status_code,
            error: String::new(),
            duration,
        }
    }

    /// An attempt that never produced a response.
    pub fn failed(
        method: impl Into<String>,
        url: impl Into<String>,
        error: impl ToString,
        duration: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status_code: 0,
            error: error.to_string(),
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Saturates at `u64::MAX` nanoseconds (about 584 years).
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_has_zero_status() {
        let result = TestResult::failed("GET", "http://x", "connection refused", Duration::ZERO);
        assert_eq!(result.status_code, 0);
        assert!(!result.is_success());
    }

    #[test]
    fn error_is_omitted_on_success() {
        let result = TestResult::completed("GET", "http://x", 500, Duration::from_millis(250));
        let json = serde_json::to_value(&result).unwrap();

        assert!(json.get("error").is_none());
        assert_eq!(json["status_code"], 500);
        assert_eq!(json["duration"], 250_000_000u64);
        assert!(result.is_success());
    }

    #[test]
    fn deserializes_without_error_field() {
        let result: TestResult = serde_json::from_str(
            r#"{"method":"PUT","url":"http://x","status_code":204,"duration":1500000000}"#,
        )
        .unwrap();

        assert_eq!(result.error, "");
        assert_eq!(result.duration, Duration::from_millis(1500));
    }

    #[test]
    fn fractional_durations_are_rejected() {
        let parsed = serde_json::from_str::<TestResult>(
            r#"{"method":"GET","url":"http://x","status_code":200,"duration":0.25}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn sub_millisecond_durations_keep_full_precision() {
        let result = TestResult::completed("GET", "http://x", 200, Duration::from_nanos(1_234_567));
        let json = serde_json::to_string(&result).unwrap();

        assert!(json.contains(r#""duration":1234567"#), "{json}");
        let back: TestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration, Duration::from_nanos(1_234_567));
    }
}
