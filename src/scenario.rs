use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

/// HTTP methods a virtual user is able to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request template, replayed on every pass through the scenario.
///
/// The method stays a string so an unsupported one can still reach a virtual
/// user, which records it as a failed attempt without touching the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn parsed_method(&self) -> Result<HttpMethod, String> {
        self.method.parse()
    }
}

/// Description of one load test run.
///
/// `max_requests` caps each virtual user separately; `0` means no cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScenario {
    pub concurrent_users: usize,
    pub duration_seconds: u64,
    pub requests: Vec<ApiRequest>,
    #[serde(default)]
    pub max_requests: usize,
}

impl TestScenario {
    /// Checks everything that should be refused before any user is spawned.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.concurrent_users == 0 {
            return Err(ScenarioError::NoUsers);
        }
        if self.requests.is_empty() {
            return Err(ScenarioError::NoRequests);
        }
        for (index, request) in self.requests.iter().enumerate() {
            if let Err(method) = request.parsed_method() {
                return Err(ScenarioError::UnsupportedMethod { index, method });
            }
            if request.url.trim().is_empty() {
                return Err(ScenarioError::EmptyUrl { index });
            }
        }
        Ok(())
    }

    /// Wall-clock budget handed to each virtual user.
    ///
    /// `None` means the request cap is the only bound. A zero duration only
    /// means that when a cap exists; with neither bound the budget is zero
    /// and users issue no requests.
    pub fn time_budget(&self) -> Option<Duration> {
        match (self.duration_seconds, self.max_requests) {
            (0, 0) => Some(Duration::ZERO),
            (0, _) => None,
            (secs, _) => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn scenario(users: usize, requests: Vec<ApiRequest>) -> TestScenario {
        TestScenario {
            concurrent_users: users,
            duration_seconds: 1,
            requests,
            max_requests: 0,
        }
    }

    #[test]
    fn deserializes_wire_format() {
        let scenario: TestScenario = serde_json::from_str(
            r#"{
                "concurrent_users": 2,
                "duration_seconds": 1,
                "requests": [
                    {"method": "GET", "url": "http://example/ok"},
                    {"method": "POST", "url": "http://example/items",
                     "headers": {"Authorization": "Bearer t"}, "body": {"name": "x"}}
                ],
                "max_requests": 3
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.concurrent_users, 2);
        assert_eq!(scenario.max_requests, 3);
        assert_eq!(scenario.requests[1].headers["Authorization"], "Bearer t");
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn max_requests_defaults_to_unlimited() {
        let scenario: TestScenario = serde_json::from_str(
            r#"{"concurrent_users":1,"duration_seconds":5,"requests":[]}"#,
        )
        .unwrap();
        assert_eq!(scenario.max_requests, 0);
    }

    #[test]
    fn rejects_zero_users() {
        let s = scenario(0, vec![ApiRequest::new("GET", "http://x")]);
        assert_eq!(s.validate(), Err(ScenarioError::NoUsers));
    }

    #[test]
    fn rejects_empty_requests() {
        assert_eq!(scenario(1, vec![]).validate(), Err(ScenarioError::NoRequests));
    }

    #[rstest]
    #[case("PATCH")]
    #[case("get")]
    #[case("")]
    fn rejects_unsupported_methods(#[case] method: &str) {
        let s = scenario(
            1,
            vec![ApiRequest::new("GET", "http://x"), ApiRequest::new(method, "http://x")],
        );
        assert_eq!(
            s.validate(),
            Err(ScenarioError::UnsupportedMethod {
                index: 1,
                method: method.to_string()
            })
        );
    }

    #[test]
    fn rejects_blank_url() {
        let s = scenario(1, vec![ApiRequest::new("DELETE", "  ")]);
        assert_eq!(s.validate(), Err(ScenarioError::EmptyUrl { index: 0 }));
    }

    #[rstest]
    #[case(5, 0, Some(Duration::from_secs(5)))]
    #[case(5, 10, Some(Duration::from_secs(5)))]
    #[case(0, 10, None)]
    #[case(0, 0, Some(Duration::ZERO))]
    fn time_budget_from_bounds(
        #[case] duration_seconds: u64,
        #[case] max_requests: usize,
        #[case] expected: Option<Duration>,
    ) {
        let s = TestScenario {
            concurrent_users: 1,
            duration_seconds,
            requests: vec![],
            max_requests,
        };
        assert_eq!(s.time_budget(), expected);
    }

    #[rstest]
    #[case("GET", HttpMethod::Get)]
    #[case("POST", HttpMethod::Post)]
    #[case("PUT", HttpMethod::Put)]
    #[case("DELETE", HttpMethod::Delete)]
    fn parses_supported_methods(#[case] raw: &str, #[case] expected: HttpMethod) {
        assert_eq!(raw.parse::<HttpMethod>(), Ok(expected));
        assert_eq!(expected.to_string(), raw);
    }
}
