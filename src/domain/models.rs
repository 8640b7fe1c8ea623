use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Ordinal classification used only by the gate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Absent or unrecognized severities degrade to LOW rather than erroring,
    /// so a sloppy rule file never inflates the gate.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_uppercase).as_deref() {
            Some("MEDIUM") => Severity::Medium,
            Some("HIGH") => Severity::High,
            Some("CRITICAL") => Severity::Critical,
            _ => Severity::Low,
        }
    }

    pub fn blocking(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One declarative invariant and how to attempt to violate it.
/// Loaded once per run; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Rule {
    pub rule_id: String,
    pub name: String,
    pub severity: Severity,
    pub endpoint: String,
    pub expected_behavior: Map<String, Value>,
    pub test: Map<String, Value>,
}

impl Rule {
    pub fn expected_i64(&self, key: &str, default: i64) -> i64 {
        self.expected_behavior
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    pub fn expected_f64(&self, key: &str, default: f64) -> f64 {
        self.expected_behavior
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    pub fn test_str(&self, key: &str) -> Option<&str> {
        self.test.get(key).and_then(Value::as_str)
    }
}

/// Captured request/response context attached to FAIL outcomes so a finding
/// can be triaged without re-running the gate.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub endpoint: String,
    pub request_payload: Value,
    pub status_code: Option<u16>,
    pub response_snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub rule_id: String,
    pub severity: Severity,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

impl Outcome {
    pub fn error(rule: &Rule, reason: impl Into<String>) -> Self {
        Outcome {
            rule_id: rule.rule_id.clone(),
            severity: rule.severity,
            status: Status::Error,
            reason: Some(reason.into()),
            evidence: None,
        }
    }
}

/// The payload handed to the CI dashboard and printed in `--json` mode.
/// `blocked` is computed by the gate policy, never set directly.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub commit_sha: String,
    pub branch: String,
    pub status: String,
    pub total_rules: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub error_count: usize,
    pub implemented_count: usize,
    pub failed_rule_ids: Vec<String>,
    pub failed_reasons: BTreeMap<String, String>,
    pub blocked: bool,
}
