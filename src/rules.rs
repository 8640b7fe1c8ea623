use crate::domain::models::{Rule, Severity};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum RuleError {
    #[error("rule file unreadable: {0}")]
    Unreadable(#[source] std::io::Error),
    #[error("rule file malformed: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("rule `{0}` is missing required field `{1}`")]
    MissingField(String, &'static str),
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<RawRule>,
}

#[derive(Deserialize)]
struct RawRule {
    rule_id: Option<String>,
    name: Option<String>,
    severity: Option<String>,
    endpoint: Option<String>,
    #[serde(default)]
    expected_behavior: Map<String, Value>,
    #[serde(default)]
    test: Map<String, Value>,
}

/// Pure parse-and-validate: no side effects beyond reading the file.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let raw = std::fs::read_to_string(path).map_err(RuleError::Unreadable)?;
    parse_rules(&raw)
}

pub fn parse_rules(raw: &str) -> Result<Vec<Rule>, RuleError> {
    let file: RuleFile = serde_json::from_str(raw).map_err(RuleError::Malformed)?;

    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(file.rules.len());
    for r in file.rules {
        let rule_id = r
            .rule_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RuleError::MissingField("<unnamed>".to_string(), "rule_id"))?;
        let endpoint = r
            .endpoint
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RuleError::MissingField(rule_id.clone(), "endpoint"))?;
        if !seen.insert(rule_id.clone()) {
            return Err(RuleError::DuplicateRuleId(rule_id));
        }
        rules.push(Rule {
            rule_id,
            name: r.name.unwrap_or_default(),
            severity: Severity::parse(r.severity.as_deref()),
            endpoint,
            expected_behavior: r.expected_behavior,
            test: r.test,
        });
    }
    Ok(rules)
}
