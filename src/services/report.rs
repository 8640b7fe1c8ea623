use crate::domain::models::{Outcome, RunSummary, Status};
use crate::services::validators::ValidatorRegistry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

const ENV_RESULT_API: &str = "CI_RESULT_API";
const ENV_PLACEHOLDER: &str = "local";

fn env_or_local(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| ENV_PLACEHOLDER.to_string())
}

pub fn build_summary(
    outcomes: &[Outcome],
    registry: &ValidatorRegistry,
    blocked: bool,
) -> RunSummary {
    let passed_count = outcomes
        .iter()
        .filter(|o| o.status == Status::Pass)
        .count();
    let error_count = outcomes
        .iter()
        .filter(|o| o.status == Status::Error)
        .count();
    let failed: Vec<&Outcome> = outcomes
        .iter()
        .filter(|o| o.status == Status::Fail)
        .collect();

    let failed_rule_ids: Vec<String> = failed.iter().map(|o| o.rule_id.clone()).collect();
    let failed_reasons: BTreeMap<String, String> = failed
        .iter()
        .map(|o| (o.rule_id.clone(), o.reason.clone().unwrap_or_default()))
        .collect();

    RunSummary {
        run_id: env_or_local("GITHUB_RUN_ID"),
        commit_sha: env_or_local("GITHUB_SHA"),
        branch: env_or_local("GITHUB_REF_NAME"),
        status: if failed.is_empty() { "PASS" } else { "FAIL" }.to_string(),
        total_rules: outcomes.len(),
        passed_count,
        failed_count: failed.len(),
        error_count,
        implemented_count: outcomes
            .iter()
            .filter(|o| registry.is_registered(&o.rule_id))
            .count(),
        failed_rule_ids,
        failed_reasons,
        blocked,
    }
}

/// Best-effort upload to the CI dashboard. The gate decision is already
/// finalized by the time this runs; nothing here may change it, so every
/// failure is printed and swallowed.
pub fn send(summary: &RunSummary, override_url: Option<&str>) {
    let url = override_url
        .map(str::to_string)
        .or_else(|| std::env::var(ENV_RESULT_API).ok());
    let Some(url) = url else {
        eprintln!("{ENV_RESULT_API} not set, skipping result upload");
        return;
    };

    let sent = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .and_then(|client| client.post(&url).json(summary).send());
    match sent {
        Ok(resp) => eprintln!("ci result sent to {url} ({})", resp.status()),
        Err(e) => eprintln!("failed to send ci result: {e}"),
    }
}

/// Appends one outcome per line to the local audit trail. Best-effort: a
/// missing HOME or unwritable path never disturbs the run.
pub fn audit(outcome: &Outcome) {
    let Ok(home) = std::env::var("HOME") else {
        return;
    };
    let path = PathBuf::from(home).join(".config/blvgate/audit.jsonl");
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": unix_now(),
        "rule_id": outcome.rule_id,
        "severity": outcome.severity,
        "status": outcome.status,
        "reason": outcome.reason,
    });
    let line = format!("{event}\n");
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
