use crate::domain::models::{JsonOut, Outcome, RunSummary, Status};
use serde::Serialize;

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

pub fn outcome_row(o: &Outcome) -> String {
    match (&o.status, o.reason.as_deref()) {
        (Status::Pass, None) => format!("PASS  {} [{}]", o.rule_id, o.severity),
        (status, reason) => format!(
            "{status:<5} {} [{}] {}",
            o.rule_id,
            o.severity,
            reason.unwrap_or_default()
        ),
    }
}

pub fn summary_banner(s: &RunSummary) -> String {
    let gate = if s.blocked {
        "gate: BLOCKED (high/critical business-logic violation)"
    } else {
        "gate: allowed"
    };
    format!(
        "rules passed: {} | failed: {} | errors: {} | total: {}\n{}",
        s.passed_count, s.failed_count, s.error_count, s.total_rules, gate
    )
}
