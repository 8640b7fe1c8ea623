use crate::domain::models::{Outcome, Rule, Status};
use crate::services::session::TargetSession;
use crate::services::state::StateManager;
use crate::services::validators::{ValidatorRegistry, Verdict};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Runs every rule in declared order and produces exactly one Outcome each.
///
/// Per rule: RESET → DISPATCH → CLASSIFY → RECORD. A reset failure is noted
/// but never prevents dispatch; the validator then reports the missing
/// baseline on its own terms. Any fault inside a validator — an `Err` or a
/// panic — is converted into an ERROR outcome carrying the fault's message,
/// so one broken validator cannot abort the run or skip later rules.
pub fn run(
    rules: &[Rule],
    session: &mut TargetSession,
    state: &mut StateManager,
    registry: &ValidatorRegistry,
    deadline: Option<Duration>,
) -> Vec<Outcome> {
    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule in rules {
        if let Some(budget) = deadline {
            if started.elapsed() >= budget {
                outcomes.push(Outcome::error(rule, "run deadline exceeded"));
                continue;
            }
        }

        if let Err(e) = state.reset(session) {
            eprintln!("warning: reset before {} failed: {e}", rule.rule_id);
        }

        outcomes.push(dispatch(rule, session, state, registry));
    }

    outcomes
}

fn dispatch(
    rule: &Rule,
    session: &mut TargetSession,
    state: &mut StateManager,
    registry: &ValidatorRegistry,
) -> Outcome {
    let Some(validator) = registry.get(&rule.rule_id) else {
        // Explicit policy: an incomplete catalog never blocks CI, but the
        // gap must stay visible in every report.
        return classify(
            rule,
            Verdict {
                status: Status::Pass,
                reason: Some(format!(
                    "no validator registered for {}; passing by policy",
                    rule.rule_id
                )),
                evidence: None,
            },
        );
    };

    match catch_unwind(AssertUnwindSafe(|| validator(rule, session, state))) {
        Ok(Ok(verdict)) => classify(rule, verdict),
        Ok(Err(e)) => Outcome::error(rule, format!("{e:#}")),
        Err(panic) => Outcome::error(rule, format!("validator crashed: {}", panic_message(&panic))),
    }
}

fn classify(rule: &Rule, verdict: Verdict) -> Outcome {
    Outcome {
        rule_id: rule.rule_id.clone(),
        severity: rule.severity,
        status: verdict.status,
        reason: verdict.reason,
        evidence: verdict.evidence,
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
