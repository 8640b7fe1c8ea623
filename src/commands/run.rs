use crate::cli::Cli;
use crate::rules;
use crate::services::session::TargetSession;
use crate::services::state::StateManager;
use crate::services::validators::ValidatorRegistry;
use crate::services::{adapter, gate, orchestrator, output, report};
use std::path::Path;
use std::time::Duration;

/// Executes one gate run end to end and returns the process exit code:
/// 0 when the gate allows, 1 when it blocks. Only a rule-file error is
/// fatal; everything after rule loading degrades into per-rule outcomes.
pub fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let loaded = rules::load_rules(Path::new(&cli.rules))?;

    let mut session = TargetSession::new(&cli.target, Duration::from_secs(cli.timeout_secs))?;
    let mut state = StateManager::new(adapter::for_profile(&cli.profile));
    let registry = ValidatorRegistry::standard();

    if !cli.json {
        println!(
            "validating {} rules against {} ({} profile)",
            loaded.len(),
            session.base(),
            state.adapter_name()
        );
    }

    let outcomes = orchestrator::run(
        &loaded,
        &mut session,
        &mut state,
        &registry,
        cli.deadline_secs.map(Duration::from_secs),
    );
    for outcome in &outcomes {
        report::audit(outcome);
    }

    // The gate decision is final before any reporting is attempted.
    let blocked = gate::blocked(&outcomes);
    let summary = report::build_summary(&outcomes, &registry, blocked);

    if !cli.json {
        for outcome in &outcomes {
            println!("{}", output::outcome_row(outcome));
        }
    }
    output::print_one(cli.json, &summary, |s| output::summary_banner(s))?;

    report::send(&summary, cli.report_url.as_deref());

    Ok(if blocked { 1 } else { 0 })
}
