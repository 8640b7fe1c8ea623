use crate::domain::models::{Outcome, Status};

/// Reduces a run's outcomes to the CI gate decision.
///
/// Blocks only on FAIL outcomes at HIGH or CRITICAL severity. ERROR outcomes
/// and lower-severity FAILs are reported but never block; informational
/// findings must stay visible without stopping delivery.
pub fn blocked(outcomes: &[Outcome]) -> bool {
    outcomes
        .iter()
        .any(|o| o.status == Status::Fail && o.severity.blocking())
}
