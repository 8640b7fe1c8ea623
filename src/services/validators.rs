use crate::domain::models::{Evidence, Rule, Status};
use crate::services::session::TargetSession;
use crate::services::state::{Precondition, StateManager};
use anyhow::anyhow;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Headroom added to a declared maximum so an upper-bound probe can never be
/// mistaken for an off-by-one tolerance.
const UPPER_BOUND_MARGIN: i64 = 999;

/// Absolute tolerance when comparing an observed discount rate to a cap.
const RATE_TOLERANCE: f64 = 1e-9;

const RESPONSE_SNIPPET_MAX: usize = 400;

/// What a validator concluded about the target. Transport faults, broken
/// preconditions and crashes are expressed as `Err`/`Status::Error` and are
/// folded into an ERROR outcome by the orchestrator.
pub struct Verdict {
    pub status: Status,
    pub reason: Option<String>,
    pub evidence: Option<Evidence>,
}

impl Verdict {
    pub fn pass() -> Self {
        Verdict {
            status: Status::Pass,
            reason: None,
            evidence: None,
        }
    }

    pub fn fail(reason: impl Into<String>, evidence: Option<Evidence>) -> Self {
        Verdict {
            status: Status::Fail,
            reason: Some(reason.into()),
            evidence,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Verdict {
            status: Status::Error,
            reason: Some(reason.into()),
            evidence: None,
        }
    }
}

pub type ValidatorFn =
    fn(&Rule, &mut TargetSession, &mut StateManager) -> anyhow::Result<Verdict>;

/// Maps rule ids to attack strategies. Absence of an entry is not an error;
/// the orchestrator applies the default policy (PASS with a warning) so an
/// incomplete catalog never blocks CI.
pub struct ValidatorRegistry {
    entries: HashMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        ValidatorRegistry {
            entries: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("BLV-QTY-001", quantity_lower_bound);
        registry.register("BLV-PRICE-001", price_positivity);
        registry.register("BLV-QTY-002", quantity_upper_bound);
        registry.register("BLV-CPN-001", coupon_single_use);
        registry.register("BLV-CPN-002", coupon_stacking_cap);
        registry.register("BLV-WF-001", checkout_workflow);
        registry.register("BLV-AUTH-001", admin_authorization);
        registry
    }

    pub fn register(&mut self, rule_id: &str, validator: ValidatorFn) {
        self.entries.insert(rule_id.to_string(), validator);
    }

    pub fn get(&self, rule_id: &str) -> Option<ValidatorFn> {
        self.entries.get(rule_id).copied()
    }

    pub fn is_registered(&self, rule_id: &str) -> bool {
        self.entries.contains_key(rule_id)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn snippet(body: &str) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(body.chars().take(RESPONSE_SNIPPET_MAX).collect())
    }
}

fn evidence(endpoint: &str, payload: &Value, status: u16, body: &str) -> Evidence {
    Evidence {
        endpoint: endpoint.to_string(),
        request_payload: payload.clone(),
        status_code: Some(status),
        response_snippet: snippet(body),
    }
}

/// Boundary probe: one request whose single field violates the declared
/// bound. PASS iff the target rejects it with a non-success status.
fn boundary_probe(
    rule: &Rule,
    session: &mut TargetSession,
    payload: Value,
    fail_reason: &str,
) -> anyhow::Result<Verdict> {
    let resp = session.post(&rule.endpoint, &payload)?;
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Ok(Verdict::fail(
            fail_reason,
            Some(evidence(&rule.endpoint, &payload, status.as_u16(), &body)),
        ));
    }
    Ok(Verdict::pass())
}

fn quantity_lower_bound(
    rule: &Rule,
    session: &mut TargetSession,
    _state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    boundary_probe(
        rule,
        session,
        json!({"product_id": 1, "price": 100, "quantity": -1}),
        "negative or zero quantity was accepted (expected rejection)",
    )
}

fn price_positivity(
    rule: &Rule,
    session: &mut TargetSession,
    _state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    boundary_probe(
        rule,
        session,
        json!({"product_id": 1, "price": -50, "quantity": 1}),
        "non-positive price was accepted (expected rejection)",
    )
}

fn quantity_upper_bound(
    rule: &Rule,
    session: &mut TargetSession,
    _state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    let max = rule.expected_i64("quantity_maximum", 10);
    boundary_probe(
        rule,
        session,
        json!({"product_id": 1, "price": 100, "quantity": max.saturating_add(UPPER_BOUND_MARGIN)}),
        &format!("unreasonably large quantity accepted (> {max})"),
    )
}

fn coupon_single_use(
    rule: &Rule,
    session: &mut TargetSession,
    state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    state.establish(
        session,
        Precondition::CartWithItem {
            product_id: 1,
            price: 100.0,
            quantity: 1,
        },
    )?;

    let code = rule.test_str("coupon_code").unwrap_or("SAVE10");
    let payload = json!({"coupon_code": code});

    let first = session.post(&rule.endpoint, &payload)?;
    if !first.status().is_success() {
        return Err(anyhow!(
            "coupon apply failed unexpectedly (status {})",
            first.status()
        ));
    }

    let second = session.post(&rule.endpoint, &payload)?;
    let status = second.status();
    if status.is_success() {
        let body = second.text().unwrap_or_default();
        return Ok(Verdict::fail(
            "coupon reuse allowed (should be single-use)",
            Some(evidence(&rule.endpoint, &payload, status.as_u16(), &body)),
        ));
    }
    Ok(Verdict::pass())
}

fn coupon_stacking_cap(
    rule: &Rule,
    session: &mut TargetSession,
    state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    state.establish(
        session,
        Precondition::CartWithItem {
            product_id: 2,
            price: 200.0,
            quantity: 1,
        },
    )?;

    let cap = rule.expected_f64("max_discount_rate", 0.30);

    let first = session.post(&rule.endpoint, &json!({"coupon_code": "SAVE20"}))?;
    if !first.status().is_success() {
        return Err(anyhow!(
            "first coupon failed unexpectedly (status {})",
            first.status()
        ));
    }

    // Reuse guards do not stop stacking with distinct codes, so a second,
    // different coupon is the actual probe.
    let stack_payload = json!({"coupon_code": "SAVE10"});
    let second = session.post(&rule.endpoint, &stack_payload)?;
    let status = second.status();
    if status.is_success() {
        let body = second.text().unwrap_or_default();
        let Ok(parsed) = serde_json::from_str::<Value>(&body) else {
            return Ok(Verdict::error("could not parse cart totals after stacking"));
        };
        let subtotal = parsed
            .pointer("/cart/subtotal")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let discount = parsed
            .pointer("/cart/discount")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let rate = if subtotal > 0.0 { discount / subtotal } else { 0.0 };

        if rate > cap + RATE_TOLERANCE {
            return Ok(Verdict::fail(
                format!("coupon stacking exceeded cap ({rate:.2} > {cap:.2})"),
                Some(evidence(
                    &rule.endpoint,
                    &stack_payload,
                    status.as_u16(),
                    &body,
                )),
            ));
        }
    }

    // A rejected second coupon also counts: stacking prevented by rejection
    // rather than by capping is an acceptable implementation.
    Ok(Verdict::pass())
}

fn checkout_workflow(
    rule: &Rule,
    session: &mut TargetSession,
    state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    let empty_payload = json!({});
    let empty = session.post(&rule.endpoint, &empty_payload)?;
    let empty_status = empty.status();
    if empty_status.is_success() {
        let body = empty.text().unwrap_or_default();
        return Ok(Verdict::fail(
            "checkout succeeded with empty cart (workflow bypass)",
            Some(evidence(
                &rule.endpoint,
                &empty_payload,
                empty_status.as_u16(),
                &body,
            )),
        ));
    }

    state.establish(
        session,
        Precondition::CartWithItem {
            product_id: 3,
            price: 50.0,
            quantity: 1,
        },
    )?;

    let ok = session.post(&rule.endpoint, &json!({}))?;
    let ok_status = ok.status();
    if !ok_status.is_success() {
        let body = ok.text().unwrap_or_default();
        return Ok(Verdict::fail(
            format!("checkout rejected with items present (status {ok_status})"),
            Some(evidence(
                &rule.endpoint,
                &empty_payload,
                ok_status.as_u16(),
                &body,
            )),
        ));
    }
    Ok(Verdict::pass())
}

fn admin_authorization(
    rule: &Rule,
    session: &mut TargetSession,
    state: &mut StateManager,
) -> anyhow::Result<Verdict> {
    let anonymous = session.get(&rule.endpoint)?;
    let anon_status = anonymous.status();
    if anon_status.is_success() {
        let body = anonymous.text().unwrap_or_default();
        return Ok(Verdict::fail(
            "privileged endpoint accessible without privilege",
            Some(evidence(
                &rule.endpoint,
                &Value::Null,
                anon_status.as_u16(),
                &body,
            )),
        ));
    }

    let headers = state.privileged(session)?;
    let privileged = session.get_with(&rule.endpoint, headers)?;
    let priv_status = privileged.status();
    if !priv_status.is_success() {
        let body = privileged.text().unwrap_or_default();
        return Ok(Verdict::fail(
            format!("privileged access rejected even with privilege (status {priv_status})"),
            Some(evidence(
                &rule.endpoint,
                &Value::Null,
                priv_status.as_u16(),
                &body,
            )),
        ));
    }
    Ok(Verdict::pass())
}
