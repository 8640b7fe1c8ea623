//! Service layer containing the validation engine and side-effect helpers.
//!
//! ## Service map
//! - `session.rs` — stateful HTTP client bound to one target base URL.
//! - `adapter.rs` — target profile abstraction (login flow, basket shape).
//! - `state.rs` — target-side baseline establishment and reset.
//! - `validators.rs` — per-rule attack strategies + registry dispatch.
//! - `orchestrator.rs` — reset/dispatch/classify/record loop per rule.
//! - `gate.rs` — severity-based block/allow reduction.
//! - `report.rs` — run summary assembly, CI upload, audit trail.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod adapter;
pub mod gate;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod session;
pub mod state;
pub mod validators;
