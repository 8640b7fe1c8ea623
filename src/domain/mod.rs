//! Shared data model layer (structs/enums only).
//!
//! ## Purpose
//! - Keep rule/outcome/summary types in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make JSON output schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — rules, outcomes, run summary, output envelope.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! Changes in these structs can affect `--json` outputs and the reporting
//! payload accepted by the CI dashboard. Keep schema-impacting changes
//! explicit and synchronized with `docs/contracts/*`.

pub mod models;
