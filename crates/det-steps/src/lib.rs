// SPDX-License-Identifier: MIT OR Apache-2.0
//! The seven pure step handlers that make up the `default` policy. Each
//! handler is a total function `(state, now) -> (state', result)`: no
//! internal clock, no I/O, and — aside from `Normalize`'s documented
//! blank-prompt case — no failure path.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod acquire_evidence;
mod audit;
mod compute;
mod decompose;
mod normalize;
mod synthesize;
#[cfg(test)]
mod test_support;
mod verify;

use det_core::{ReasoningState, StepResult, StepStatus};
use det_error::{DetError, DetResult, ErrorCode};
use serde_json::Value;

pub use acquire_evidence::acquire_evidence;
pub use audit::audit;
pub use compute::compute;
pub use decompose::decompose;
pub use normalize::normalize;
pub use synthesize::synthesize;
pub use verify::verify;

/// Signature shared by every step handler.
pub type StepFn = fn(&ReasoningState, &str) -> DetResult<(ReasoningState, StepResult)>;

/// Step names in the order the built-in `default` policy runs them.
pub const STEP_NAMES: &[&str] =
    &["Normalize", "Decompose", "AcquireEvidence", "Compute", "Verify", "Synthesize", "Audit"];

/// Resolve a step name to its handler function.
#[must_use]
pub fn step_handler(name: &str) -> Option<StepFn> {
    match name {
        "Normalize" => Some(normalize),
        "Decompose" => Some(decompose),
        "AcquireEvidence" => Some(acquire_evidence),
        "Compute" => Some(compute),
        "Verify" => Some(verify),
        "Synthesize" => Some(synthesize),
        "Audit" => Some(audit),
        _ => None,
    }
}

pub(crate) fn require_non_empty_now(now: &str) -> DetResult<()> {
    if now.trim().is_empty() {
        return Err(DetError::new(ErrorCode::Internal, "step handlers require a non-empty `now`"));
    }
    Ok(())
}

/// Every handler validates the state it was handed before doing anything
/// else with it (§4.6: "They validate input state…").
pub(crate) fn require_valid_state(state: &ReasoningState) -> DetResult<()> {
    det_validate::validate_state(state)
}

/// Collapse runs of whitespace to a single ASCII space and trim the ends.
/// Shared by `Normalize`'s own output and by `Decompose`'s fallback task.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the success [`StepResult`] for `step`, hashing `input` and `output`
/// with `det_core::hash_json`, and validate it before handing it back —
/// §4.2 requires the byte-shape and relational validators to agree on every
/// result this workspace produces, not just the ones under test.
pub(crate) fn success_result(
    step: &str,
    input: &Value,
    output: Value,
    now: &str,
) -> DetResult<StepResult> {
    let result = StepResult {
        version: det_core::SCHEMA_VERSION.to_string(),
        step: step.to_string(),
        status: StepStatus::Success,
        input_hash: det_core::hash_json(input)?,
        output_hash: det_core::hash_json(&output)?,
        started_at: now.to_string(),
        finished_at: now.to_string(),
        output: Some(output),
        errors: None,
    };
    det_validate::validate_step_result(&result)?;
    Ok(result)
}

/// Commit a successful step's output into `state`, per the advance-on-success
/// semantics in §4.6: `step_index += 1`, `status = running`,
/// `artifacts[slot] = output`, `metadata.updated_at = now`. Validates the
/// resulting state before handing it back, for the same reason
/// [`success_result`] validates its own output.
pub(crate) fn advance_on_success(
    mut state: ReasoningState,
    slot: &str,
    output: Value,
    now: &str,
) -> DetResult<ReasoningState> {
    state.step_index += 1;
    state.status = det_core::StateStatus::Running;
    state.artifacts.insert(slot.to_string(), output);
    state.metadata.updated_at = now.to_string();
    det_validate::validate_state(&state)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_handler_resolves_every_known_name() {
        for name in STEP_NAMES {
            assert!(step_handler(name).is_some(), "missing handler for {name}");
        }
    }

    #[test]
    fn step_handler_rejects_unknown_name() {
        assert!(step_handler("Teleport").is_none());
    }

    #[test]
    fn normalize_whitespace_collapses_and_trims() {
        assert_eq!(normalize_whitespace("  Hello   world  \t\n"), "Hello world");
    }

    #[test]
    fn require_non_empty_now_rejects_blank() {
        assert!(require_non_empty_now("   ").is_err());
        assert!(require_non_empty_now("2026-01-01T00:00:00Z").is_ok());
    }
}
