// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Audit`: records which artifact slots were populated by the time this
//! step runs, as a final sanity snapshot of the state.

use det_core::{ReasoningState, StepResult};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, require_non_empty_now, require_valid_state};

fn artifact_keys(state: &ReasoningState) -> Vec<String> {
    state.artifacts.keys().cloned().collect()
}

/// `{artifact_keys}` → `{artifact_keys, status:"ok"}`, artifact slot `audit`.
///
/// `artifact_keys` is read from `state.artifacts` before this step inserts
/// its own `audit` entry, so the slot never lists itself; `BTreeMap` keeps
/// the keys in sorted order for free.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn audit(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let artifact_keys = artifact_keys(state);
    let input = json!({"artifact_keys": artifact_keys});
    let output = json!({"artifact_keys": artifact_keys, "status": "ok"});
    let result = crate::success_result("Audit", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "audit", output, now)?;
    Ok((new_state, result))
}
