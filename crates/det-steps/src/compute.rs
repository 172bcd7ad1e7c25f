// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Compute`: counts the decomposed tasks. A stand-in for whatever real
//! computation a concrete policy profile would substitute here — the core
//! only needs a deterministic, total placeholder.

use det_core::{ReasoningState, StepResult};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, require_non_empty_now, require_valid_state};

fn tasks(state: &ReasoningState) -> Vec<String> {
    state
        .artifacts
        .get("decomposition")
        .and_then(|v| v.get("tasks"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// `{tasks}` → `{task_count, status:"ok"}`, artifact slot `computation`.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn compute(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let tasks = tasks(state);
    let input = json!({"tasks": tasks});
    let output = json!({"task_count": tasks.len(), "status": "ok"});
    let result = crate::success_result("Compute", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "computation", output, now)?;
    Ok((new_state, result))
}
