// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Synthesize`: turns the task count into a one-line human summary.

use det_core::{ReasoningState, StepResult};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, require_non_empty_now, require_valid_state};

fn task_count(state: &ReasoningState) -> u64 {
    state
        .artifacts
        .get("decomposition")
        .and_then(|v| v.get("tasks"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.len() as u64)
        .unwrap_or(0)
}

/// `{task_count}` → `{summary}`, artifact slot `synthesis`.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn synthesize(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let task_count = task_count(state);
    let input = json!({"task_count": task_count});
    let summary = format!("Processed {task_count} task(s).");
    let output = json!({"summary": summary});
    let result = crate::success_result("Synthesize", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "synthesis", output, now)?;
    Ok((new_state, result))
}
