// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Decompose`: turns `goals` (if any) or the normalized prompt into an
//! ordered list of tasks.

use det_core::{ReasoningState, StepResult};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, require_non_empty_now, require_valid_state};

fn normalized_prompt(state: &ReasoningState) -> String {
    state
        .artifacts
        .get("normalized")
        .and_then(|v| v.get("normalized_prompt"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// `{goals, prompt}` → `{tasks}`, artifact slot `decomposition`.
///
/// `prompt` in the hashed input is the normalized prompt, not the raw one —
/// `Decompose` only ever runs after `Normalize`, and the fallback task list
/// below is defined in terms of the same normalized value.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn decompose(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let goals = state.problem.inputs.goals.clone().unwrap_or_default();
    let prompt = normalized_prompt(state);
    let input = json!({"goals": goals, "prompt": prompt});

    let tasks: Vec<String> = if !goals.is_empty() {
        goals
    } else if !prompt.is_empty() {
        vec![prompt]
    } else {
        vec!["unspecified task".to_string()]
    };

    let output = json!({"tasks": tasks});
    let result = crate::success_result("Decompose", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "decomposition", output, now)?;
    Ok((new_state, result))
}
