// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Normalize`: trims and collapses whitespace in the raw prompt. The only
//! handler with a documented failure mode (§4.6): a missing or blank prompt
//! leaves the state untouched and reports `invalid_prompt`.

use det_core::{ReasoningState, StepError, StepResult, StepStatus};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, normalize_whitespace, require_non_empty_now, require_valid_state};

/// `{prompt}` → `{normalized_prompt}`, artifact slot `normalized`.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn normalize(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let prompt = &state.problem.inputs.prompt;
    let input = json!({"prompt": prompt});

    if prompt.trim().is_empty() {
        let result = StepResult {
            version: det_core::SCHEMA_VERSION.to_string(),
            step: "Normalize".to_string(),
            status: StepStatus::Failed,
            input_hash: det_core::hash_json(&input)?,
            output_hash: det_core::hash_json(&json!({}))?,
            started_at: now.to_string(),
            finished_at: now.to_string(),
            output: None,
            errors: Some(vec![StepError {
                code: "invalid_prompt".to_string(),
                message: "prompt is required".to_string(),
                step: None,
            }]),
        };
        det_validate::validate_step_result(&result)?;
        let next_state = state.clone();
        det_validate::validate_state(&next_state)?;
        return Ok((next_state, result));
    }

    let normalized_prompt = normalize_whitespace(prompt);
    let output = json!({"normalized_prompt": normalized_prompt});
    let result = crate::success_result("Normalize", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "normalized", output, now)?;
    Ok((new_state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{base_state, NOW};

    #[test]
    fn trims_and_collapses_whitespace() {
        let state = base_state("  Hello    world  \n");
        let (new_state, result) = normalize(&state, NOW).unwrap();
        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(result.output.unwrap()["normalized_prompt"], "Hello world");
        assert_eq!(new_state.step_index, 1);
        assert_eq!(new_state.artifacts["normalized"]["normalized_prompt"], "Hello world");
    }

    #[test]
    fn blank_prompt_fails_without_advancing() {
        let state = base_state("   ");
        let (new_state, result) = normalize(&state, NOW).unwrap();
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.errors.unwrap()[0].code, "invalid_prompt");
        assert_eq!(new_state.step_index, 0);
        assert!(new_state.artifacts.is_empty());
    }

    #[test]
    fn rejects_blank_now() {
        let state = base_state("hello");
        assert!(normalize(&state, "").is_err());
    }
}
