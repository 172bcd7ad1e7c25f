// SPDX-License-Identifier: MIT OR Apache-2.0
//! `AcquireEvidence`: reads `inputs.context.evidence` into the running
//! state. Evidence acquisition from real external sources is out of scope
//! for this core — the handler only shapes whatever the caller already
//! attached to `context`.

use det_core::{ReasoningState, StepResult};
use det_error::DetResult;
use serde_json::json;

use crate::{advance_on_success, require_non_empty_now, require_valid_state};

fn evidence_list(state: &ReasoningState) -> Vec<String> {
    let Some(context) = &state.problem.inputs.context else {
        return Vec::new();
    };
    let Some(raw) = context.get("evidence").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// `{evidence}` → `{evidence, evidence_required, evidence_count}`, artifact
/// slot `evidence`.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn acquire_evidence(
    state: &ReasoningState,
    now: &str,
) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let evidence = evidence_list(state);
    let input = json!({"evidence": evidence});

    let evidence_required =
        state.problem.settings.as_ref().and_then(|s| s.evidence_required).unwrap_or(false);
    let output = json!({
        "evidence": evidence,
        "evidence_required": evidence_required,
        "evidence_count": evidence.len(),
    });
    let result = crate::success_result("AcquireEvidence", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "evidence", output, now)?;
    Ok((new_state, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{base_state, NOW};
    use serde_json::{json, Map};

    #[test]
    fn defaults_to_empty_evidence_without_context() {
        let state = base_state("irrelevant");
        let (_, result) = acquire_evidence(&state, NOW).unwrap();
        let output = result.output.unwrap();
        assert_eq!(output["evidence"], json!([]));
        assert_eq!(output["evidence_count"], 0);
        assert_eq!(output["evidence_required"], false);
    }

    #[test]
    fn reads_evidence_list_preserving_order() {
        let mut state = base_state("irrelevant");
        let mut context = Map::new();
        context.insert("evidence".into(), json!(["first", "second"]));
        state.problem.inputs.context = Some(context);
        let (_, result) = acquire_evidence(&state, NOW).unwrap();
        let output = result.output.unwrap();
        assert_eq!(output["evidence"], json!(["first", "second"]));
        assert_eq!(output["evidence_count"], 2);
    }

    #[test]
    fn drops_blank_entries() {
        let mut state = base_state("irrelevant");
        let mut context = Map::new();
        context.insert("evidence".into(), json!(["first", "   ", "second"]));
        state.problem.inputs.context = Some(context);
        let (_, result) = acquire_evidence(&state, NOW).unwrap();
        assert_eq!(result.output.unwrap()["evidence"], json!(["first", "second"]));
    }

    #[test]
    fn honors_evidence_required_setting() {
        let mut state = base_state("irrelevant");
        state.problem.settings = Some(det_core::ProblemSettings {
            evidence_required: Some(true),
            ..Default::default()
        });
        let (_, result) = acquire_evidence(&state, NOW).unwrap();
        assert_eq!(result.output.unwrap()["evidence_required"], true);
    }
}
