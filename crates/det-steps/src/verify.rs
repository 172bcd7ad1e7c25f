// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Verify`: checks that tasks were produced and, if evidence is required,
//! that some was gathered — either as a single aggregate check or per
//! named verification path.

use det_core::{ReasoningState, StepResult, VerificationPathConfig};
use det_error::DetResult;
use serde_json::{json, Value};

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

fn evidence_count(state: &ReasoningState) -> u64 {
    state
        .artifacts
        .get("evidence")
        .and_then(|v| v.get("evidence_count"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn default_evidence_required(state: &ReasoningState) -> bool {
    state.problem.settings.as_ref().and_then(|s| s.evidence_required).unwrap_or(false)
}

fn checks_for(tasks_present: bool, task_count: u64, evidence_present: bool, evidence_required: bool) -> Value {
    json!({
        "tasks_present": tasks_present,
        "task_count": task_count,
        "evidence_present": evidence_present,
        "evidence_required": evidence_required,
    })
}

fn passes(tasks_present: bool, evidence_present: bool, evidence_required: bool) -> bool {
    tasks_present && (!evidence_required || evidence_present)
}

fn verification_paths(state: &ReasoningState) -> Vec<VerificationPathConfig> {
    state.problem.settings.as_ref().and_then(|s| s.verification_paths.clone()).unwrap_or_default()
}

/// `{tasks}` → an aggregate or per-path verification report, artifact slot
/// `verification`. See [`crate`] module docs for the two output shapes.
///
/// # Errors
/// [`det_error::ErrorCode::Internal`] if `now` is blank.
pub fn verify(state: &ReasoningState, now: &str) -> DetResult<(ReasoningState, StepResult)> {
    require_non_empty_now(now)?;
    require_valid_state(state)?;

    let tasks = tasks(state);
    let tasks_present = !tasks.is_empty();
    let task_count = tasks.len() as u64;
    let input = json!({"tasks": tasks});

    let evidence_count = evidence_count(state);
    let evidence_present = evidence_count > 0;
    let default_required = default_evidence_required(state);
    let paths = verification_paths(state);

    let output = if paths.is_empty() {
        let status = if passes(tasks_present, evidence_present, default_required) {
            "passed"
        } else {
            "failed"
        };
        json!({
            "checks": checks_for(tasks_present, task_count, evidence_present, default_required),
            "status": status,
        })
    } else {
        let mut path_reports = Vec::with_capacity(paths.len());
        let mut failed_count = 0u64;
        for path in &paths {
            let evidence_required = path.evidence_required.unwrap_or(default_required);
            let ok = passes(tasks_present, evidence_present, evidence_required);
            if !ok {
                failed_count += 1;
            }
            path_reports.push(json!({
                "name": path.name,
                "checks": checks_for(tasks_present, task_count, evidence_present, evidence_required),
                "status": if ok { "passed" } else { "failed" },
            }));
        }
        json!({
            "paths": path_reports,
            "status": if failed_count == 0 { "passed" } else { "failed" },
            "total": paths.len() as u64,
            "failed_count": failed_count,
        })
    };

    let result = crate::success_result("Verify", &input, output.clone(), now)?;
    let new_state = advance_on_success(state.clone(), "verification", output, now)?;
    Ok((new_state, result))
}
