// SPDX-License-Identifier: MIT OR Apache-2.0
//! Relational schema validation: checks that depend on more than one field,
//! or that enforce an invariant across a whole document. Primitive shape
//! checks (see [`crate::primitive`]) are assumed to have already passed;
//! this layer builds on top of them.

use det_core::{ProblemSpec, ReasoningState, StepResult, StepStatus};
use det_error::{DetError, DetResult, ErrorCode};

use crate::primitive::{all_non_blank, is_iso8601_utc, is_non_blank, is_semver_major_1};

fn err(field: &str, message: impl Into<String>) -> DetError {
    DetError::validation(field, message)
}

/// Validate a [`ProblemSpec`] against the relational rules: semver major
/// must be `1`, `id` non-blank, `created_at` a strict ISO-8601 UTC
/// timestamp, and any present `constraints`/`goals`/`verification_paths`
/// entries non-blank.
///
/// Deliberately does **not** reject a blank `inputs.prompt` — that is
/// `Normalize`'s own documented failure mode, not a boundary validation
/// error, so a blank prompt must be allowed to reach the step handler.
///
/// # Errors
/// [`ErrorCode::ValidationError`] with a dotted field path.
pub fn validate_problem_spec(spec: &ProblemSpec) -> DetResult<()> {
    if !is_semver_major_1(&spec.version) {
        return Err(err("version", format!("expected a 1.x.y semver string, got {:?}", spec.version)));
    }
    if !is_non_blank(&spec.id) {
        return Err(err("id", "must be a non-blank string"));
    }
    if !is_iso8601_utc(&spec.created_at) {
        return Err(err("created_at", "must match YYYY-MM-DDTHH:MM:SSZ"));
    }
    if let Some(constraints) = &spec.inputs.constraints {
        if !all_non_blank(constraints.iter().map(String::as_str)) {
            return Err(err("inputs.constraints", "entries must be non-blank strings"));
        }
    }
    if let Some(goals) = &spec.inputs.goals {
        if !all_non_blank(goals.iter().map(String::as_str)) {
            return Err(err("inputs.goals", "entries must be non-blank strings"));
        }
    }
    if let Some(settings) = &spec.settings {
        if let Some(max_steps) = settings.max_steps {
            if max_steps == 0 {
                return Err(err("settings.max_steps", "must be greater than zero"));
            }
        }
        if let Some(policy_profile) = &settings.policy_profile {
            if !is_non_blank(policy_profile) {
                return Err(err("settings.policy_profile", "must be non-blank if present"));
            }
        }
        if let Some(model_profile) = &settings.model_profile {
            if !is_non_blank(model_profile) {
                return Err(err("settings.model_profile", "must be non-blank if present"));
            }
        }
        if let Some(paths) = &settings.verification_paths {
            for (i, path) in paths.iter().enumerate() {
                if !is_non_blank(&path.name) {
                    return Err(err(format!("settings.verification_paths[{i}].name"), "must be non-blank"));
                }
            }
        }
    }
    Ok(())
}

/// Validate a [`ReasoningState`]'s own well-formedness: semver, timestamps,
/// and metadata shape. Does not re-validate the embedded `problem`.
///
/// # Errors
/// [`ErrorCode::ValidationError`] with a dotted field path.
pub fn validate_state(state: &ReasoningState) -> DetResult<()> {
    if !is_semver_major_1(&state.version) {
        return Err(err("version", format!("expected a 1.x.y semver string, got {:?}", state.version)));
    }
    if !is_non_blank(&state.metadata.trace_id) {
        return Err(err("metadata.trace_id", "must be non-blank"));
    }
    if !is_iso8601_utc(&state.metadata.created_at) {
        return Err(err("metadata.created_at", "must match YYYY-MM-DDTHH:MM:SSZ"));
    }
    if !is_iso8601_utc(&state.metadata.updated_at) {
        return Err(err("metadata.updated_at", "must match YYYY-MM-DDTHH:MM:SSZ"));
    }
    Ok(())
}

/// Validate a [`StepResult`]'s internal invariant: `success` implies
/// `output` present and `errors` absent; `failed` implies `errors` present
/// and non-empty and `output` absent; `skipped` implies neither present.
///
/// # Errors
/// [`ErrorCode::ValidationError`] describing the mismatch.
pub fn validate_step_result(result: &StepResult) -> DetResult<()> {
    if !is_semver_major_1(&result.version) {
        return Err(err("version", format!("expected a 1.x.y semver string, got {:?}", result.version)));
    }
    if !is_non_blank(&result.input_hash) {
        return Err(err("input_hash", "must be non-blank"));
    }
    if !is_non_blank(&result.output_hash) {
        return Err(err("output_hash", "must be non-blank"));
    }
    if !is_iso8601_utc(&result.started_at) {
        return Err(err("started_at", "must match YYYY-MM-DDTHH:MM:SSZ"));
    }
    if !is_iso8601_utc(&result.finished_at) {
        return Err(err("finished_at", "must match YYYY-MM-DDTHH:MM:SSZ"));
    }
    match result.status {
        StepStatus::Success => {
            if result.output.is_none() {
                return Err(err("output", "required when status is success"));
            }
            if result.errors.is_some() {
                return Err(err("errors", "must be absent when status is success"));
            }
        }
        StepStatus::Failed => {
            match &result.errors {
                None => return Err(err("errors", "required when status is failed")),
                Some(errors) if errors.is_empty() => {
                    return Err(err("errors", "must be non-empty when status is failed"))
                }
                Some(_) => {}
            }
            if result.output.is_some() {
                return Err(err("output", "must be absent when status is failed"));
            }
        }
        StepStatus::Skipped => {
            if result.output.is_some() {
                return Err(err("output", "must be absent when status is skipped"));
            }
            if result.errors.is_some() {
                return Err(err("errors", "must be absent when status is skipped"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use det_core::{ProblemInputs, StepError};

    fn base_spec() -> ProblemSpec {
        ProblemSpec {
            version: "1.0.0".into(),
            id: "req-1".into(),
            created_at: "2026-02-02T00:00:00Z".into(),
            inputs: ProblemInputs {
                prompt: "Hello world".into(),
                constraints: None,
                goals: None,
                context: None,
            },
            settings: None,
            provenance: None,
        }
    }

    #[test]
    fn accepts_minimal_spec() {
        assert!(validate_problem_spec(&base_spec()).is_ok());
    }

    #[test]
    fn rejects_wrong_major_version() {
        let mut spec = base_spec();
        spec.version = "2.0.0".into();
        let err = validate_problem_spec(&spec).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.context().get("field").unwrap(), "version");
    }

    #[test]
    fn rejects_blank_id_but_allows_blank_prompt() {
        let mut spec = base_spec();
        spec.id = "   ".into();
        assert!(validate_problem_spec(&spec).is_err());

        let mut spec = base_spec();
        spec.inputs.prompt = "   ".into();
        assert!(
            validate_problem_spec(&spec).is_ok(),
            "blank prompt is Normalize's failure mode, not a validation error"
        );
    }

    #[test]
    fn rejects_zero_max_steps() {
        let mut spec = base_spec();
        spec.settings = Some(det_core::ProblemSettings {
            max_steps: Some(0),
            ..Default::default()
        });
        assert!(validate_problem_spec(&spec).is_err());
    }

    fn success_result() -> StepResult {
        StepResult {
            version: "1.0.0".into(),
            step: "Normalize".into(),
            status: StepStatus::Success,
            input_hash: "a".into(),
            output_hash: "b".into(),
            started_at: "2026-02-02T00:00:00Z".into(),
            finished_at: "2026-02-02T00:00:00Z".into(),
            output: Some(serde_json::json!({})),
            errors: None,
        }
    }

    #[test]
    fn success_requires_output_and_rejects_errors() {
        assert!(validate_step_result(&success_result()).is_ok());

        let mut r = success_result();
        r.output = None;
        assert!(validate_step_result(&r).is_err());

        let mut r = success_result();
        r.errors = Some(vec![]);
        assert!(validate_step_result(&r).is_err());
    }

    #[test]
    fn failed_requires_nonempty_errors_and_rejects_output() {
        let mut r = success_result();
        r.status = StepStatus::Failed;
        r.output = None;
        r.errors = Some(vec![StepError {
            code: "invalid_prompt".into(),
            message: "prompt is required".into(),
            step: None,
        }]);
        assert!(validate_step_result(&r).is_ok());

        let mut r = success_result();
        r.status = StepStatus::Failed;
        r.errors = Some(vec![]);
        assert!(validate_step_result(&r).is_err());
    }

    #[test]
    fn skipped_rejects_both_output_and_errors() {
        let mut r = success_result();
        r.status = StepStatus::Skipped;
        r.output = None;
        assert!(validate_step_result(&r).is_ok());

        let mut r = success_result();
        r.status = StepStatus::Skipped;
        assert!(validate_step_result(&r).is_err());
    }
}
