// SPDX-License-Identifier: MIT OR Apache-2.0
//! Orchestrates validation, policy/graph/loop resolution, and step
//! dispatch into a single deterministic execution. This is the runner
//! described as C8: everything else in this workspace is a pure function
//! or a read-only lookup; [`execute`] is the one place that threads state,
//! the loop cursor, and the trace chain together.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;

use det_core::{
    ProblemSpec, ReasoningState, StateMetadata, StateStatus, StepError, TraceRecord,
};
use det_error::{DetError, DetResult, ErrorCode};
use det_graph::ExecutionGraph;
use det_loop::{CursorAction, LoopBounds, LoopConfig};
use det_trace::TraceChain;

/// Engine version stamped on every trace header produced by this crate,
/// absent an explicit override.
pub const ENGINE_VERSION: &str = "1.0.0";

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::MaxStepsExceeded, message)
}

/// Caller-supplied overrides for an [`execute`] call. Every field defaults
/// per §4.8's preamble rules when `None`.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Overrides `spec.id` as the trace identifier.
    pub trace_id: Option<String>,
    /// Overrides [`ENGINE_VERSION`].
    pub engine_version: Option<String>,
    /// Overrides `spec.created_at` as the injected clock value.
    pub now: Option<String>,
}

/// The full result of one deterministic execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The trace identifier used (caller-supplied or `spec.id`).
    pub trace_id: String,
    /// The engine version recorded in the trace header.
    pub engine_version: String,
    /// The complete hash-chained trace, header first.
    pub trace: Vec<TraceRecord>,
    /// The state after the run completed or failed.
    pub final_state: ReasoningState,
}

fn required_step_count(steps_len: usize, bounds: Option<&LoopBounds>, config: Option<&LoopConfig>) -> usize {
    match (bounds, config) {
        (Some(bounds), Some(config)) if config.enabled => {
            steps_len + (config.max_iterations as usize - 1) * bounds.segment_length()
        }
        _ => steps_len,
    }
}

fn build_initial_state(
    spec: &ProblemSpec,
    trace_id: &str,
    now: &str,
) -> DetResult<ReasoningState> {
    let settings = spec.settings_or_default();
    let state = ReasoningState {
        version: det_core::SCHEMA_VERSION.to_string(),
        problem: spec.clone(),
        step_index: 0,
        status: StateStatus::Pending,
        artifacts: BTreeMap::new(),
        assumptions: Vec::new(),
        constraints: spec.inputs.constraints.clone().unwrap_or_default(),
        errors: Vec::new(),
        metadata: StateMetadata {
            trace_id: trace_id.to_string(),
            policy_profile: settings.policy_profile.clone(),
            model_profile: settings.model_profile.clone(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        },
    };
    det_validate::validate_state(&state)?;
    Ok(state)
}

/// Resolve the execution graph for `spec`, consulting the process-wide
/// policy registry for the named (or default) step list.
fn resolve_graph(spec: &ProblemSpec) -> DetResult<ExecutionGraph> {
    let settings = spec.settings_or_default();
    let steps =
        det_policy::global_registry().select(settings.policy_profile.as_deref(), det_steps::STEP_NAMES)?;
    det_graph::build_linear_graph(steps)
}

/// Run the full deterministic pipeline over `spec`.
///
/// # Errors
/// - [`ErrorCode::ValidationError`] if `spec` fails C2 validation.
/// - [`ErrorCode::PolicyError`] if policy/step resolution fails.
/// - [`ErrorCode::LoopConfigError`] if `settings.loop` fails to parse or
///   resolve against the selected steps.
/// - [`ErrorCode::MaxStepsExceeded`] if `settings.max_steps` is smaller
///   than the run would require.
pub fn execute(spec: ProblemSpec, opts: ExecuteOptions) -> DetResult<ExecutionResult> {
    det_validate::validate_problem_spec(&spec)?;

    let engine_version = opts.engine_version.unwrap_or_else(|| ENGINE_VERSION.to_string());
    let now = opts.now.unwrap_or_else(|| spec.created_at.clone());
    let trace_id = opts.trace_id.unwrap_or_else(|| spec.id.clone());

    tracing::debug!(target: "det.engine", trace_id = %trace_id, "resolving policy and graph");
    let graph = resolve_graph(&spec)?;

    let settings = spec.settings_or_default();
    let loop_config = settings.loop_config.as_ref().map(det_loop::parse_loop_config).transpose()?;
    let loop_bounds =
        loop_config.as_ref().map(|c| det_loop::resolve_bounds(&graph, c)).transpose()?;

    let required = required_step_count(graph.len(), loop_bounds.as_ref(), loop_config.as_ref());
    if let Some(max_steps) = settings.max_steps {
        if (max_steps as usize) < required {
            return Err(err(format!(
                "settings.max_steps ({max_steps}) is smaller than the {required} step(s) this run requires"
            ))
            .with_context("field", "settings.max_steps"));
        }
    }

    let mut state = build_initial_state(&spec, &trace_id, &now)?;

    let problem_spec_hash = det_core::hash_json(&spec)?;
    let initial_state_hash = det_core::hash_json(&state)?;
    let mut chain = TraceChain::new();
    chain.push(det_trace::build_header_record(
        det_core::SCHEMA_VERSION,
        &trace_id,
        &now,
        &engine_version,
        &problem_spec_hash,
        &initial_state_hash,
    )?);

    tracing::info!(target: "det.engine", trace_id = %trace_id, steps = graph.len(), "execution starting");

    let mut cursor = 0usize;
    let mut loop_iteration: u32 = 0;
    let mut failed = false;

    while cursor < graph.len() {
        let step_name = graph.step_at(cursor).expect("cursor is bounds-checked above").to_string();
        let handler = det_steps::step_handler(&step_name)
            .ok_or_else(|| DetError::new(ErrorCode::Internal, format!("no handler registered for step '{step_name}'")))?;

        let state_before = state.clone();
        let step_index_before = state_before.step_index;
        let state_before_hash = det_core::hash_json(&state_before)?;

        let (mut state_after, result) = handler(&state_before, &now)?;
        let step_failed = matches!(result.status, det_core::StepStatus::Failed);

        if step_failed {
            state_after.status = StateStatus::Failed;
            if let Some(errors) = &result.errors {
                state_after.errors.extend(errors.clone());
            }
            state_after.metadata.updated_at = now.clone();
            tracing::debug!(target: "det.engine", step = %step_name, "step failed");
        } else if let (Some(bounds), Some(_)) = (&loop_bounds, &loop_config) {
            if cursor == bounds.start_index && loop_iteration == 0 {
                loop_iteration = 1;
            }
        }

        let state_after_hash = det_core::hash_json(&state_after)?;
        chain.push(det_trace::build_step_record(
            chain.next_index(),
            step_index_before,
            result,
            &state_before_hash,
            &state_after_hash,
            chain.head_hash().expect("header is always pushed first"),
        )?);
        state = state_after;

        if step_failed {
            failed = true;
            break;
        }

        let mut advanced_by_control = false;
        if let (Some(bounds), Some(config)) = (&loop_bounds, &loop_config) {
            if config.enabled && cursor == bounds.end_index {
                let stop_holds = det_loop::evaluate_stop_condition(&state, &config.stop_condition);
                let action = det_loop::decide_cursor_action(stop_holds, loop_iteration, config.max_iterations);
                let state_hash = det_core::hash_json(&state)?;
                chain.push(det_trace::build_control_record(
                    chain.next_index(),
                    action.as_str(),
                    loop_iteration,
                    &config.start_step,
                    &config.end_step,
                    &config.stop_condition.path,
                    config.stop_condition.operator.as_str(),
                    config.stop_condition.value.clone(),
                    &state_hash,
                    chain.head_hash().expect("header is always pushed first"),
                )?);
                advanced_by_control = true;

                match action {
                    CursorAction::Stop => cursor = bounds.end_index + 1,
                    CursorAction::Repeat => {
                        cursor = bounds.start_index;
                        loop_iteration += 1;
                    }
                    CursorAction::MaxIterationsReached => {
                        failed = true;
                        state.status = StateStatus::Failed;
                        state.errors.push(StepError {
                            code: "loop_max_iterations_reached".to_string(),
                            message: format!(
                                "Loop stop condition not met after {loop_iteration} iteration(s)."
                            ),
                            step: Some(config.end_step.clone()),
                        });
                        state.metadata.updated_at = now.clone();
                    }
                }
            }
        }

        if failed {
            break;
        }
        if !advanced_by_control {
            cursor += 1;
        }
    }

    if !failed && state.status == StateStatus::Running {
        state.status = StateStatus::Completed;
        state.metadata.updated_at = now.clone();
    }

    tracing::info!(
        target: "det.engine",
        trace_id = %trace_id,
        status = ?state.status,
        records = chain.len(),
        "execution finished"
    );

    Ok(ExecutionResult { trace_id, engine_version, trace: chain.into_records(), final_state: state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use det_core::{ProblemInputs, ProblemSettings, RawLoopConfig, RawStopCondition};
    use serde_json::json;

    fn base_spec(prompt: &str) -> ProblemSpec {
        ProblemSpec {
            version: "1.0.0".to_string(),
            id: "req-1".to_string(),
            created_at: "2026-02-02T00:00:00Z".to_string(),
            inputs: ProblemInputs {
                prompt: prompt.to_string(),
                constraints: None,
                goals: None,
                context: None,
            },
            settings: None,
            provenance: None,
        }
    }

    #[test]
    fn minimal_happy_path_produces_eight_records() {
        let spec = base_spec("Hello world");
        let result = execute(spec, ExecuteOptions { trace_id: Some("trace-1".into()), ..Default::default() })
            .unwrap();
        assert_eq!(result.trace.len(), 8);
        assert_eq!(result.final_state.status, StateStatus::Completed);
        assert_eq!(result.final_state.step_index, 7);
        assert!(matches!(result.trace[0], TraceRecord::Header { .. }));
    }

    #[test]
    fn blank_prompt_fails_at_normalize_with_no_further_steps() {
        let spec = base_spec("   ");
        let result = execute(spec, ExecuteOptions::default()).unwrap();
        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.final_state.status, StateStatus::Failed);
        assert_eq!(result.final_state.errors[0].code, "invalid_prompt");
    }

    fn loop_spec(evidence_required: bool, max_iterations: u32, evidence: Option<Vec<&str>>) -> ProblemSpec {
        let mut spec = base_spec("Hello world");
        let mut context = None;
        if let Some(evidence) = evidence {
            let mut map = serde_json::Map::new();
            map.insert("evidence".to_string(), json!(evidence));
            context = Some(map);
        }
        spec.inputs.context = context;
        spec.settings = Some(ProblemSettings {
            evidence_required: Some(evidence_required),
            loop_config: Some(RawLoopConfig {
                enabled: None,
                start_step: "AcquireEvidence".to_string(),
                end_step: "Verify".to_string(),
                max_iterations,
                stop_condition: RawStopCondition {
                    path: "artifacts.verification.status".to_string(),
                    equals: Some(json!("passed")),
                    operator: None,
                    value: None,
                },
            }),
            ..Default::default()
        });
        spec
    }

    #[test]
    fn loop_stops_once_verification_passes() {
        let spec = loop_spec(false, 3, None);
        let result = execute(spec, ExecuteOptions::default()).unwrap();
        let controls: Vec<&str> = result
            .trace
            .iter()
            .filter_map(|r| match r {
                TraceRecord::Control { action, .. } => Some(action.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(controls, vec!["stop"]);
        assert_eq!(result.final_state.status, StateStatus::Completed);
    }

    #[test]
    fn loop_exhausts_when_evidence_never_arrives() {
        let spec = loop_spec(true, 2, None);
        let result = execute(spec, ExecuteOptions::default()).unwrap();
        let controls: Vec<&str> = result
            .trace
            .iter()
            .filter_map(|r| match r {
                TraceRecord::Control { action, .. } => Some(action.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(controls, vec!["repeat", "max_iterations_reached"]);
        assert_eq!(result.final_state.status, StateStatus::Failed);
        assert!(result.final_state.errors.iter().any(|e| e.code == "loop_max_iterations_reached"));
    }

    #[test]
    fn max_steps_guard_rejects_too_small_a_budget() {
        let mut spec = loop_spec(true, 2, None);
        if let Some(settings) = spec.settings.as_mut() {
            settings.max_steps = Some(5);
        }
        let err = execute(spec, ExecuteOptions::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MaxStepsExceeded);
    }

    /// Scenario 6 from `SPEC_FULL.md`: the header record, for fixed inputs,
    /// must be reproducible byte-for-byte from the chain-construction
    /// primitives alone — not merely from a second call to [`execute`]. This
    /// is what makes a committed golden NDJSON fixture meaningful: the bytes
    /// `detctl check-determinism` diffs against are exactly what
    /// `det_trace::build_header_record` produces for these inputs, with no
    /// hidden dependency on wall-clock time or host iteration order.
    #[test]
    fn golden_header_is_independently_reproducible() {
        let spec = base_spec("Hello world");
        let opts = ExecuteOptions {
            trace_id: Some("golden-trace".into()),
            now: Some("2026-01-01T00:00:00Z".into()),
            engine_version: Some("1.0.0".into()),
        };
        let result = execute(spec.clone(), opts).unwrap();

        let state = build_initial_state(&spec, "golden-trace", "2026-01-01T00:00:00Z").unwrap();
        let problem_spec_hash = det_core::hash_json(&spec).unwrap();
        let initial_state_hash = det_core::hash_json(&state).unwrap();
        let expected_header = det_trace::build_header_record(
            det_core::SCHEMA_VERSION,
            "golden-trace",
            "2026-01-01T00:00:00Z",
            "1.0.0",
            &problem_spec_hash,
            &initial_state_hash,
        )
        .unwrap();

        let rendered_actual = det_trace::render_ndjson(&result.trace[..1]).unwrap();
        let rendered_expected = det_trace::render_ndjson(std::slice::from_ref(&expected_header)).unwrap();
        assert_eq!(rendered_actual, rendered_expected);
    }

    #[test]
    fn two_runs_with_identical_inputs_are_byte_identical() {
        let spec_a = base_spec("Hello world");
        let spec_b = base_spec("Hello world");
        let opts = || ExecuteOptions { trace_id: Some("trace-1".into()), now: Some("2026-02-02T00:00:00Z".into()), ..Default::default() };
        let result_a = execute(spec_a, opts()).unwrap();
        let result_b = execute(spec_b, opts()).unwrap();
        let ndjson_a = det_trace::render_ndjson(&result_a.trace).unwrap();
        let ndjson_b = det_trace::render_ndjson(&result_b.trace).unwrap();
        assert_eq!(ndjson_a, ndjson_b);
    }
}
