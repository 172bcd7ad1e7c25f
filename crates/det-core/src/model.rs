// SPDX-License-Identifier: MIT OR Apache-2.0
//! The data model: [`ProblemSpec`] (caller-owned input), [`ReasoningState`]
//! (evolved per step), [`StepResult`] (per-step outcome), and
//! [`TraceRecord`] (the append-only trace's tagged union).

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Orchestration mode a problem spec was authored against. The engine core
/// only executes the `native` path; `adapter` is accepted so the document
/// round-trips through callers that hand it to an external orchestration
/// collaborator untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationFramework {
    /// Executed directly by this engine.
    Native,
    /// Handed off to an external adapter; the core still validates shape.
    Adapter,
}

/// One named evidence path checked independently by the `Verify` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationPathConfig {
    /// Path name, echoed back in the per-path verification report.
    pub name: String,
    /// Overrides `settings.evidence_required` for this path only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_required: Option<bool>,
}

/// `settings.loop.stop_condition`, as received on the wire. Exactly one of
/// the two supported shapes (`equals` or `operator`+`value`) is populated;
/// `det-loop` is responsible for enforcing that exclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawStopCondition {
    /// Dotted path into the state, e.g. `artifacts.verification.status`.
    pub path: String,
    /// Equality shorthand: `{path, equals}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    /// Explicit operator: `{path, operator, value}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Right-hand value for `operator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Raw `settings.loop` block, as received on the wire. See `det-loop` for
/// the parsed, validated [`crate` consumer]-facing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawLoopConfig {
    /// Whether the loop segment is active at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// First step name of the repeating segment (inclusive).
    pub start_step: String,
    /// Last step name of the repeating segment (inclusive).
    pub end_step: String,
    /// Maximum number of times the segment may run.
    pub max_iterations: u32,
    /// Predicate checked after each pass through the segment.
    pub stop_condition: RawStopCondition,
}

/// `inputs.*` of a [`ProblemSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProblemInputs {
    /// The task prompt. Must be non-blank after trimming.
    pub prompt: String,
    /// Optional caller-supplied constraints, seeded verbatim into state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    /// Optional ordered goals; drives `Decompose` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    /// Free-form auxiliary input, including `context.evidence` consumed by
    /// `AcquireEvidence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// `settings.*` of a [`ProblemSpec`]. Entirely optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProblemSettings {
    /// Whether `Verify` requires non-empty evidence to pass by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_required: Option<bool>,
    /// Upper bound on total steps this run may execute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Name of the policy to select the step list from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_profile: Option<String>,
    /// Opaque model profile name, carried through unexamined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_profile: Option<String>,
    /// How this spec is meant to be orchestrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestration_framework: Option<OrchestrationFramework>,
    /// Independent evidence paths checked by `Verify`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_paths: Option<Vec<VerificationPathConfig>>,
    /// Optional repeat-until-stop control over a step segment.
    #[serde(default, rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_config: Option<RawLoopConfig>,
}

/// The caller-supplied, immutable problem specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProblemSpec {
    /// Semver string; major component must equal `1`.
    pub version: String,
    /// Non-empty identifier; doubles as the default trace id.
    pub id: String,
    /// ISO-8601 UTC creation timestamp, `YYYY-MM-DDTHH:MM:SSZ`.
    pub created_at: String,
    /// Task inputs.
    pub inputs: ProblemInputs,
    /// Optional execution settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProblemSettings>,
    /// Opaque caller-supplied provenance, carried through unexamined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
}

impl ProblemSpec {
    /// `settings`, defaulted if the caller omitted it.
    #[must_use]
    pub fn settings_or_default(&self) -> ProblemSettings {
        self.settings.clone().unwrap_or_default()
    }
}

/// Lifecycle status of a [`ReasoningState`]. Monotonic: `Pending` →
/// `Running` → `{Completed, Failed}`; no transition leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    /// Constructed but not yet stepped.
    Pending,
    /// At least one step has executed successfully.
    Running,
    /// A step failed or a loop exhausted its iterations.
    Failed,
    /// All steps in the resolved policy ran to completion.
    Completed,
}

/// One error recorded against a state or a failed step result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepError {
    /// Stable error code, e.g. `invalid_prompt` or `loop_max_iterations_reached`.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
    /// The step this error originated from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

/// `state.metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateMetadata {
    /// Trace identifier this state belongs to.
    pub trace_id: String,
    /// Selected policy name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_profile: Option<String>,
    /// Selected model profile, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_profile: Option<String>,
    /// Timestamp the state was first constructed.
    pub created_at: String,
    /// Timestamp of the most recent step.
    pub updated_at: String,
}

/// The evolving state threaded through step execution. Every step returns a
/// new value rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReasoningState {
    /// State schema version (semver).
    pub version: String,
    /// Deep copy of the originating spec.
    pub problem: ProblemSpec,
    /// Number of steps that have completed successfully.
    pub step_index: u32,
    /// Current lifecycle status.
    pub status: StateStatus,
    /// Named outputs deposited by steps. Stored as a `BTreeMap` so key order
    /// can never depend on the host's native map iteration order.
    pub artifacts: BTreeMap<String, Value>,
    /// Assumptions accumulated during execution.
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// Constraints, seeded from `inputs.constraints`.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Errors accumulated during execution.
    #[serde(default)]
    pub errors: Vec<StepError>,
    /// Execution metadata.
    pub metadata: StateMetadata,
}

/// Per-step outcome: exactly one of `output` (on success) or `errors` (on
/// failure) is present; `skipped` carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step ran and produced output.
    Success,
    /// The step ran and failed.
    Failed,
    /// The step was not executed this pass.
    Skipped,
}

/// The per-step record appended to the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepResult {
    /// Result schema version (semver).
    pub version: String,
    /// Step name, e.g. `Normalize`.
    pub step: String,
    /// Outcome of this step.
    pub status: StepStatus,
    /// `hash_json` of the step's fixed input payload.
    pub input_hash: String,
    /// `hash_json` of the step's fixed output payload (or `{}` on failure).
    pub output_hash: String,
    /// Timestamp the step began (equal to `finished_at`; no internal clock).
    pub started_at: String,
    /// Timestamp the step completed.
    pub finished_at: String,
    /// Present iff `status == success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Present iff `status == failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<StepError>>,
}

/// One entry of the append-only execution trace. `record_hash` is always
/// computed last, over the record with that field removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    /// The first record of every trace; anchors the hash chain.
    Header {
        /// Trace schema version (semver).
        version: String,
        /// Trace identifier.
        trace_id: String,
        /// Timestamp the trace was opened.
        created_at: String,
        /// Engine version that produced this trace.
        engine_version: String,
        /// Always `"sha256"`.
        hash_algorithm: String,
        /// Always `"json-c14n-v1"`.
        canonicalization: String,
        /// `hash_json` of the originating [`ProblemSpec`].
        problem_spec_hash: String,
        /// `hash_json` of the freshly-constructed initial [`ReasoningState`].
        initial_state_hash: String,
        /// Fixed-point hash of this record.
        record_hash: String,
    },
    /// One step's outcome, chained to its predecessor.
    Step {
        /// Position in the trace; header is conceptually index 0.
        index: u64,
        /// `state.step_index` observed before this step ran.
        step_index: u32,
        /// The step's own result.
        result: StepResult,
        /// `hash_json` of the state before this step ran.
        state_before_hash: String,
        /// `hash_json` of the state after this step ran.
        state_after_hash: String,
        /// `record_hash` of the previous trace record.
        prev_hash: String,
        /// Fixed-point hash of this record.
        record_hash: String,
    },
    /// A loop-controller decision (stop, repeat, or iteration exhaustion).
    Control {
        /// Position in the trace.
        index: u64,
        /// Always `"loop"` for now; reserved for future control kinds.
        control_type: String,
        /// `"stop"`, `"repeat"`, or `"max_iterations_reached"`.
        action: String,
        /// 1-based count of loop passes completed so far.
        loop_iteration: u32,
        /// The loop segment's first step.
        start_step: String,
        /// The loop segment's last step.
        end_step: String,
        /// Dotted path the stop predicate was evaluated against.
        stop_path: String,
        /// Operator used by the stop predicate.
        stop_operator: String,
        /// Right-hand value of the stop predicate.
        stop_value: Value,
        /// `hash_json` of the state at the time this decision was made.
        state_hash: String,
        /// `record_hash` of the previous trace record.
        prev_hash: String,
        /// Fixed-point hash of this record.
        record_hash: String,
    },
}

impl TraceRecord {
    /// This record's own `record_hash`, regardless of variant.
    #[must_use]
    pub fn record_hash(&self) -> &str {
        match self {
            TraceRecord::Header { record_hash, .. }
            | TraceRecord::Step { record_hash, .. }
            | TraceRecord::Control { record_hash, .. } => record_hash,
        }
    }

    /// This record's position in the trace (`0` for the header).
    #[must_use]
    pub fn index(&self) -> u64 {
        match self {
            TraceRecord::Header { .. } => 0,
            TraceRecord::Step { index, .. } | TraceRecord::Control { index, .. } => *index,
        }
    }
}
