// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop-with-stop-condition control flow: parsing `settings.loop`, resolving
//! its step bounds against the execution graph, and evaluating the stop
//! predicate against a [`ReasoningState`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use det_core::{RawLoopConfig, ReasoningState};
use det_error::{DetError, DetResult, ErrorCode};
use det_graph::ExecutionGraph;
use serde_json::Value;

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::LoopConfigError, message)
}

/// The comparison applied by a [`StopCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Structural equality.
    Equals,
    /// Structural inequality.
    NotEquals,
    /// Greater-than, integers only.
    Gt,
    /// Greater-than-or-equal, integers only.
    Gte,
    /// Less-than, integers only.
    Lt,
    /// Less-than-or-equal, integers only.
    Lte,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "equals" => Some(Self::Equals),
            "not_equals" => Some(Self::NotEquals),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    /// `true` iff this operator requires both sides to be integers.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        !matches!(self, Self::Equals | Self::NotEquals)
    }

    /// The wire form of this operator, as recorded on a control record.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

/// A parsed, validated stop predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct StopCondition {
    /// Dotted path into the state; always starts with `artifacts.`.
    pub path: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Right-hand side value.
    pub value: Value,
}

/// A parsed, validated `settings.loop` block.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Whether the loop segment is active.
    pub enabled: bool,
    /// First step name of the repeating segment (inclusive).
    pub start_step: String,
    /// Last step name of the repeating segment (inclusive).
    pub end_step: String,
    /// Maximum number of passes through the segment.
    pub max_iterations: u32,
    /// Predicate checked after each pass.
    pub stop_condition: StopCondition,
}

/// Resolved step-index bounds of a loop segment within an
/// [`ExecutionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBounds {
    /// Index of `start_step` in the graph.
    pub start_index: usize,
    /// Index of `end_step` in the graph.
    pub end_index: usize,
}

impl LoopBounds {
    /// Number of steps in the inclusive segment `[start_index, end_index]`.
    #[must_use]
    pub fn segment_length(self) -> usize {
        self.end_index - self.start_index + 1
    }
}

fn is_non_boolean_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Parse and validate a raw `settings.loop` block.
///
/// # Errors
/// [`ErrorCode::LoopConfigError`] if the stop condition's shape is
/// malformed (neither `equals` nor `operator`+`value` populated, an unknown
/// operator, a non-`artifacts.`-prefixed path, or a comparison operator
/// paired with a non-integer or boolean value).
pub fn parse_loop_config(raw: &RawLoopConfig) -> DetResult<LoopConfig> {
    if !raw.stop_condition.path.starts_with("artifacts.") {
        return Err(err("stop_condition.path must start with 'artifacts.'")
            .with_context("field", "settings.loop.stop_condition.path"));
    }

    let (operator, value) = match (&raw.stop_condition.equals, &raw.stop_condition.operator, &raw.stop_condition.value) {
        (Some(v), None, None) => (Operator::Equals, v.clone()),
        (None, Some(op), Some(v)) => {
            let operator = Operator::parse(op).ok_or_else(|| {
                err(format!("unknown stop_condition operator '{op}'"))
                    .with_context("field", "settings.loop.stop_condition.operator")
            })?;
            if operator.is_comparison() && is_non_boolean_integer(v).is_none() {
                return Err(err("comparison operators require an integer (non-boolean) value")
                    .with_context("field", "settings.loop.stop_condition.value"));
            }
            (operator, v.clone())
        }
        _ => {
            return Err(err(
                "stop_condition must be exactly one of {path, equals} or {path, operator, value}",
            ))
        }
    };

    if raw.max_iterations < 1 {
        return Err(err("max_iterations must be at least 1")
            .with_context("field", "settings.loop.max_iterations"));
    }

    Ok(LoopConfig {
        enabled: raw.enabled.unwrap_or(true),
        start_step: raw.start_step.clone(),
        end_step: raw.end_step.clone(),
        max_iterations: raw.max_iterations,
        stop_condition: StopCondition { path: raw.stop_condition.path.clone(), operator, value },
    })
}

/// Resolve `config`'s `start_step`/`end_step` against `graph`.
///
/// # Errors
/// [`ErrorCode::LoopConfigError`] if either step name is missing from the
/// graph, or `start_step` sorts after `end_step`.
pub fn resolve_bounds(graph: &ExecutionGraph, config: &LoopConfig) -> DetResult<LoopBounds> {
    let start_index = graph.index_of(&config.start_step).ok_or_else(|| {
        err(format!("loop start_step '{}' is not in the resolved step list", config.start_step))
            .with_context("field", "settings.loop.start_step")
    })?;
    let end_index = graph.index_of(&config.end_step).ok_or_else(|| {
        err(format!("loop end_step '{}' is not in the resolved step list", config.end_step))
            .with_context("field", "settings.loop.end_step")
    })?;
    if start_index > end_index {
        return Err(err("loop start_step must not come after end_step in the resolved step list")
            .with_context("field", "settings.loop"));
    }
    Ok(LoopBounds { start_index, end_index })
}

/// Walk `path`'s dotted segments into `value`, descending into objects only.
/// Returns `None` (absent) the moment a segment is missing or the current
/// value is not an object — including arrays, per this workspace's decision
/// not to support list indexing.
#[must_use]
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Evaluate `condition` against `state`. Never errors: an absent path or a
/// type mismatch on a comparison operator both yield `false`, per spec.
#[must_use]
pub fn evaluate_stop_condition(state: &ReasoningState, condition: &StopCondition) -> bool {
    let state_json = serde_json::to_value(state).unwrap_or(Value::Null);
    let Some(left) = resolve_path(&state_json, &condition.path) else {
        return false;
    };
    match condition.operator {
        Operator::Equals => *left == condition.value,
        Operator::NotEquals => *left != condition.value,
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let (Some(l), Some(r)) = (is_non_boolean_integer(left), is_non_boolean_integer(&condition.value)) else {
                return false;
            };
            match condition.operator {
                Operator::Gt => l > r,
                Operator::Gte => l >= r,
                Operator::Lt => l < r,
                Operator::Lte => l <= r,
                Operator::Equals | Operator::NotEquals => unreachable!(),
            }
        }
    }
}

/// The decision made after a loop segment's last step finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAction {
    /// Stop predicate held; the cursor advances past the segment.
    Stop,
    /// Stop predicate did not hold and iterations remain; cursor rewinds.
    Repeat,
    /// Iterations exhausted without the stop predicate holding; run fails.
    MaxIterationsReached,
}

impl CursorAction {
    /// The wire form recorded as a control record's `action`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Repeat => "repeat",
            Self::MaxIterationsReached => "max_iterations_reached",
        }
    }
}

/// Decide the cursor action given the current 1-based iteration count,
/// whether the stop predicate held, and the configured `max_iterations`.
#[must_use]
pub fn decide_cursor_action(stop_holds: bool, iteration: u32, max_iterations: u32) -> CursorAction {
    if stop_holds {
        CursorAction::Stop
    } else if iteration < max_iterations {
        CursorAction::Repeat
    } else {
        CursorAction::MaxIterationsReached
    }
}
