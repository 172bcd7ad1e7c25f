// SPDX-License-Identifier: MIT OR Apache-2.0
//! A frozen, ordered sequence of step names produced by resolving a policy.
//! The graph itself is stateless; [`det_loop`] and the engine runner consult
//! it for position queries but never mutate it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use det_error::{DetError, DetResult, ErrorCode};

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::PolicyError, message)
}

/// A linear, frozen ordering of step names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionGraph {
    steps: Vec<String>,
}

impl ExecutionGraph {
    /// The graph's step names, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Number of steps in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// `true` iff the graph has no steps. `build_linear_graph` never
    /// produces one of these; this exists for completeness/clippy parity
    /// with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Position of `name` in the graph, if present.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s == name)
    }

    /// The step name at `index`, if in bounds.
    #[must_use]
    pub fn step_at(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// The step name immediately following `index`, if any.
    #[must_use]
    pub fn next_step(&self, index: usize) -> Option<&str> {
        self.steps.get(index + 1).map(String::as_str)
    }

    /// `true` iff `index` is the last position in the graph.
    #[must_use]
    pub fn is_terminal(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }
}

/// Build an [`ExecutionGraph`] from a resolved, already-validated step list.
///
/// # Errors
/// [`ErrorCode::PolicyError`] if `steps` is empty.
pub fn build_linear_graph(steps: Vec<String>) -> DetResult<ExecutionGraph> {
    if steps.is_empty() {
        return Err(err("cannot build an execution graph from an empty step list"));
    }
    Ok(ExecutionGraph { steps })
}

/// Return the set of step names that appear more than once in `steps`, in
/// first-seen order. Empty if every name is unique.
#[must_use]
pub fn validate_unique_steps(steps: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut duplicates = Vec::new();
    let mut reported = std::collections::BTreeSet::new();
    for step in steps {
        if !seen.insert(step.as_str()) && reported.insert(step.as_str()) {
            duplicates.push(step.clone());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn builds_from_nonempty_list() {
        let graph = build_linear_graph(names(&["Normalize", "Decompose"])).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.steps(), &["Normalize", "Decompose"]);
    }

    #[test]
    fn rejects_empty_list() {
        let err = build_linear_graph(vec![]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PolicyError);
    }

    #[test]
    fn index_of_and_next_step() {
        let graph = build_linear_graph(names(&["A", "B", "C"])).unwrap();
        assert_eq!(graph.index_of("B"), Some(1));
        assert_eq!(graph.index_of("Z"), None);
        assert_eq!(graph.next_step(0), Some("B"));
        assert_eq!(graph.next_step(2), None);
    }

    #[test]
    fn is_terminal_only_at_last_index() {
        let graph = build_linear_graph(names(&["A", "B", "C"])).unwrap();
        assert!(!graph.is_terminal(0));
        assert!(!graph.is_terminal(1));
        assert!(graph.is_terminal(2));
    }

    #[test]
    fn validate_unique_steps_reports_each_offender_once() {
        let dups = validate_unique_steps(&names(&["A", "B", "A", "C", "B", "A"]));
        assert_eq!(dups, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn validate_unique_steps_empty_for_distinct_names() {
        assert!(validate_unique_steps(&names(&["A", "B", "C"])).is_empty());
    }
}
