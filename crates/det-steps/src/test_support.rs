// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for step-handler unit tests.
#![cfg(test)]

use std::collections::BTreeMap;

use det_core::{
    ProblemInputs, ProblemSettings, ProblemSpec, ReasoningState, StateMetadata, StateStatus,
};

pub(crate) fn spec_with_prompt(prompt: &str) -> ProblemSpec {
    ProblemSpec {
        version: "1.0.0".into(),
        id: "req-1".into(),
        created_at: "2026-02-02T00:00:00Z".into(),
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

pub(crate) fn base_state(prompt: &str) -> ReasoningState {
    ReasoningState {
        version: "1.0.0".into(),
        problem: spec_with_prompt(prompt),
        step_index: 0,
        status: StateStatus::Pending,
        artifacts: BTreeMap::new(),
        assumptions: Vec::new(),
        constraints: Vec::new(),
        errors: Vec::new(),
        metadata: StateMetadata {
            trace_id: "trace-1".into(),
            policy_profile: None,
            model_profile: None,
            created_at: "2026-02-02T00:00:00Z".into(),
            updated_at: "2026-02-02T00:00:00Z".into(),
        },
    }
}

pub(crate) const NOW: &str = "2026-02-02T00:00:00Z";

#[allow(dead_code)]
pub(crate) fn settings_mut(state: &mut ReasoningState) -> &mut ProblemSettings {
    if state.problem.settings.is_none() {
        state.problem.settings = Some(ProblemSettings::default());
    }
    state.problem.settings.as_mut().expect("just set")
}
