// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-wide registry of named, ordered step lists ("policies").
//!
//! The registry is populated once at startup (typically via
//! [`register_builtin_policies`] plus any caller-supplied
//! [`PolicyRegistry::register`] calls) and is read-only thereafter. Readers
//! never take a write lock; the only writer is registration, which happens
//! before any execution begins.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};

use det_error::{DetError, DetResult, ErrorCode};

/// Name of the built-in policy selected when a spec does not name one.
pub const DEFAULT_POLICY_NAME: &str = "default";

/// The built-in `default` policy's step list, in execution order.
pub const DEFAULT_POLICY_STEPS: &[&str] = &[
    "Normalize",
    "Decompose",
    "AcquireEvidence",
    "Compute",
    "Verify",
    "Synthesize",
    "Audit",
];

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::PolicyError, message)
}

/// A process-wide, initialize-once mapping from policy name to ordered step
/// list. Safe for concurrent readers once construction (registration) is
/// complete.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: RwLock<BTreeMap<String, Vec<String>>>,
}

impl PolicyRegistry {
    /// A fresh, empty registry with no policies registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a named, ordered step list.
    ///
    /// # Errors
    /// [`ErrorCode::PolicyError`] if `name` is already registered.
    pub fn register(&self, name: impl Into<String>, steps: Vec<String>) -> DetResult<()> {
        let name = name.into();
        let mut policies = self.policies.write().expect("policy registry lock poisoned");
        if policies.contains_key(&name) {
            return Err(err(format!("policy '{name}' is already registered"))
                .with_context("policy", name.clone()));
        }
        policies.insert(name, steps);
        Ok(())
    }

    /// Look up a policy's step list by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<String>> {
        self.policies.read().expect("policy registry lock poisoned").get(name).cloned()
    }

    /// Names of every registered policy, in lexicographic order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.policies.read().expect("policy registry lock poisoned").keys().cloned().collect()
    }

    /// Select a policy's step list per `settings.policy_profile`: the named
    /// policy if `profile` is `Some` and non-empty, else
    /// [`DEFAULT_POLICY_NAME`]. The resolved list is validated: non-empty,
    /// every step name known to `known_steps`, and no duplicates.
    ///
    /// # Errors
    /// [`ErrorCode::PolicyError`] if the named policy is unregistered, the
    /// resolved list is empty, contains an unknown step, or contains a
    /// duplicate.
    pub fn select(&self, profile: Option<&str>, known_steps: &[&str]) -> DetResult<Vec<String>> {
        let name = match profile {
            Some(p) if !p.trim().is_empty() => p,
            _ => DEFAULT_POLICY_NAME,
        };
        let steps = self
            .get(name)
            .ok_or_else(|| err(format!("unknown policy '{name}'")).with_context("policy", name))?;
        validate_step_list(&steps, known_steps).map_err(|e| e.with_context("policy", name))?;
        Ok(steps)
    }
}

/// Validate that `steps` is non-empty, every entry is present in
/// `known_steps`, and no entry repeats.
///
/// # Errors
/// [`ErrorCode::PolicyError`] describing the first violation found.
pub fn validate_step_list(steps: &[String], known_steps: &[&str]) -> DetResult<()> {
    if steps.is_empty() {
        return Err(err("policy step list must be non-empty"));
    }
    let mut seen = std::collections::BTreeSet::new();
    for step in steps {
        if !seen.insert(step.as_str()) {
            return Err(err(format!("duplicate step '{step}' in policy step list"))
                .with_context("step", step.clone()));
        }
        if !known_steps.contains(&step.as_str()) {
            return Err(err(format!("unknown step '{step}' in policy step list"))
                .with_context("step", step.clone()));
        }
    }
    Ok(())
}

/// Register the built-in `default` policy into `registry`. Idempotent only
/// in the sense that calling it twice on the same registry returns the
/// second call's [`ErrorCode::PolicyError`]; callers own the registry's
/// lifetime and should register built-ins exactly once at startup.
///
/// # Errors
/// [`ErrorCode::PolicyError`] if `default` is already registered.
pub fn register_builtin_policies(registry: &PolicyRegistry) -> DetResult<()> {
    registry.register(
        DEFAULT_POLICY_NAME,
        DEFAULT_POLICY_STEPS.iter().map(|s| (*s).to_string()).collect(),
    )
}

static GLOBAL_REGISTRY: OnceLock<PolicyRegistry> = OnceLock::new();

/// The process-wide [`PolicyRegistry`], initialized on first access with the
/// built-in `default` policy registered.
#[must_use]
pub fn global_registry() -> &'static PolicyRegistry {
    GLOBAL_REGISTRY.get_or_init(|| {
        let registry = PolicyRegistry::new();
        register_builtin_policies(&registry).expect("built-in policy registration cannot fail");
        registry
    })
}
