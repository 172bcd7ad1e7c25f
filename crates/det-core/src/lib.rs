// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON, hashing, and the core data model shared by every crate
//! in the determinism engine workspace.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod canonical;
mod model;

pub use canonical::{canonical_json, canonical_json_bytes, compute_record_hash, hash_json, sha256_hex};
pub use model::{
    OrchestrationFramework, ProblemInputs, ProblemSettings, ProblemSpec, RawLoopConfig,
    RawStopCondition, ReasoningState, StateMetadata, StateStatus, StepError, StepResult,
    StepStatus, TraceRecord, VerificationPathConfig,
};

/// Schema version stamped on every [`ProblemSpec`], [`ReasoningState`], and
/// [`StepResult`] produced by this engine.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// `hash_algorithm` recorded on every trace header.
pub const HASH_ALGORITHM: &str = "sha256";

/// `canonicalization` recorded on every trace header.
pub const CANONICALIZATION: &str = "json-c14n-v1";
