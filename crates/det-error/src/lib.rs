// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared error taxonomy for the determinism engine workspace.
//!
//! Every fallible operation in this workspace — validation, policy
//! resolution, loop control, canonicalization, step execution, the engine
//! runner, and configuration loading — raises a [`DetError`] carrying one
//! stable, machine-readable [`ErrorCode`]. There is exactly one error type
//! crossing crate boundaries in this codebase; callers match on `code()`
//! rather than on `Display` text.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// Broad family an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Shape/field/relational validation of a spec, state, or step result.
    Validation,
    /// Policy registry lookups and step-list resolution.
    Policy,
    /// Loop configuration parsing, bounds resolution, stop evaluation.
    Loop,
    /// Canonicalization and hashing.
    Canonicalization,
    /// Step handler execution failures.
    Step,
    /// Engine-runner level preamble/orchestration failures.
    Engine,
    /// `.env`/environment configuration.
    Config,
    /// Anything that should never happen given the invariants above.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Policy => "policy",
            ErrorCategory::Loop => "loop",
            ErrorCategory::Canonicalization => "canonicalization",
            ErrorCategory::Step => "step",
            ErrorCategory::Engine => "engine",
            ErrorCategory::Config => "config",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Stable, machine-readable error codes shared by every layer of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A field failed a primitive-shape or relational-schema check.
    ValidationError,
    /// A named policy was unknown, duplicated, or resolved to an invalid step list.
    PolicyError,
    /// `settings.loop` failed to parse or its bounds could not be resolved.
    LoopConfigError,
    /// `settings.max_steps` is smaller than the run would require.
    MaxStepsExceeded,
    /// A loop ran out of iterations without satisfying its stop condition.
    LoopMaxIterationsReached,
    /// A value could not be rendered as canonical JSON (NaN/Infinity).
    NonCanonicalJson,
    /// The `prompt` field was missing or blank after trimming.
    InvalidPrompt,
    /// A required environment/config value was missing or malformed.
    ConfigError,
    /// A condition the engine's own invariants should have prevented.
    Internal,
}

impl ErrorCode {
    /// The [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::ValidationError => ErrorCategory::Validation,
            ErrorCode::PolicyError => ErrorCategory::Policy,
            ErrorCode::LoopConfigError | ErrorCode::LoopMaxIterationsReached => ErrorCategory::Loop,
            ErrorCode::MaxStepsExceeded => ErrorCategory::Engine,
            ErrorCode::NonCanonicalJson => ErrorCategory::Canonicalization,
            ErrorCode::InvalidPrompt => ErrorCategory::Step,
            ErrorCode::ConfigError => ErrorCategory::Config,
            ErrorCode::Internal => ErrorCategory::Internal,
        }
    }

    /// The stable `SCREAMING_SNAKE_CASE` wire form of this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::PolicyError => "POLICY_ERROR",
            ErrorCode::LoopConfigError => "LOOP_CONFIG_ERROR",
            ErrorCode::MaxStepsExceeded => "MAX_STEPS_EXCEEDED",
            ErrorCode::LoopMaxIterationsReached => "LOOP_MAX_ITERATIONS_REACHED",
            ErrorCode::NonCanonicalJson => "NON_CANONICAL_JSON",
            ErrorCode::InvalidPrompt => "INVALID_PROMPT",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type returned by every public API in this workspace.
pub struct DetError {
    code: ErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
    context: BTreeMap<String, serde_json::Value>,
}

impl DetError {
    /// Construct a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a structured context field. Silently dropped if `value` fails
    /// to serialize (it never does for the value types this workspace uses).
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl serde::Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// This error's stable code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Shorthand for `self.code().category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// The human-readable message (not guaranteed stable across releases).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured context attached via [`Self::with_context`].
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }

    /// Build a `validation_error` pointing at a dotted field path.
    pub fn validation(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = field_path.into();
        Self::new(ErrorCode::ValidationError, message.into()).with_context("field", path)
    }
}

impl fmt::Debug for DetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("DetError");
        dbg.field("code", &self.code).field("message", &self.message);
        if !self.context.is_empty() {
            dbg.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            dbg.field("source", &source.to_string());
        }
        dbg.finish()
    }
}

impl fmt::Display for DetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl StdError for DetError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Serializable snapshot of a [`DetError`], for transport across process
/// boundaries (the HTTP collaborator's `400` body, for instance). The
/// `source` chain is not preserved across this conversion.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DetErrorDto {
    /// Stable wire code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&DetError> for DetErrorDto {
    fn from(e: &DetError) -> Self {
        Self {
            code: e.code,
            message: e.message.clone(),
            context: e.context.clone(),
        }
    }
}

impl From<DetErrorDto> for DetError {
    fn from(dto: DetErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

/// Convenient `Result` alias used throughout this workspace.
pub type DetResult<T> = Result<T, DetError>;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::ValidationError,
        ErrorCode::PolicyError,
        ErrorCode::LoopConfigError,
        ErrorCode::MaxStepsExceeded,
        ErrorCode::LoopMaxIterationsReached,
        ErrorCode::NonCanonicalJson,
        ErrorCode::InvalidPrompt,
        ErrorCode::ConfigError,
        ErrorCode::Internal,
    ];

    #[test]
    fn as_str_values_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate as_str for {code:?}");
        }
    }

    #[test]
    fn exhaustive_code_count() {
        assert_eq!(ALL_CODES.len(), 9);
    }

    #[test]
    fn category_mapping_is_stable() {
        assert_eq!(ErrorCode::LoopConfigError.category(), ErrorCategory::Loop);
        assert_eq!(ErrorCode::LoopMaxIterationsReached.category(), ErrorCategory::Loop);
        assert_eq!(ErrorCode::InvalidPrompt.category(), ErrorCategory::Step);
        assert_eq!(ErrorCode::MaxStepsExceeded.category(), ErrorCategory::Engine);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = DetError::new(ErrorCode::ValidationError, "prompt is required");
        let rendered = err.to_string();
        assert!(rendered.contains("VALIDATION_ERROR"));
        assert!(rendered.contains("prompt is required"));
    }

    #[test]
    fn with_context_round_trips_through_display() {
        let err = DetError::new(ErrorCode::ValidationError, "bad field")
            .with_context("field", "inputs.prompt");
        assert_eq!(err.context().get("field").unwrap(), "inputs.prompt");
        assert!(err.to_string().contains("inputs.prompt"));
    }

    #[test]
    fn validation_helper_sets_field_context() {
        let err = DetError::validation("settings.max_steps", "must be positive");
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.context().get("field").unwrap(), "settings.max_steps");
    }

    #[test]
    fn source_chain_preserved_through_with_source() {
        #[derive(Debug, thiserror::Error)]
        #[error("inner boom")]
        struct Inner;

        let err = DetError::new(ErrorCode::Internal, "outer boom").with_source(Inner);
        let source = StdError::source(&err).expect("source present");
        assert_eq!(source.to_string(), "inner boom");
    }

    #[test]
    fn dto_round_trip_drops_source_but_keeps_code_and_context() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let err = DetError::new(ErrorCode::PolicyError, "unknown policy")
            .with_context("policy", "nightly")
            .with_source(Boom);
        let dto: DetErrorDto = (&err).into();
        let json = serde_json::to_string(&dto).unwrap();
        let back: DetErrorDto = serde_json::from_str(&json).unwrap();
        let restored: DetError = back.into();
        assert_eq!(restored.code(), ErrorCode::PolicyError);
        assert_eq!(restored.context().get("policy").unwrap(), "nightly");
        assert!(StdError::source(&restored).is_none());
    }

    #[test]
    fn debug_omits_empty_context_and_source() {
        let err = DetError::new(ErrorCode::Internal, "plain");
        let debug = format!("{err:?}");
        assert!(!debug.contains("context"));
        assert!(!debug.contains("source"));
    }
}
