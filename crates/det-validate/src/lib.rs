// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-layer validation for the determinism engine: primitive-rule shape
//! checks ([`primitive`]) and relational schema checks ([`schema`]), kept
//! separate the way the engine this was modeled on keeps them separate —
//! a field can look right byte-for-byte and still be wrong in context
//! (e.g. `version` matching the semver shape but carrying the wrong major).

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod primitive;
pub mod schema;

pub use schema::{validate_problem_spec, validate_state, validate_step_result};
