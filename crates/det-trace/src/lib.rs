// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trace record constructors and the append-only hash chain they thread
//! through. `record_hash` is always computed last, over the record with
//! that field absent, so every constructor here takes the record's other
//! fields and returns a value that is already a fixed point — nothing
//! downstream may mutate a record after construction.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use det_core::{StepResult, TraceRecord};
use det_error::{DetError, DetResult, ErrorCode};
use serde_json::Value;

fn err(message: impl Into<String>) -> DetError {
    DetError::new(ErrorCode::Internal, message)
}

/// Build the trace header — the chain's anchor. Always `index` 0.
///
/// # Errors
/// [`ErrorCode::NonCanonicalJson`] if any field fails to canonicalize
/// (cannot happen for well-formed hashes and timestamps, but the hashing
/// call is fallible so the signature stays honest about it).
#[allow(clippy::too_many_arguments)]
pub fn build_header_record(
    version: &str,
    trace_id: &str,
    created_at: &str,
    engine_version: &str,
    problem_spec_hash: &str,
    initial_state_hash: &str,
) -> DetResult<TraceRecord> {
    let mut record = TraceRecord::Header {
        version: version.to_string(),
        trace_id: trace_id.to_string(),
        created_at: created_at.to_string(),
        engine_version: engine_version.to_string(),
        hash_algorithm: det_core::HASH_ALGORITHM.to_string(),
        canonicalization: det_core::CANONICALIZATION.to_string(),
        problem_spec_hash: problem_spec_hash.to_string(),
        initial_state_hash: initial_state_hash.to_string(),
        record_hash: String::new(),
    };
    seal(&mut record)?;
    Ok(record)
}

/// Build a step record chained to `prev_hash`.
///
/// # Errors
/// See [`build_header_record`].
pub fn build_step_record(
    index: u64,
    step_index: u32,
    result: StepResult,
    state_before_hash: &str,
    state_after_hash: &str,
    prev_hash: &str,
) -> DetResult<TraceRecord> {
    let mut record = TraceRecord::Step {
        index,
        step_index,
        result,
        state_before_hash: state_before_hash.to_string(),
        state_after_hash: state_after_hash.to_string(),
        prev_hash: prev_hash.to_string(),
        record_hash: String::new(),
    };
    seal(&mut record)?;
    Ok(record)
}

/// Build a loop-controller decision record chained to `prev_hash`.
///
/// # Errors
/// See [`build_header_record`].
#[allow(clippy::too_many_arguments)]
pub fn build_control_record(
    index: u64,
    action: &str,
    loop_iteration: u32,
    start_step: &str,
    end_step: &str,
    stop_path: &str,
    stop_operator: &str,
    stop_value: Value,
    state_hash: &str,
    prev_hash: &str,
) -> DetResult<TraceRecord> {
    let mut record = TraceRecord::Control {
        index,
        control_type: "loop".to_string(),
        action: action.to_string(),
        loop_iteration,
        start_step: start_step.to_string(),
        end_step: end_step.to_string(),
        stop_path: stop_path.to_string(),
        stop_operator: stop_operator.to_string(),
        stop_value,
        state_hash: state_hash.to_string(),
        prev_hash: prev_hash.to_string(),
        record_hash: String::new(),
    };
    seal(&mut record)?;
    Ok(record)
}

/// Compute and fill in `record.record_hash` in place.
fn seal(record: &mut TraceRecord) -> DetResult<()> {
    let hash = det_core::compute_record_hash(&record)?;
    match record {
        TraceRecord::Header { record_hash, .. }
        | TraceRecord::Step { record_hash, .. }
        | TraceRecord::Control { record_hash, .. } => *record_hash = hash,
    }
    Ok(())
}

/// An in-memory, append-only trace under construction. Tracks `index` and
/// `prev_hash` bookkeeping so the engine runner never has to thread them by
/// hand; verifies the chain it has built so far on request.
#[derive(Debug, Clone, Default)]
pub struct TraceChain {
    records: Vec<TraceRecord>,
}

impl TraceChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already-built record. The caller is responsible for
    /// threading `prev_hash`/`index` correctly; use
    /// [`TraceChain::next_index`] and [`TraceChain::head_hash`] to do so.
    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    /// The `index` the next appended record should carry.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.records.len() as u64
    }

    /// `record_hash` of the most recently appended record, the `prev_hash`
    /// the next record must carry. Empty only before the header is pushed.
    #[must_use]
    pub fn head_hash(&self) -> Option<&str> {
        self.records.last().map(TraceRecord::record_hash)
    }

    /// Number of records appended so far (header included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` iff no record has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records appended so far, in order.
    #[must_use]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Consume the chain, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }

    /// Verify P2 (record-hash fixed point) and P3 (chain integrity) over
    /// every record appended so far.
    ///
    /// # Errors
    /// [`ErrorCode::Internal`] describing the first violation found.
    pub fn verify(&self) -> DetResult<()> {
        for (i, record) in self.records.iter().enumerate() {
            let recomputed = det_core::compute_record_hash(record)?;
            if recomputed != record.record_hash() {
                return Err(err(format!("record {i} fails the record-hash fixed point")));
            }
            let prev_hash = match record {
                TraceRecord::Header { .. } => None,
                TraceRecord::Step { prev_hash, .. } | TraceRecord::Control { prev_hash, .. } => {
                    Some(prev_hash.as_str())
                }
            };
            if let Some(prev_hash) = prev_hash {
                let expected = self.records.get(i - 1).map(TraceRecord::record_hash);
                if Some(prev_hash) != expected {
                    return Err(err(format!("record {i} has a broken prev_hash link")));
                }
            }
        }
        Ok(())
    }
}

/// Render `records` as NDJSON: one canonical-JSON object per line,
/// `\n`-terminated, UTF-8 without BOM.
///
/// # Errors
/// [`ErrorCode::NonCanonicalJson`] if any record fails to canonicalize.
pub fn render_ndjson(records: &[TraceRecord]) -> DetResult<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&det_core::canonical_json(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write `records` to `path` as NDJSON, truncating any existing file.
///
/// # Errors
/// [`ErrorCode::NonCanonicalJson`] if any record fails to canonicalize;
/// [`ErrorCode::Internal`] if the file cannot be written.
pub fn write_ndjson_file(path: &Path, records: &[TraceRecord]) -> DetResult<()> {
    let body = render_ndjson(records)?;
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| err(format!("failed to open trace file {}", path.display())).with_source(e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| err(format!("failed to write trace file {}", path.display())).with_source(e))?;
    Ok(())
}
