//! Normalization of raw job result payloads.
//!
//! Two backend endpoints return semantically equivalent result data in
//! structurally different envelopes, and older records carry shapes the
//! current backend no longer emits. This module hides all of that behind
//! one canonical structure; nothing downstream needs to know which endpoint
//! answered.

use serde_json::{Map, Value};
use tracing::debug;

const STEP_RESULTS_KEY: &str = "step_results";
const PIPELINE_RESULT_KEY: &str = "pipeline_result";
const METADATA_KEY: &str = "metadata";
const QUALITY_WARNINGS_KEY: &str = "quality_warnings";

/// Canonical result payload shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedResult {
    /// Step name to raw step output, in arrival order.
    pub step_results: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub quality_warnings: Vec<String>,
}

impl NormalizedResult {
    pub fn is_empty(&self) -> bool {
        self.step_results.is_empty() && self.metadata.is_empty() && self.quality_warnings.is_empty()
    }
}

/// Normalize a raw result payload of unknown shape.
///
/// The fallback cascade, in strict order:
/// 1. `result.pipeline_result.step_results`
/// 2. `result.step_results`
/// 3. `pipeline_result.step_results`
/// 4. `result` itself as the step_results map, when it carries neither
///    nested key (reserved keys `metadata` and `quality_warnings` are
///    lifted out rather than treated as steps)
///
/// A payload matching none of these yields all-empty defaults; shape
/// mismatch is never an error.
pub fn normalize_result(raw: &Value) -> NormalizedResult {
    let result = raw.get("result");

    if let Some(envelope) = result.and_then(|r| r.get(PIPELINE_RESULT_KEY)) {
        if let Some(steps) = envelope.get(STEP_RESULTS_KEY).and_then(Value::as_object) {
            return assemble(steps.clone(), &[Some(envelope), result, Some(raw)]);
        }
    }

    if let Some(steps) = result
        .and_then(|r| r.get(STEP_RESULTS_KEY))
        .and_then(Value::as_object)
    {
        return assemble(steps.clone(), &[result, Some(raw)]);
    }

    if let Some(envelope) = raw.get(PIPELINE_RESULT_KEY) {
        if let Some(steps) = envelope.get(STEP_RESULTS_KEY).and_then(Value::as_object) {
            return assemble(steps.clone(), &[Some(envelope), Some(raw)]);
        }
    }

    if let Some(flat) = result.and_then(Value::as_object) {
        // Only a true flat map qualifies; a malformed nested key means the
        // payload is some shape we do not understand.
        if !flat.contains_key(STEP_RESULTS_KEY) && !flat.contains_key(PIPELINE_RESULT_KEY) {
            let steps: Map<String, Value> = flat
                .iter()
                .filter(|(key, _)| key != &METADATA_KEY && key != &QUALITY_WARNINGS_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            return assemble(steps, &[result, Some(raw)]);
        }
    }

    debug!("result payload matched no known shape, contributing no steps");
    NormalizedResult::default()
}

/// Build the canonical structure, pulling metadata and quality warnings
/// from the innermost scope that carries them.
fn assemble(step_results: Map<String, Value>, scopes: &[Option<&Value>]) -> NormalizedResult {
    let metadata = scopes
        .iter()
        .flatten()
        .find_map(|scope| scope.get(METADATA_KEY).and_then(Value::as_object))
        .cloned()
        .unwrap_or_default();

    let quality_warnings = scopes
        .iter()
        .flatten()
        .find_map(|scope| scope.get(QUALITY_WARNINGS_KEY).and_then(Value::as_array))
        .map(|warnings| parse_warnings(warnings))
        .unwrap_or_default();

    NormalizedResult {
        step_results,
        metadata,
        quality_warnings,
    }
}

/// Warnings arrive either as plain strings or as objects with a `message`
/// field, depending on backend vintage.
fn parse_warnings(warnings: &[Value]) -> Vec<String> {
    warnings
        .iter()
        .filter_map(|warning| {
            warning
                .as_str()
                .map(str::to_owned)
                .or_else(|| {
                    warning
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                })
        })
        .collect()
}
