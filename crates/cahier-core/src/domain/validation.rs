//! Schema validation at the boundary where LLM text becomes a payload.
//!
//! Nothing reaches the version store without passing through here:
//! agents use [`parse_llm_json`] on raw replies, and the context manager
//! runs [`validate_payload`] on every payload it is asked to store.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use super::error::{CahierError, Result};
use super::evaluation::EvaluationResult;
use super::optimization::OptimizationResult;
use super::specification::WebSpecification;
use super::version::{ModificationType, SpecificationVersion};

/// Semantic checks that serde's structural checks cannot express.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), String>;
}

fn fenced_block() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

/// Locate the JSON object in a model reply.
///
/// Prefers a fenced code block; otherwise takes the span from the first
/// `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(caps) = fenced_block().and_then(|re| re.captures(text)) {
        if let Some(m) = caps.get(1) {
            return Some(m.as_str());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extract, deserialize and validate a typed payload from a model reply.
pub fn parse_llm_json<T>(text: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let raw = extract_json(text)
        .ok_or_else(|| CahierError::MalformedPayload("reply contains no JSON object".into()))?;
    let value: T = serde_json::from_str(raw)
        .map_err(|e| CahierError::MalformedPayload(format!("reply does not match schema: {e}")))?;
    value.validate().map_err(CahierError::MalformedPayload)?;
    Ok(value)
}

fn check<T>(payload: &serde_json::Value) -> Result<()>
where
    T: DeserializeOwned + Validate,
{
    let typed: T = serde_json::from_value(payload.clone())
        .map_err(|e| CahierError::MalformedPayload(e.to_string()))?;
    typed.validate().map_err(CahierError::MalformedPayload)
}

/// Validate a payload against the schema its modification type implies.
///
/// Optimization payloads may be a full `OptimizationResult` or a bare
/// `WebSpecification`.
pub fn validate_payload(modification: ModificationType, payload: &serde_json::Value) -> Result<()> {
    if !payload.is_object() {
        return Err(CahierError::MalformedPayload(
            "payload must be a JSON object".to_string(),
        ));
    }
    match modification {
        ModificationType::Creation => check::<WebSpecification>(payload),
        ModificationType::Evaluation => check::<EvaluationResult>(payload),
        ModificationType::Optimization => {
            if payload.get("improved_specification").is_some() {
                check::<OptimizationResult>(payload)
            } else {
                check::<WebSpecification>(payload)
            }
        }
    }
}

/// The specification document carried by a creation or optimization version.
pub fn specification_of(version: &SpecificationVersion) -> Result<WebSpecification> {
    match version.modification_type {
        ModificationType::Creation => Ok(version.payload_as::<WebSpecification>()?),
        ModificationType::Optimization => {
            let spec = match version.payload.get("improved_specification") {
                Some(inner) => serde_json::from_value(inner.clone())?,
                None => version.payload_as::<WebSpecification>()?,
            };
            Ok(spec)
        }
        ModificationType::Evaluation => Err(CahierError::UnexpectedModification {
            version: version.version_id,
            expected: "creation or optimization".to_string(),
            actual: version.modification_type.to_string(),
        }),
    }
}
