//! Version and dependency-request records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::AgentRole;
use super::digest::payload_digest;

/// Identifier of a stored version, rendered `v<n>`.
///
/// Assigned by the store from a per-store monotonic counter starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(u64);

impl VersionId {
    pub fn new(n: u64) -> Self {
        VersionId(n)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Plain ASCII digits only; `u64::from_str` alone would also take `+3`.
fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl std::str::FromStr for VersionId {
    type Err = String;

    /// Accepts `v3`, `V3` or `3`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        parse_digits(digits)
            .map(VersionId)
            .ok_or_else(|| format!("invalid version id: {s:?}"))
    }
}

impl TryFrom<String> for VersionId {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VersionId> for String {
    fn from(id: VersionId) -> Self {
        id.to_string()
    }
}

/// Identifier of a dependency request, rendered `req-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(n: u64) -> Self {
        RequestId(n)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = String;

    /// Accepts `req-4` or `4`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("req-").unwrap_or(trimmed);
        parse_digits(digits)
            .map(RequestId)
            .ok_or_else(|| format!("invalid request id: {s:?}"))
    }
}

impl TryFrom<String> for RequestId {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.to_string()
    }
}

/// What kind of step produced a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Creation,
    Evaluation,
    Optimization,
}

impl ModificationType {
    /// Whether versions of this type carry a `WebSpecification` payload
    /// (directly or as the improved specification).
    pub fn carries_specification(&self) -> bool {
        matches!(self, Self::Creation | Self::Optimization)
    }
}

impl std::fmt::Display for ModificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation => write!(f, "creation"),
            Self::Evaluation => write!(f, "evaluation"),
            Self::Optimization => write!(f, "optimization"),
        }
    }
}

impl std::str::FromStr for ModificationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creation" => Ok(Self::Creation),
            "evaluation" => Ok(Self::Evaluation),
            "optimization" => Ok(Self::Optimization),
            other => Err(format!("unknown modification type: {other}")),
        }
    }
}

/// One immutable entry in a session's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificationVersion {
    pub version_id: VersionId,
    /// `None` only for a root version.
    pub parent_version_id: Option<VersionId>,
    pub agent_name: AgentRole,
    pub modification_type: ModificationType,
    pub timestamp: DateTime<Utc>,
    /// Opaque structured record (specification, evaluation or optimization).
    pub payload: serde_json::Value,
    /// SHA-256 hex of the canonical payload, fixed at creation.
    pub payload_digest: String,
    pub comment: String,
}

impl SpecificationVersion {
    pub fn is_root(&self) -> bool {
        self.parent_version_id.is_none()
    }

    /// Re-derive the payload digest and compare with the stored one.
    pub fn verify(&self) -> Option<String> {
        let actual = payload_digest(&self.payload);
        if actual == self.payload_digest {
            None
        } else {
            Some(actual)
        }
    }

    /// Deserialize the payload into a typed record.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone())
    }
}

/// The kind of follow-up work a dependency request asks for.
///
/// Build from a tag with `ContextType::from`; known tags always map to
/// their closed variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextType {
    EvaluationRequest,
    OptimizationRequest,
    Custom(CustomContext),
}

/// A context tag other than the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomContext(String);

impl CustomContext {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ContextType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EvaluationRequest => "evaluation_request",
            Self::OptimizationRequest => "optimization_request",
            Self::Custom(tag) => tag.as_str(),
        }
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ContextType {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "evaluation_request" => Self::EvaluationRequest,
            "optimization_request" => Self::OptimizationRequest,
            other => Self::Custom(CustomContext(other.to_string())),
        }
    }
}

impl From<String> for ContextType {
    fn from(tag: String) -> Self {
        ContextType::from(tag.as_str())
    }
}

impl From<ContextType> for String {
    fn from(ct: ContextType) -> Self {
        ct.as_str().to_string()
    }
}

/// Request priority. Lower numbers are more urgent: `0` outranks `1`.
pub type Priority = u8;

/// Priority used by the writer when requesting an evaluation.
pub const EVALUATION_PRIORITY: Priority = 1;

/// Priority used by the evaluator when requesting an optimization.
pub const OPTIMIZATION_PRIORITY: Priority = 2;

/// What a source agent hands to the registry when asking for follow-up work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyContext {
    pub source_version_id: VersionId,
    pub context_type: ContextType,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub priority: Priority,
}

impl DependencyContext {
    pub fn new(source_version_id: VersionId, context_type: ContextType, priority: Priority) -> Self {
        Self {
            source_version_id,
            context_type,
            data: serde_json::Map::new(),
            priority,
        }
    }

    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

/// A registered request for follow-up work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub request_id: RequestId,
    pub source_version_id: VersionId,
    pub source_agent: AgentRole,
    pub target_agent: AgentRole,
    pub context_type: ContextType,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub priority: Priority,
    pub registered_at: DateTime<Utc>,
    /// Set once by `acknowledge`; never cleared.
    pub acknowledged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_id_display_and_parse() {
        let id = VersionId::new(12);
        assert_eq!(id.to_string(), "v12");
        assert_eq!("v12".parse::<VersionId>().unwrap(), id);
        assert_eq!("12".parse::<VersionId>().unwrap(), id);
        assert!("vx".parse::<VersionId>().is_err());
    }

    #[test]
    fn test_version_id_rejects_repeated_prefix_and_signs() {
        for bad in ["vv3", "+3", "v+3", "v", "", "v-3", "3v"] {
            assert!(bad.parse::<VersionId>().is_err(), "{bad:?} should be rejected");
        }
        assert_eq!("V7".parse::<VersionId>().unwrap(), VersionId::new(7));
        assert_eq!(" v7 ".parse::<VersionId>().unwrap(), VersionId::new(7));
    }

    #[test]
    fn test_request_id_rejects_repeated_prefix() {
        assert!("req-req-4".parse::<RequestId>().is_err());
        assert!("req-+4".parse::<RequestId>().is_err());
        assert_eq!("4".parse::<RequestId>().unwrap(), RequestId::new(4));
    }

    #[test]
    fn test_version_id_serializes_as_string() {
        let json = serde_json::to_string(&VersionId::new(3)).unwrap();
        assert_eq!(json, "\"v3\"");
        let back: VersionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VersionId::new(3));
    }

    #[test]
    fn test_request_id_display_and_parse() {
        let id = RequestId::new(4);
        assert_eq!(id.to_string(), "req-4");
        assert_eq!("req-4".parse::<RequestId>().unwrap(), id);
    }

    #[test]
    fn test_modification_type_parse() {
        assert_eq!(
            "EVALUATION".parse::<ModificationType>().unwrap(),
            ModificationType::Evaluation
        );
        assert!("rewrite".parse::<ModificationType>().is_err());
        assert!(ModificationType::Optimization.carries_specification());
        assert!(!ModificationType::Evaluation.carries_specification());
    }

    #[test]
    fn test_context_type_round_trips_known_tags() {
        let ct: ContextType = "optimization_request".to_string().into();
        assert_eq!(ct, ContextType::OptimizationRequest);
        let custom: ContextType = "translation_request".to_string().into();
        assert_eq!(custom.as_str(), "translation_request");

        let json = serde_json::to_string(&custom).unwrap();
        let back: ContextType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, custom);
        assert_eq!(ContextType::from(" evaluation_request"), ContextType::EvaluationRequest);
    }

    #[test]
    fn test_priority_convention() {
        assert!(EVALUATION_PRIORITY < OPTIMIZATION_PRIORITY);
    }
}
