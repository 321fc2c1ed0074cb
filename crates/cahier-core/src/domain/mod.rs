//! Domain models for Cahier.
//!
//! Canonical definitions for the core entities:
//! - `SpecificationVersion`: Immutable entry in a session's version history
//! - `DependencyRequest`: Follow-up work one agent asks of another
//! - `WebSpecification`: The specification document itself
//! - `EvaluationResult` / `OptimizationResult`: Agent verdicts and rewrites

pub mod agent;
pub mod digest;
pub mod error;
pub mod evaluation;
pub mod optimization;
pub mod specification;
pub mod validation;
pub mod version;

// Re-export main types and errors
pub use agent::{AgentRole, CustomRole};
pub use error::{CahierError, Result};
pub use evaluation::{EvaluationCriteria, EvaluationDraft, EvaluationFeedback, EvaluationResult};
pub use optimization::{OptimizationChange, OptimizationDraft, OptimizationResult};
pub use specification::{PageSection, TechStackCategory, WebSpecification};
pub use validation::{parse_llm_json, specification_of, validate_payload, Validate};
pub use version::{
    ContextType, CustomContext, DependencyContext, DependencyRequest, ModificationType, Priority,
    RequestId, SpecificationVersion, VersionId, EVALUATION_PRIORITY, OPTIMIZATION_PRIORITY,
};
