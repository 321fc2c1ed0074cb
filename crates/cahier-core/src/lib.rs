//! Cahier Core Library
//!
//! Versioned specification history, inter-agent dependency tracking and the
//! writer → evaluator → optimizer pipeline that drafts a web application
//! specification ("cahier des charges") from a short description.

pub mod agents;
pub mod context;
pub mod dependency;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod reporting;
pub mod session;
pub mod telemetry;
pub mod version_store;

pub use agents::{
    EvaluationOutcome, EvaluatorAgent, OptimizationOutcome, OptimizerAgent, WriterAgent,
    WrittenSpecification,
};

pub use context::{ContextManager, ContextSnapshot};
pub use dependency::DependencyRegistry;
pub use version_store::VersionStore;

pub use domain::{
    AgentRole, CahierError, ContextType, DependencyContext, DependencyRequest,
    EvaluationCriteria, EvaluationFeedback, EvaluationResult, ModificationType,
    OptimizationChange, OptimizationResult, PageSection, Priority, RequestId, Result,
    SpecificationVersion, TechStackCategory, VersionId, WebSpecification, EVALUATION_PRIORITY,
    OPTIMIZATION_PRIORITY,
};

pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineOutcome, Stage};
pub use reporting::{
    render_evaluation_md, render_history_md, render_specification_md, write_outcome_json,
};
pub use session::{SessionId, SessionRegistry};

pub use metrics::METRICS;
pub use obs::SessionSpan;
pub use telemetry::init_tracing;

/// Cahier version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
