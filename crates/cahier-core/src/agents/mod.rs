//! The three producing agents.
//!
//! Each agent makes exactly one LLM call per action, validates the reply
//! at the boundary, stores one version, and registers follow-up work.
//! Agents never retry; a failed call or a malformed reply is returned to
//! the caller, which decides whether to ask again.
//!
//! # Module layout
//!
//! - [`writer`]: `WriterAgent`: user description → root specification
//! - [`evaluator`]: `EvaluatorAgent`: specification → scored evaluation
//! - [`optimizer`]: `OptimizerAgent`: evaluation → improved specification
//! - [`prompts`]: prompt builders

pub mod evaluator;
pub mod optimizer;
pub mod prompts;
pub mod writer;

use cahier_llm::LlmClient;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::{parse_llm_json, AgentRole, CahierError, Result, Validate};
use crate::metrics::METRICS;

pub use evaluator::{EvaluationOutcome, EvaluatorAgent};
pub use optimizer::{OptimizationOutcome, OptimizerAgent};
pub use writer::{WriterAgent, WrittenSpecification};

/// One LLM round-trip, parsed and validated into `T`.
pub(crate) async fn complete_as<T>(
    llm: &dyn LlmClient,
    agent: &AgentRole,
    prompt: &str,
    system_prompt: &str,
) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    METRICS.inc_llm_calls();
    debug!(agent = %agent, model = llm.model_name(), "requesting completion");
    let reply = llm.complete(prompt, Some(system_prompt)).await?;

    parse_llm_json::<T>(&reply).map_err(|err| {
        if let CahierError::MalformedPayload(reason) = &err {
            METRICS.inc_malformed_replies();
            warn!(agent = %agent, reason = %reason, "model reply rejected");
        }
        err
    })
}
