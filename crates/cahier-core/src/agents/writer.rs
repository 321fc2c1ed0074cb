//! Writer agent: turns the session's user description into the root
//! specification version.

use std::sync::Arc;

use cahier_llm::LlmClient;
use serde_json::json;
use tracing::info;

use super::complete_as;
use super::prompts::{writer_prompt, WRITER_SYSTEM_PROMPT};
use crate::context::ContextManager;
use crate::domain::{
    AgentRole, CahierError, ContextType, DependencyContext, ModificationType, RequestId, Result,
    VersionId, WebSpecification, EVALUATION_PRIORITY,
};

/// What the writer produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSpecification {
    pub version_id: VersionId,
    pub specification: WebSpecification,
    /// The evaluation request raised for the new version.
    pub request_id: RequestId,
}

pub struct WriterAgent {
    llm: Arc<dyn LlmClient>,
}

impl WriterAgent {
    pub const ROLE: AgentRole = AgentRole::Writer;

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Write a specification from the current user input.
    ///
    /// Stores it as a root `creation` version and asks the evaluator to
    /// review it (priority 1).
    pub async fn write(&self, ctx: &ContextManager) -> Result<WrittenSpecification> {
        let user_input = ctx.get_user_input().ok_or(CahierError::MissingUserInput)?;

        let specification: WebSpecification = complete_as(
            self.llm.as_ref(),
            &Self::ROLE,
            &writer_prompt(&user_input),
            WRITER_SYSTEM_PROMPT,
        )
        .await?;

        let version_id = ctx.store_specification_version(
            serde_json::to_value(&specification)?,
            Self::ROLE,
            ModificationType::Creation,
            None,
        )?;

        let request_id = ctx.register_agent_dependency(
            Self::ROLE,
            AgentRole::Evaluator,
            DependencyContext::new(
                version_id,
                ContextType::EvaluationRequest,
                EVALUATION_PRIORITY,
            )
            .with_data("specification_id", json!(version_id)),
        )?;

        info!(
            agent = %Self::ROLE,
            version_id = %version_id,
            pages = specification.page_count(),
            features = specification.features.len(),
            "specification written"
        );

        Ok(WrittenSpecification {
            version_id,
            specification,
            request_id,
        })
    }
}
