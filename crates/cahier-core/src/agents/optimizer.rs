//! Optimizer agent: rewrites a specification in response to an evaluation.

use std::sync::Arc;

use cahier_llm::LlmClient;
use tracing::info;

use super::complete_as;
use super::prompts::{optimizer_prompt, OPTIMIZER_SYSTEM_PROMPT};
use crate::context::ContextManager;
use crate::domain::{
    specification_of, AgentRole, CahierError, EvaluationResult, ModificationType,
    OptimizationDraft, OptimizationResult, Result, VersionId,
};

/// What the optimizer produced.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub version_id: VersionId,
    pub result: OptimizationResult,
}

pub struct OptimizerAgent {
    llm: Arc<dyn LlmClient>,
}

impl OptimizerAgent {
    pub const ROLE: AgentRole = AgentRole::Optimizer;

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Improve the specification judged by `evaluation_version`.
    ///
    /// The result is stored as an `optimization` version whose parent is the
    /// evaluation, so the lineage reads creation, evaluation, optimization.
    pub async fn optimize(
        &self,
        ctx: &ContextManager,
        evaluation_version: VersionId,
    ) -> Result<OptimizationOutcome> {
        let user_input = ctx.get_user_input().ok_or(CahierError::MissingUserInput)?;
        let record = ctx.get_version(evaluation_version)?;
        if record.modification_type != ModificationType::Evaluation {
            return Err(CahierError::UnexpectedModification {
                version: evaluation_version,
                expected: ModificationType::Evaluation.to_string(),
                actual: record.modification_type.to_string(),
            });
        }
        let evaluation: EvaluationResult = record
            .payload_as()
            .map_err(|e| CahierError::MalformedPayload(format!("{evaluation_version}: {e}")))?;

        // The evaluation must hang off the specification it scored.
        let original = evaluation.specification_version;
        if record.parent_version_id != Some(original) {
            return Err(CahierError::MalformedPayload(format!(
                "{evaluation_version} scores {original} but its parent is {}",
                record
                    .parent_version_id
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "none".to_string())
            )));
        }
        let specification = specification_of(&ctx.get_version(original)?)?;

        let draft: OptimizationDraft = complete_as(
            self.llm.as_ref(),
            &Self::ROLE,
            &optimizer_prompt(&user_input, &specification, &evaluation),
            OPTIMIZER_SYSTEM_PROMPT,
        )
        .await?;
        let result = OptimizationResult::from_draft(draft, original, evaluation_version);

        let version_id = ctx.store_specification_version_with_comment(
            serde_json::to_value(&result)?,
            Self::ROLE,
            ModificationType::Optimization,
            Some(evaluation_version),
            &format!(
                "Optimization following {evaluation_version} (initial score {:.2})",
                evaluation.total_score
            ),
        )?;
        let consumed = ctx.acknowledge_pending(&Self::ROLE, evaluation_version)?;

        info!(
            agent = %Self::ROLE,
            version_id = %version_id,
            original = %original,
            changes = result.changes.len(),
            requests_consumed = consumed,
            "specification optimized"
        );

        Ok(OptimizationOutcome { version_id, result })
    }
}
