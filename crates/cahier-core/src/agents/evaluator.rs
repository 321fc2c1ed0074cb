//! Evaluator agent: scores a specification version and decides whether
//! it needs optimizing.

use std::sync::Arc;

use cahier_llm::LlmClient;
use serde_json::json;
use tracing::info;

use super::complete_as;
use super::prompts::{evaluator_prompt, EVALUATOR_SYSTEM_PROMPT};
use crate::context::ContextManager;
use crate::domain::{
    specification_of, AgentRole, CahierError, ContextType, DependencyContext, EvaluationDraft,
    EvaluationResult, ModificationType, RequestId, Result, VersionId, OPTIMIZATION_PRIORITY,
};

/// Score below which an optimization is requested.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.9;

/// What the evaluator produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub version_id: VersionId,
    pub result: EvaluationResult,
    /// Set when the score fell below the threshold.
    pub optimization_request: Option<RequestId>,
}

pub struct EvaluatorAgent {
    llm: Arc<dyn LlmClient>,
    threshold: f64,
}

impl EvaluatorAgent {
    pub const ROLE: AgentRole = AgentRole::Evaluator;

    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate the specification stored at `spec_version`.
    ///
    /// The evaluation is stored as an `evaluation` version whose parent is
    /// `spec_version`. Pending evaluation requests about `spec_version` are
    /// acknowledged.
    pub async fn evaluate(
        &self,
        ctx: &ContextManager,
        spec_version: VersionId,
    ) -> Result<EvaluationOutcome> {
        let user_input = ctx.get_user_input().ok_or(CahierError::MissingUserInput)?;
        let record = ctx.get_version(spec_version)?;
        if !record.modification_type.carries_specification() {
            return Err(CahierError::UnexpectedModification {
                version: spec_version,
                expected: "creation or optimization".to_string(),
                actual: record.modification_type.to_string(),
            });
        }
        let specification = specification_of(&record)?;

        let draft: EvaluationDraft = complete_as(
            self.llm.as_ref(),
            &Self::ROLE,
            &evaluator_prompt(&user_input, &specification),
            EVALUATOR_SYSTEM_PROMPT,
        )
        .await?;
        let result = EvaluationResult::from_draft(draft, spec_version);

        let version_id = ctx.store_specification_version_with_comment(
            serde_json::to_value(&result)?,
            Self::ROLE,
            ModificationType::Evaluation,
            Some(spec_version),
            &format!("Evaluation of {spec_version} (score {:.2})", result.total_score),
        )?;
        ctx.acknowledge_pending(&Self::ROLE, spec_version)?;

        let optimization_request = if result.needs_optimization(self.threshold) {
            let id = ctx.register_agent_dependency(
                Self::ROLE,
                AgentRole::Optimizer,
                DependencyContext::new(
                    version_id,
                    ContextType::OptimizationRequest,
                    OPTIMIZATION_PRIORITY,
                )
                .with_data("specification_id", json!(spec_version))
                .with_data("evaluation_version_id", json!(version_id))
                .with_data("evaluation_feedback", serde_json::to_value(&result)?),
            )?;
            Some(id)
        } else {
            None
        };

        info!(
            agent = %Self::ROLE,
            version_id = %version_id,
            evaluated = %spec_version,
            total_score = result.total_score,
            optimization_requested = optimization_request.is_some(),
            "evaluation complete"
        );

        Ok(EvaluationOutcome {
            version_id,
            result,
            optimization_request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cahier_llm::fakes::ScriptedLlm;

    fn seed_spec(ctx: &ContextManager) -> VersionId {
        ctx.set_user_input("Build a recipe-sharing site");
        ctx.store_specification_version(
            json!({
                "project_name": "Recettes",
                "description": "Recipe sharing site",
                "pages": ["Home"],
                "features": ["publish recipes"]
            }),
            AgentRole::Writer,
            ModificationType::Creation,
            None,
        )
        .unwrap()
    }

    fn reply(total: f64) -> String {
        json!({
            "criteria": {"completeness": 70, "coherence": 75, "feasibility": 70, "clarity": 72},
            "total_score": total,
            "feedback": {"weaknesses": ["no moderation"]},
            "improvement_suggestions": ["add moderation"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_low_score_requests_optimization() {
        let ctx = ContextManager::new();
        let v1 = seed_spec(&ctx);
        let agent = EvaluatorAgent::new(Arc::new(ScriptedLlm::with_replies([reply(0.72)])));

        let outcome = agent.evaluate(&ctx, v1).await.unwrap();
        let record = ctx.get_version(outcome.version_id).unwrap();
        assert_eq!(record.parent_version_id, Some(v1));
        assert_eq!(record.modification_type, ModificationType::Evaluation);

        let pending = ctx.pending_for(&AgentRole::Optimizer);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].priority, OPTIMIZATION_PRIORITY);
        assert_eq!(pending[0].source_version_id, outcome.version_id);
        assert_eq!(Some(pending[0].request_id), outcome.optimization_request);
    }

    #[tokio::test]
    async fn test_high_score_requests_nothing() {
        let ctx = ContextManager::new();
        let v1 = seed_spec(&ctx);
        let agent = EvaluatorAgent::new(Arc::new(ScriptedLlm::with_replies([reply(0.95)])));

        let outcome = agent.evaluate(&ctx, v1).await.unwrap();
        assert!(outcome.optimization_request.is_none());
        assert!(ctx.pending_for(&AgentRole::Optimizer).is_empty());
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let ctx = ContextManager::new();
        let v1 = seed_spec(&ctx);
        let agent = EvaluatorAgent::new(Arc::new(ScriptedLlm::with_replies([reply(0.72)])))
            .with_threshold(0.7);

        let outcome = agent.evaluate(&ctx, v1).await.unwrap();
        assert!(outcome.optimization_request.is_none());
    }

    #[tokio::test]
    async fn test_refuses_to_evaluate_an_evaluation() {
        let ctx = ContextManager::new();
        let v1 = seed_spec(&ctx);
        let agent = EvaluatorAgent::new(Arc::new(ScriptedLlm::with_replies([
            reply(0.5),
            reply(0.5),
        ])));
        let first = agent.evaluate(&ctx, v1).await.unwrap();

        let err = agent.evaluate(&ctx, first.version_id).await.unwrap_err();
        assert!(matches!(err, CahierError::UnexpectedModification { .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_malformed() {
        let ctx = ContextManager::new();
        let v1 = seed_spec(&ctx);
        let agent = EvaluatorAgent::new(Arc::new(ScriptedLlm::with_replies([reply(72.0)])));

        let err = agent.evaluate(&ctx, v1).await.unwrap_err();
        assert!(matches!(err, CahierError::MalformedPayload(_)));
        assert_eq!(ctx.versions().len(), 1);
    }
}
