//! Writer → evaluator → optimizer loop for one session.
//!
//! The pipeline is sequential: every stage reads what the previous one
//! stored in the [`ContextManager`]. It never retries a failed stage; the
//! error is returned wrapped in a [`PipelineError`] naming the stage.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use cahier_llm::LlmClient;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::agents::evaluator::DEFAULT_SCORE_THRESHOLD;
use crate::agents::{EvaluatorAgent, OptimizerAgent, WriterAgent};
use crate::context::ContextManager;
use crate::domain::{
    AgentRole, CahierError, EvaluationResult, OptimizationResult, SpecificationVersion, VersionId,
    WebSpecification,
};
use crate::metrics::METRICS;
use crate::obs;

/// Default number of optimize/re-evaluate rounds.
pub const DEFAULT_MAX_OPTIMIZATION_ROUNDS: u32 = 1;

/// Knobs for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Scores strictly below this trigger an optimization.
    pub score_threshold: f64,
    pub max_optimization_rounds: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_optimization_rounds: DEFAULT_MAX_OPTIMIZATION_ROUNDS,
        }
    }
}

impl PipelineConfig {
    /// Read `CAHIER_SCORE_THRESHOLD` and `CAHIER_MAX_ROUNDS`, falling back
    /// to the defaults for missing or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            score_threshold: env_or("CAHIER_SCORE_THRESHOLD", defaults.score_threshold),
            max_optimization_rounds: env_or("CAHIER_MAX_ROUNDS", defaults.max_optimization_rounds),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_optimization_rounds = rounds;
        self
    }
}

fn env_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

/// The pipeline step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Writing,
    Evaluation,
    Optimization,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Writing => "writing",
            Stage::Evaluation => "evaluation",
            Stage::Optimization => "optimization",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure with its cause.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: CahierError,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Latest specification-bearing version (creation or optimization).
    pub final_version_id: VersionId,
    pub specification: WebSpecification,
    /// The evaluation of `final_version_id`.
    pub evaluation_version_id: VersionId,
    pub evaluation: EvaluationResult,
    pub optimizations: Vec<OptimizationResult>,
    /// Root-first lineage ending at the last stored version.
    pub ancestry: Vec<SpecificationVersion>,
}

impl PipelineOutcome {
    pub fn final_score(&self) -> f64 {
        self.evaluation.total_score
    }
}

pub struct Pipeline {
    writer: WriterAgent,
    evaluator: EvaluatorAgent,
    optimizer: OptimizerAgent,
    config: PipelineConfig,
}

impl Pipeline {
    /// Build the three agents on one shared client.
    pub fn new(llm: Arc<dyn LlmClient>, config: PipelineConfig) -> Self {
        Self {
            writer: WriterAgent::new(Arc::clone(&llm)),
            evaluator: EvaluatorAgent::new(Arc::clone(&llm)).with_threshold(config.score_threshold),
            optimizer: OptimizerAgent::new(llm),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole loop for `description` inside `ctx`.
    #[instrument(skip_all, fields(threshold = self.config.score_threshold))]
    pub async fn run(
        &self,
        ctx: &ContextManager,
        description: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        ctx.set_user_input(description);

        let written = timed(Stage::Writing, &WriterAgent::ROLE, self.writer.write(ctx)).await?;
        let mut final_version_id = written.version_id;
        let mut specification = written.specification;

        let mut evaluated = timed(
            Stage::Evaluation,
            &EvaluatorAgent::ROLE,
            self.evaluator.evaluate(ctx, final_version_id),
        )
        .await?;

        let mut optimizations = Vec::new();
        let mut rounds = 0;
        while evaluated.optimization_request.is_some()
            && rounds < self.config.max_optimization_rounds
        {
            rounds += 1;
            let optimized = timed(
                Stage::Optimization,
                &OptimizerAgent::ROLE,
                self.optimizer.optimize(ctx, evaluated.version_id),
            )
            .await?;
            final_version_id = optimized.version_id;
            specification = optimized.result.improved_specification.clone();
            optimizations.push(optimized.result);

            evaluated = timed(
                Stage::Evaluation,
                &EvaluatorAgent::ROLE,
                self.evaluator.evaluate(ctx, final_version_id),
            )
            .await?;
        }

        let ancestry = ctx
            .get_ancestry(evaluated.version_id)
            .map_err(|source| PipelineError {
                stage: Stage::Evaluation,
                source,
            })?;

        info!(
            final_version = %final_version_id,
            score = evaluated.result.total_score,
            rounds,
            versions = ancestry.len(),
            "pipeline finished"
        );
        METRICS.flush();

        Ok(PipelineOutcome {
            final_version_id,
            specification,
            evaluation_version_id: evaluated.version_id,
            evaluation: evaluated.result,
            optimizations,
            ancestry,
        })
    }
}

async fn timed<T, F>(stage: Stage, agent: &AgentRole, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, CahierError>>,
{
    obs::emit_stage_started(stage.as_str(), agent);
    let started = Instant::now();
    let result = fut.await;
    let elapsed = started.elapsed().as_millis() as u64;
    obs::emit_stage_finished(stage.as_str(), elapsed, result.is_ok());
    result.map_err(|source| PipelineError { stage, source })
}
