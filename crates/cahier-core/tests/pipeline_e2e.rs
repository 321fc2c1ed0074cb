//! End-to-end pipeline runs against a scripted model.

use std::sync::Arc;

use cahier_core::{
    render_history_md, write_outcome_json, AgentRole, ContextManager, ModificationType, Pipeline,
    PipelineConfig, PipelineOutcome, Stage, VersionId, OPTIMIZATION_PRIORITY,
};
use cahier_llm::fakes::ScriptedLlm;
use serde_json::json;

fn writer_reply() -> String {
    json!({
        "project_name": "Recettes",
        "description": "A site where home cooks share recipes",
        "target_audience": "home cooks",
        "pages": {
            "home": {"name": "Home", "components": ["search bar", "featured recipes"]},
            "recipe": {"name": "Recipe", "components": ["ingredients", "steps"]}
        },
        "features": ["publish recipes", "search recipes"],
        "tech_stack": {"frontend": ["React"], "backend": ["Axum"], "database": ["PostgreSQL"]}
    })
    .to_string()
}

fn evaluator_reply(score: f64) -> String {
    format!(
        "```json\n{}\n```",
        json!({
            "criteria": {"completeness": 70, "coherence": 75, "feasibility": 72, "clarity": 71},
            "total_score": score,
            "feedback": {"weaknesses": ["no moderation", "no ratings"]},
            "improvement_suggestions": ["add moderation", "add ratings"]
        })
    )
}

fn optimizer_reply() -> String {
    json!({
        "improved_specification": {
            "project_name": "Recettes",
            "description": "A moderated site where home cooks share and rate recipes",
            "pages": {
                "home": {"name": "Home"},
                "recipe": {"name": "Recipe", "components": ["ingredients", "steps", "ratings"]},
                "moderation": {"name": "Moderation"}
            },
            "features": ["publish recipes", "search recipes", "rate recipes", "flag recipes"]
        },
        "changes": [
            {"field_path": "pages.moderation", "new_value": "Moderation", "reason": "moderation was missing"},
            "added ratings to the recipe page"
        ],
        "optimization_score": 0.91
    })
    .to_string()
}

async fn run(replies: Vec<String>, config: PipelineConfig) -> (ContextManager, PipelineOutcome) {
    let ctx = ContextManager::new();
    let pipeline = Pipeline::new(Arc::new(ScriptedLlm::with_replies(replies)), config);
    let outcome = pipeline
        .run(&ctx, "Build a recipe-sharing site")
        .await
        .unwrap();
    (ctx, outcome)
}

#[tokio::test]
async fn recipe_site_low_score_is_optimized() {
    let llm = Arc::new(ScriptedLlm::with_replies([
        writer_reply(),
        evaluator_reply(0.72),
        optimizer_reply(),
        evaluator_reply(0.93),
    ]));
    let ctx = ContextManager::new();
    let pipeline = Pipeline::new(llm.clone(), PipelineConfig::default());
    let outcome = pipeline
        .run(&ctx, "Build a recipe-sharing site")
        .await
        .unwrap();

    let v1 = ctx.get_version(VersionId::new(1)).unwrap();
    assert_eq!(v1.modification_type, ModificationType::Creation);
    assert!(v1.parent_version_id.is_none());

    let v2 = ctx.get_version(VersionId::new(2)).unwrap();
    assert_eq!(v2.modification_type, ModificationType::Evaluation);
    assert_eq!(v2.parent_version_id, Some(VersionId::new(1)));
    assert_eq!(v2.payload["total_score"], json!(0.72));

    // the optimization request raised by the 0.72 evaluation
    let requests = ctx.dependencies().from_source(VersionId::new(2));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target_agent, AgentRole::Optimizer);
    assert_eq!(requests[0].priority, OPTIMIZATION_PRIORITY);
    assert!(requests[0].acknowledged);

    let v3 = ctx.get_version(VersionId::new(3)).unwrap();
    assert_eq!(v3.modification_type, ModificationType::Optimization);
    assert_eq!(v3.parent_version_id, Some(VersionId::new(2)));

    let ids: Vec<_> = ctx
        .get_ancestry(VersionId::new(3))
        .unwrap()
        .into_iter()
        .map(|v| v.version_id)
        .collect();
    assert_eq!(ids, vec![VersionId::new(1), VersionId::new(2), VersionId::new(3)]);

    assert_eq!(outcome.final_version_id, VersionId::new(3));
    assert_eq!(outcome.evaluation_version_id, VersionId::new(4));
    assert_eq!(outcome.final_score(), 0.93);
    assert_eq!(outcome.optimizations.len(), 1);
    assert_eq!(outcome.optimizations[0].changes.len(), 2);
    assert_eq!(outcome.specification.page_count(), 3);
    assert_eq!(outcome.ancestry.len(), 4);

    // every request has been consumed
    assert!(ctx.dependencies().all().iter().all(|r| r.acknowledged));
    assert_eq!(llm.remaining(), 0);
    assert_eq!(llm.calls().len(), 4);
}

#[tokio::test]
async fn threshold_met_skips_optimization() {
    let (ctx, outcome) = run(
        vec![writer_reply(), evaluator_reply(0.95)],
        PipelineConfig::default(),
    )
    .await;

    assert_eq!(outcome.final_version_id, VersionId::new(1));
    assert!(outcome.optimizations.is_empty());
    assert_eq!(ctx.versions().len(), 2);
    assert!(ctx.pending_for(&AgentRole::Optimizer).is_empty());
}

#[tokio::test]
async fn score_equal_to_threshold_is_good_enough() {
    let (_, outcome) = run(
        vec![writer_reply(), evaluator_reply(0.9)],
        PipelineConfig::default(),
    )
    .await;
    assert!(outcome.optimizations.is_empty());
}

#[tokio::test]
async fn rounds_are_capped() {
    let (ctx, outcome) = run(
        vec![
            writer_reply(),
            evaluator_reply(0.5),
            optimizer_reply(),
            evaluator_reply(0.6),
            optimizer_reply(),
            evaluator_reply(0.7),
        ],
        PipelineConfig::default().with_max_rounds(2),
    )
    .await;

    assert_eq!(outcome.optimizations.len(), 2);
    assert_eq!(outcome.final_score(), 0.7);
    assert_eq!(outcome.ancestry.len(), 6);
    // the last low evaluation still asked for an optimization nobody ran
    assert_eq!(ctx.pending_for(&AgentRole::Optimizer).len(), 1);
}

#[tokio::test]
async fn zero_rounds_never_optimizes() {
    let (_, outcome) = run(
        vec![writer_reply(), evaluator_reply(0.4)],
        PipelineConfig::default().with_max_rounds(0),
    )
    .await;
    assert!(outcome.optimizations.is_empty());
    assert_eq!(outcome.final_score(), 0.4);
}

#[tokio::test]
async fn malformed_evaluation_names_the_stage() {
    let ctx = ContextManager::new();
    let pipeline = Pipeline::new(
        Arc::new(ScriptedLlm::with_replies([
            writer_reply(),
            "I think it is pretty good.".to_string(),
        ])),
        PipelineConfig::default(),
    );

    let err = pipeline
        .run(&ctx, "Build a recipe-sharing site")
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Evaluation);
    assert!(err.to_string().starts_with("evaluation stage failed"));
    // the written specification is kept
    assert_eq!(ctx.versions().len(), 1);
    assert_eq!(ctx.pending_for(&AgentRole::Evaluator).len(), 1);
}

#[tokio::test]
async fn writer_failure_names_the_stage() {
    let ctx = ContextManager::new();
    let llm = ScriptedLlm::new();
    llm.push_error(cahier_llm::LlmError::Transient("timeout".into()));
    let pipeline = Pipeline::new(Arc::new(llm), PipelineConfig::default());

    let err = pipeline.run(&ctx, "anything").await.unwrap_err();
    assert_eq!(err.stage, Stage::Writing);
    assert!(ctx.versions().is_empty());
}

#[tokio::test]
async fn outcome_renders_and_persists() {
    let (_, outcome) = run(
        vec![
            writer_reply(),
            evaluator_reply(0.72),
            optimizer_reply(),
            evaluator_reply(0.93),
        ],
        PipelineConfig::default(),
    )
    .await;

    let history = render_history_md(&outcome.ancestry);
    assert!(history.contains("| v3 | v2 | Optimizer | optimization | 2 changes |"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outcome.json");
    write_outcome_json(&path, &outcome).unwrap();
    let back: PipelineOutcome =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, outcome);
}
