use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::{
    EvaluationResult, ModificationType, OptimizationResult, SpecificationVersion,
    WebSpecification,
};
use crate::pipeline::PipelineOutcome;

/// Write the pipeline outcome as pretty JSON.
pub fn write_outcome_json(path: &Path, outcome: &PipelineOutcome) -> Result<()> {
    let content = serde_json::to_string_pretty(outcome).context("serialize pipeline outcome")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n", title));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

/// Render a specification as a readable markdown document.
pub fn render_specification_md(spec: &WebSpecification) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", spec.project_name));
    out.push_str(&format!("{}\n\n", spec.description));
    if !spec.target_audience.is_empty() {
        out.push_str(&format!("**Target audience:** {}\n\n", spec.target_audience));
    }

    out.push_str("## Pages\n");
    for (slug, page) in &spec.pages {
        out.push_str(&format!("### {} (`{}`)\n", page.name, slug));
        if !page.description.is_empty() {
            out.push_str(&format!("{}\n", page.description));
        }
        if !page.components.is_empty() {
            out.push_str(&format!("- components: {}\n", page.components.join(", ")));
        }
        if !page.dynamic_elements.is_empty() {
            out.push_str(&format!(
                "- dynamic elements: {}\n",
                page.dynamic_elements.join(", ")
            ));
        }
        if !page.interactions.is_empty() {
            out.push_str(&format!("- interactions: {}\n", page.interactions.join(", ")));
        }
        out.push('\n');
    }

    push_list(&mut out, "Features", &spec.features);

    if !spec.tech_stack.is_empty() {
        out.push_str("## Tech Stack\n");
        for (category, tools) in &spec.tech_stack {
            out.push_str(&format!("- {}: {}\n", category, tools.join(", ")));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "**Responsive design:** {}\n\n",
        if spec.responsive_design { "yes" } else { "no" }
    ));

    if !spec.performance_requirements.is_empty() {
        out.push_str("## Performance\n");
        for (key, value) in &spec.performance_requirements {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&format!("- {}: {}\n", key, value));
        }
        out.push('\n');
    }

    push_list(&mut out, "Security", &spec.security_requirements);
    push_list(&mut out, "SEO", &spec.seo_requirements);
    push_list(&mut out, "Accessibility", &spec.accessibility_requirements);
    out
}

/// Render an evaluation as a markdown scorecard.
pub fn render_evaluation_md(eval: &EvaluationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Evaluation of {}\n\n**Total score:** {:.2}\n\n",
        eval.specification_version, eval.total_score
    ));

    let c = &eval.criteria;
    out.push_str("| criterion | score |\n|---|---|\n");
    out.push_str(&format!("| completeness | {:.0} |\n", c.completeness));
    out.push_str(&format!("| coherence | {:.0} |\n", c.coherence));
    out.push_str(&format!("| feasibility | {:.0} |\n", c.feasibility));
    out.push_str(&format!("| clarity | {:.0} |\n", c.clarity));
    if let Some(quality) = c.quality {
        out.push_str(&format!("| quality | {:.0} |\n", quality));
    }
    out.push('\n');

    push_list(&mut out, "Strengths", &eval.feedback.strengths);
    push_list(&mut out, "Weaknesses", &eval.feedback.weaknesses);
    push_list(&mut out, "Technical", &eval.feedback.technical);
    push_list(&mut out, "Functional", &eval.feedback.functional);
    push_list(&mut out, "Suggestions", &eval.improvement_suggestions);
    out
}

fn summarize(version: &SpecificationVersion) -> String {
    match version.modification_type {
        ModificationType::Creation => version
            .payload_as::<WebSpecification>()
            .map(|s| format!("{} pages, {} features", s.page_count(), s.features.len()))
            .unwrap_or_default(),
        ModificationType::Evaluation => version
            .payload_as::<EvaluationResult>()
            .map(|e| format!("score {:.2}", e.total_score))
            .unwrap_or_default(),
        ModificationType::Optimization => version
            .payload_as::<OptimizationResult>()
            .map(|o| format!("{} changes", o.changes.len()))
            .unwrap_or_default(),
    }
}

/// Make free text safe inside one markdown table cell.
fn table_cell(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
        .replace('|', "\\|")
}

/// Render a root-first version chain as a markdown table.
pub fn render_history_md(ancestry: &[SpecificationVersion]) -> String {
    let mut out = String::new();
    out.push_str("# Version History\n\n");
    if ancestry.is_empty() {
        out.push_str("_no versions_\n");
        return out;
    }
    out.push_str("| version | parent | agent | type | summary | comment |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for v in ancestry {
        let parent = v
            .parent_version_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            v.version_id,
            parent,
            table_cell(v.agent_name.as_str()),
            v.modification_type,
            table_cell(&summarize(v)),
            table_cell(&v.comment)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::digest::payload_digest;
    use crate::domain::{AgentRole, EvaluationCriteria, EvaluationFeedback, VersionId};
    use chrono::Utc;
    use serde_json::json;

    fn spec() -> WebSpecification {
        serde_json::from_value(json!({
            "project_name": "Recettes",
            "description": "Recipe sharing site",
            "pages": {"home": {"name": "Home", "components": ["search bar"]}},
            "features": ["publish recipes"],
            "tech_stack": {"frontend": ["React"]},
            "security_requirements": ["HTTPS"]
        }))
        .unwrap()
    }

    fn evaluation() -> EvaluationResult {
        EvaluationResult {
            specification_version: VersionId::new(1),
            criteria: EvaluationCriteria {
                completeness: 70.0,
                coherence: 75.0,
                feasibility: 70.0,
                clarity: 72.0,
                quality: None,
            },
            total_score: 0.72,
            feedback: EvaluationFeedback {
                weaknesses: vec!["no moderation".into()],
                ..Default::default()
            },
            improvement_suggestions: vec!["add moderation".into()],
            evaluator_name: AgentRole::Evaluator,
        }
    }

    #[test]
    fn test_render_specification_md() {
        let md = render_specification_md(&spec());
        assert!(md.starts_with("# Recettes\n"));
        assert!(md.contains("### Home (`home`)"));
        assert!(md.contains("- components: search bar"));
        assert!(md.contains("- frontend: React"));
        assert!(md.contains("## Security\n- HTTPS"));
        assert!(!md.contains("## SEO"));
    }

    #[test]
    fn test_render_evaluation_md() {
        let md = render_evaluation_md(&evaluation());
        assert!(md.contains("# Evaluation of v1"));
        assert!(md.contains("**Total score:** 0.72"));
        assert!(md.contains("| completeness | 70 |"));
        assert!(!md.contains("| quality |"));
        assert!(md.contains("## Weaknesses\n- no moderation"));
    }

    #[test]
    fn test_render_history_md() {
        let payload = serde_json::to_value(spec()).unwrap();
        let root = SpecificationVersion {
            version_id: VersionId::new(1),
            parent_version_id: None,
            agent_name: AgentRole::Writer,
            modification_type: ModificationType::Creation,
            timestamp: Utc::now(),
            payload_digest: payload_digest(&payload),
            payload,
            comment: "Initial specification".into(),
        };
        let eval_payload = serde_json::to_value(evaluation()).unwrap();
        let eval = SpecificationVersion {
            version_id: VersionId::new(2),
            parent_version_id: Some(VersionId::new(1)),
            agent_name: AgentRole::Evaluator,
            modification_type: ModificationType::Evaluation,
            timestamp: Utc::now(),
            payload_digest: payload_digest(&eval_payload),
            payload: eval_payload,
            comment: "Evaluation of v1".into(),
        };

        let md = render_history_md(&[root, eval]);
        assert!(md.contains("| v1 | - | Writer | creation | 1 pages, 1 features |"));
        assert!(md.contains("| v2 | v1 | Evaluator | evaluation | score 0.72 |"));
        assert!(render_history_md(&[]).contains("_no versions_"));
    }

    #[test]
    fn test_history_cells_escape_pipes_and_newlines() {
        let payload = serde_json::to_value(spec()).unwrap();
        let root = SpecificationVersion {
            version_id: VersionId::new(1),
            parent_version_id: None,
            agent_name: AgentRole::from("QA | review"),
            modification_type: ModificationType::Creation,
            timestamp: Utc::now(),
            payload_digest: payload_digest(&payload),
            payload,
            comment: "first line\nsecond | part\r\n".into(),
        };

        let md = render_history_md(&[root]);
        let rows: Vec<&str> = md.lines().filter(|l| l.starts_with("| v1 ")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("QA \\| review"));
        assert!(rows[0].ends_with("| first line<br>second \\| part |"));
    }
}
