//! Prompt builders for the three agents.
//!
//! Wording is deliberately plain; only the JSON shapes matter to the
//! parsers in `domain`.

use crate::domain::{EvaluationResult, WebSpecification};

pub const WRITER_SYSTEM_PROMPT: &str = "\
You are an expert at writing functional specifications for web applications. \
Analyse the project context in depth, cover every page and feature it implies, \
propose a suitable technical stack, and include performance, security, SEO and \
accessibility requirements where relevant. Answer with a single JSON object and nothing else.";

pub const EVALUATOR_SYSTEM_PROMPT: &str = "\
You are an expert reviewer of web application specifications. Score the \
specification against the original project context on five criteria: \
completeness (25%), coherence (25%), clarity (20%), feasibility (15%) and \
quality (15%). Each criterion is scored from 0 to 100; the total score is the \
weighted mean scaled to 0.0-1.0. Answer with a single JSON object and nothing else.";

pub const OPTIMIZER_SYSTEM_PROMPT: &str = "\
You are an expert at improving web application specifications. Address every \
weakness raised by the evaluation, keep the specification consistent with the \
original context, and document each change with the field it touches and why. \
Answer with a single JSON object and nothing else.";

const SPECIFICATION_SHAPE: &str = r#"{
  "project_name": "string",
  "description": "string",
  "target_audience": "string",
  "pages": {
    "page_slug": {
      "name": "string",
      "description": "string",
      "components": ["string"],
      "dynamic_elements": ["string"],
      "interactions": ["string"]
    }
  },
  "features": ["string"],
  "tech_stack": {
    "frontend": ["string"],
    "backend": ["string"],
    "database": ["string"],
    "testing": ["string"],
    "deployment": ["string"]
  },
  "responsive_design": true,
  "performance_requirements": {"metric": "target"},
  "security_requirements": ["string"],
  "seo_requirements": ["string"],
  "accessibility_requirements": ["string"]
}"#;

const EVALUATION_SHAPE: &str = r#"{
  "criteria": {
    "completeness": 0-100,
    "coherence": 0-100,
    "feasibility": 0-100,
    "clarity": 0-100,
    "quality": 0-100
  },
  "total_score": 0.0-1.0,
  "feedback": {
    "strengths": ["string"],
    "weaknesses": ["string"],
    "technical": ["string"],
    "functional": ["string"]
  },
  "improvement_suggestions": ["string"]
}"#;

const OPTIMIZATION_SHAPE: &str = r#"{
  "improved_specification": { ...complete specification, same shape as the input... },
  "changes": [
    {
      "field_path": "pages.home.components",
      "previous_value": "...",
      "new_value": "...",
      "reason": "string"
    }
  ],
  "optimization_score": 0.0-1.0
}"#;

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub fn writer_prompt(user_input: &str) -> String {
    format!(
        "Project context:\n{user_input}\n\n\
         Write a complete specification as JSON with exactly this structure:\n{SPECIFICATION_SHAPE}"
    )
}

pub fn evaluator_prompt(user_input: &str, spec: &WebSpecification) -> String {
    format!(
        "Original project context:\n{user_input}\n\n\
         Specification to evaluate:\n{}\n\n\
         Reply with JSON of this shape:\n{EVALUATION_SHAPE}",
        pretty(spec)
    )
}

pub fn optimizer_prompt(
    user_input: &str,
    spec: &WebSpecification,
    evaluation: &EvaluationResult,
) -> String {
    let c = &evaluation.criteria;
    format!(
        "Original project context:\n{user_input}\n\n\
         Current specification:\n{spec}\n\n\
         Evaluation received (total score {total}):\n\
         - completeness: {completeness}\n\
         - coherence: {coherence}\n\
         - feasibility: {feasibility}\n\
         - clarity: {clarity}\n\n\
         Strengths: {strengths}\n\
         Weaknesses: {weaknesses}\n\
         Technical remarks: {technical}\n\
         Functional remarks: {functional}\n\
         Suggestions: {suggestions}\n\n\
         Reply with JSON of this shape:\n{OPTIMIZATION_SHAPE}",
        spec = pretty(spec),
        total = evaluation.total_score,
        completeness = c.completeness,
        coherence = c.coherence,
        feasibility = c.feasibility,
        clarity = c.clarity,
        strengths = pretty(&evaluation.feedback.strengths),
        weaknesses = pretty(&evaluation.feedback.weaknesses),
        technical = pretty(&evaluation.feedback.technical),
        functional = pretty(&evaluation.feedback.functional),
        suggestions = pretty(&evaluation.improvement_suggestions),
    )
}
