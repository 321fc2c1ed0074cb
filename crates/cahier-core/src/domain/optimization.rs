//! Optimization results produced by the optimizer agent.

use serde::{Deserialize, Serialize};

use super::agent::AgentRole;
use super::evaluation::validate_unit_score;
use super::specification::WebSpecification;
use super::validation::Validate;
use super::version::VersionId;

/// A single documented change between two specification versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChangeRepr")]
pub struct OptimizationChange {
    /// Dotted path of the changed field, e.g. `pages.home.components`.
    pub field_path: String,
    pub previous_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub reason: String,
}

#[derive(Deserialize)]
struct StructuredChange {
    #[serde(default)]
    field_path: String,
    #[serde(default)]
    previous_value: serde_json::Value,
    #[serde(default)]
    new_value: serde_json::Value,
    #[serde(default)]
    reason: String,
}

/// Changes arrive either structured or as plain sentences.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChangeRepr {
    Structured(StructuredChange),
    Note(String),
}

impl From<ChangeRepr> for OptimizationChange {
    fn from(repr: ChangeRepr) -> Self {
        match repr {
            ChangeRepr::Structured(c) => OptimizationChange {
                field_path: c.field_path,
                previous_value: c.previous_value,
                new_value: c.new_value,
                reason: c.reason,
            },
            ChangeRepr::Note(reason) => OptimizationChange {
                field_path: String::new(),
                previous_value: serde_json::Value::Null,
                new_value: serde_json::Value::Null,
                reason,
            },
        }
    }
}

/// The optimizer's reply before it is bound to a stored version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizationDraft {
    pub improved_specification: WebSpecification,
    #[serde(default, alias = "changes_made")]
    pub changes: Vec<OptimizationChange>,
    #[serde(default)]
    pub optimization_score: Option<f64>,
}

impl Validate for OptimizationDraft {
    fn validate(&self) -> Result<(), String> {
        self.improved_specification
            .validate()
            .map_err(|e| format!("improved_specification: {e}"))?;
        if let Some(score) = self.optimization_score {
            validate_unit_score("optimization_score", score)?;
        }
        Ok(())
    }
}

/// A stored optimization: the improved specification plus its change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// The specification version that was optimized.
    pub original_version_id: VersionId,
    /// The evaluation version the optimization responds to.
    pub evaluation_version_id: VersionId,
    pub improved_specification: WebSpecification,
    #[serde(default)]
    pub changes: Vec<OptimizationChange>,
    /// Optimizer's own estimate of the new score, if given.
    #[serde(default)]
    pub optimization_score: Option<f64>,
    pub optimizer_name: AgentRole,
}

impl OptimizationResult {
    pub fn from_draft(
        draft: OptimizationDraft,
        original_version_id: VersionId,
        evaluation_version_id: VersionId,
    ) -> Self {
        Self {
            original_version_id,
            evaluation_version_id,
            improved_specification: draft.improved_specification,
            changes: draft.changes,
            optimization_score: draft.optimization_score,
            optimizer_name: AgentRole::Optimizer,
        }
    }
}

impl Validate for OptimizationResult {
    fn validate(&self) -> Result<(), String> {
        self.improved_specification
            .validate()
            .map_err(|e| format!("improved_specification: {e}"))?;
        if let Some(score) = self.optimization_score {
            validate_unit_score("optimization_score", score)?;
        }
        Ok(())
    }
}
