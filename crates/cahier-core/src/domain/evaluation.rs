//! Evaluation results produced by the evaluator agent.

use serde::{Deserialize, Serialize};

use super::agent::AgentRole;
use super::validation::Validate;
use super::version::VersionId;

/// Per-criterion scores, each on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
    pub completeness: f64,
    pub coherence: f64,
    pub feasibility: f64,
    pub clarity: f64,
    /// Not always reported; see [`EvaluationCriteria::quality_or_mean`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

impl EvaluationCriteria {
    pub const COMPLETENESS_WEIGHT: f64 = 0.25;
    pub const COHERENCE_WEIGHT: f64 = 0.25;
    pub const CLARITY_WEIGHT: f64 = 0.20;
    pub const FEASIBILITY_WEIGHT: f64 = 0.15;
    pub const QUALITY_WEIGHT: f64 = 0.15;

    /// Reported quality score, or the mean of the four other criteria.
    pub fn quality_or_mean(&self) -> f64 {
        self.quality.unwrap_or(
            (self.completeness + self.coherence + self.feasibility + self.clarity) / 4.0,
        )
    }

    /// Weighted average on a 0.0–1.0 scale.
    pub fn weighted_score(&self) -> f64 {
        let sum = self.completeness * Self::COMPLETENESS_WEIGHT
            + self.coherence * Self::COHERENCE_WEIGHT
            + self.clarity * Self::CLARITY_WEIGHT
            + self.feasibility * Self::FEASIBILITY_WEIGHT
            + self.quality_or_mean() * Self::QUALITY_WEIGHT;
        sum / 100.0
    }

    fn named(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("completeness", Some(self.completeness)),
            ("coherence", Some(self.coherence)),
            ("feasibility", Some(self.feasibility)),
            ("clarity", Some(self.clarity)),
            ("quality", self.quality),
        ]
    }
}

impl Validate for EvaluationCriteria {
    fn validate(&self) -> Result<(), String> {
        for (name, score) in self.named() {
            if let Some(score) = score {
                if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                    return Err(format!("criterion {name} must be within 0..=100, got {score}"));
                }
            }
        }
        Ok(())
    }
}

/// Qualitative feedback grouped by theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFeedback {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub technical: Vec<String>,
    #[serde(default)]
    pub functional: Vec<String>,
}

/// The evaluator's reply before it is bound to a stored version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluationDraft {
    pub criteria: EvaluationCriteria,
    #[serde(alias = "score")]
    pub total_score: f64,
    #[serde(default)]
    pub feedback: EvaluationFeedback,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

impl Validate for EvaluationDraft {
    fn validate(&self) -> Result<(), String> {
        self.criteria.validate()?;
        validate_unit_score("total_score", self.total_score)
    }
}

/// A stored evaluation of one specification version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub specification_version: VersionId,
    pub criteria: EvaluationCriteria,
    pub total_score: f64,
    #[serde(default)]
    pub feedback: EvaluationFeedback,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    pub evaluator_name: AgentRole,
}

impl EvaluationResult {
    pub fn from_draft(draft: EvaluationDraft, specification_version: VersionId) -> Self {
        Self {
            specification_version,
            criteria: draft.criteria,
            total_score: draft.total_score,
            feedback: draft.feedback,
            improvement_suggestions: draft.improvement_suggestions,
            evaluator_name: AgentRole::Evaluator,
        }
    }

    /// Whether the score is below the optimization threshold.
    pub fn needs_optimization(&self, threshold: f64) -> bool {
        self.total_score < threshold
    }
}

impl Validate for EvaluationResult {
    fn validate(&self) -> Result<(), String> {
        self.criteria.validate()?;
        validate_unit_score("total_score", self.total_score)
    }
}

pub(crate) fn validate_unit_score(field: &str, score: f64) -> Result<(), String> {
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(format!("{field} must be within 0.0..=1.0, got {score}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn criteria(c: f64, coh: f64, f: f64, cl: f64, q: Option<f64>) -> EvaluationCriteria {
        EvaluationCriteria {
            completeness: c,
            coherence: coh,
            feasibility: f,
            clarity: cl,
            quality: q,
        }
    }

    #[test]
    fn test_weighted_score_with_quality() {
        let c = criteria(80.0, 80.0, 80.0, 80.0, Some(80.0));
        assert!((c.weighted_score() - 0.8).abs() < 1e-9);

        let c = criteria(100.0, 0.0, 0.0, 0.0, Some(0.0));
        assert!((c.weighted_score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_quality_uses_mean() {
        let c = criteria(90.0, 70.0, 60.0, 80.0, None);
        assert!((c.quality_or_mean() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_criteria_out_of_range_rejected() {
        let c = criteria(120.0, 70.0, 60.0, 80.0, None);
        let err = c.validate().unwrap_err();
        assert!(err.contains("completeness"));

        let c = criteria(20.0, 70.0, 60.0, 80.0, Some(-1.0));
        assert!(c.validate().unwrap_err().contains("quality"));
    }

    #[test]
    fn test_draft_accepts_score_alias() {
        let draft: EvaluationDraft = serde_json::from_value(json!({
            "criteria": {"completeness": 70, "coherence": 75, "feasibility": 70, "clarity": 72},
            "score": 0.72
        }))
        .unwrap();
        assert!((draft.total_score - 0.72).abs() < 1e-9);
        assert!(draft.feedback.strengths.is_empty());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_total_score_out_of_range() {
        let draft: EvaluationDraft = serde_json::from_value(json!({
            "criteria": {"completeness": 70, "coherence": 75, "feasibility": 70, "clarity": 72},
            "total_score": 72
        }))
        .unwrap();
        assert!(draft.validate().unwrap_err().contains("total_score"));
    }

    #[test]
    fn test_needs_optimization_is_strictly_below_threshold() {
        let draft: EvaluationDraft = serde_json::from_value(json!({
            "criteria": {"completeness": 90, "coherence": 90, "feasibility": 90, "clarity": 90},
            "total_score": 0.9
        }))
        .unwrap();
        let result = EvaluationResult::from_draft(draft, VersionId::new(1));
        assert!(!result.needs_optimization(0.9));
        assert!(result.needs_optimization(0.95));
        assert_eq!(result.evaluator_name, AgentRole::Evaluator);
    }
}
