//! Agent identities.

use serde::{Deserialize, Serialize};

/// The role that produced a version or issued a dependency request.
///
/// The three pipeline roles are closed variants; `Custom` carries any other
/// agent name so new roles can be added without touching the stores.
/// Build roles from names with `AgentRole::from`, which maps the known
/// names onto the closed variants. A role therefore has exactly one value
/// per name, and survives a serialize/deserialize cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentRole {
    Writer,
    Evaluator,
    Optimizer,
    Custom(CustomRole),
}

/// Name of a role outside the pipeline. Only `AgentRole::from` creates one,
/// trimmed and never equal to a built-in role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomRole(String);

impl CustomRole {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AgentRole {
    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Writer => "Writer",
            AgentRole::Evaluator => "Evaluator",
            AgentRole::Optimizer => "Optimizer",
            AgentRole::Custom(name) => name.as_str(),
        }
    }

    /// True for an empty or whitespace-only custom name.
    pub fn is_blank(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for AgentRole {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "writer" | "specificationwriter" | "specification_writer" => AgentRole::Writer,
            "evaluator" => AgentRole::Evaluator,
            "optimizer" => AgentRole::Optimizer,
            _ => AgentRole::Custom(CustomRole(name.trim().to_string())),
        }
    }
}

impl From<String> for AgentRole {
    fn from(name: String) -> Self {
        AgentRole::from(name.as_str())
    }
}

impl From<AgentRole> for String {
    fn from(role: AgentRole) -> Self {
        role.as_str().to_string()
    }
}
