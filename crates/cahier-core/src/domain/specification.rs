//! The web application specification document ("cahier des charges").

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::validation::Validate;

/// Description of a single page of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub dynamic_elements: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<String>,
}

impl PageSection {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            components: Vec::new(),
            dynamic_elements: Vec::new(),
            interactions: Vec::new(),
        }
    }
}

/// Layer of the technical stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechStackCategory {
    Frontend,
    Backend,
    Database,
    Testing,
    Deployment,
}

impl std::fmt::Display for TechStackCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frontend => write!(f, "frontend"),
            Self::Backend => write!(f, "backend"),
            Self::Database => write!(f, "database"),
            Self::Testing => write!(f, "testing"),
            Self::Deployment => write!(f, "deployment"),
        }
    }
}

/// Structured specification of a web application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSpecification {
    pub project_name: String,
    pub description: String,
    #[serde(default)]
    pub target_audience: String,
    /// Keyed by page slug. A bare list of distinct page names is also
    /// accepted, keyed by name; a repeated name is an error.
    #[serde(deserialize_with = "pages_from_map_or_list")]
    pub pages: BTreeMap<String, PageSection>,
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: BTreeMap<TechStackCategory, Vec<String>>,
    #[serde(default = "default_true")]
    pub responsive_design: bool,
    #[serde(default)]
    pub performance_requirements: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub security_requirements: Vec<String>,
    #[serde(default)]
    pub seo_requirements: Vec<String>,
    #[serde(default)]
    pub accessibility_requirements: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PagesRepr {
    Map(BTreeMap<String, PageSection>),
    Names(Vec<String>),
}

fn pages_from_map_or_list<'de, D>(deserializer: D) -> Result<BTreeMap<String, PageSection>, D::Error>
where
    D: Deserializer<'de>,
{
    match PagesRepr::deserialize(deserializer)? {
        PagesRepr::Map(map) => Ok(map),
        PagesRepr::Names(names) => {
            let mut pages = BTreeMap::new();
            for name in names {
                let name = name.trim();
                if pages.insert(name.to_string(), PageSection::named(name)).is_some() {
                    return Err(D::Error::custom(format!("duplicate page name {name:?}")));
                }
            }
            Ok(pages)
        }
    }
}

impl WebSpecification {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl Validate for WebSpecification {
    fn validate(&self) -> Result<(), String> {
        if self.project_name.trim().is_empty() {
            return Err("project_name must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if self.pages.is_empty() {
            return Err("specification must declare at least one page".to_string());
        }
        if let Some((key, _)) = self.pages.iter().find(|(_, p)| p.name.trim().is_empty()) {
            return Err(format!("page {key:?} has an empty name"));
        }
        if self.features.is_empty() {
            return Err("specification must list at least one feature".to_string());
        }
        Ok(())
    }
}
