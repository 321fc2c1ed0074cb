//! Per-session context: version history, dependency requests and the
//! current user description.
//!
//! `ContextManager` is the only API the agents see. It validates payloads
//! before they reach the [`VersionStore`] and checks that a dependency's
//! source version exists before it reaches the [`DependencyRegistry`].

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dependency::DependencyRegistry;
use crate::domain::{
    validate_payload, AgentRole, CahierError, DependencyContext, DependencyRequest,
    ModificationType, RequestId, Result, SpecificationVersion, VersionId,
};
use crate::version_store::VersionStore;

/// Serializable image of a whole session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub user_input: Option<String>,
    pub versions: Vec<SpecificationVersion>,
    pub requests: Vec<DependencyRequest>,
}

/// One session's state. Share it with `Arc`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct ContextManager {
    versions: VersionStore,
    dependencies: DependencyRegistry,
    user_input: Mutex<Option<String>>,
}

fn default_comment(action: ModificationType, parent: Option<VersionId>) -> String {
    match (action, parent) {
        (ModificationType::Creation, _) => "Initial specification".to_string(),
        (ModificationType::Evaluation, Some(p)) => format!("Evaluation of {p}"),
        (ModificationType::Optimization, Some(p)) => format!("Optimization following {p}"),
        (action, None) => format!("Root {action}"),
    }
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current user description. No history is kept.
    pub fn set_user_input(&self, text: impl Into<String>) {
        let text = text.into();
        debug!(chars = text.len(), "user input updated");
        *self
            .user_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(text);
    }

    /// The current user description, if one has been set.
    pub fn get_user_input(&self) -> Option<String> {
        self.user_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate `payload` for `action_type` and append it as a new version.
    pub fn store_specification_version(
        &self,
        payload: serde_json::Value,
        agent_name: AgentRole,
        action_type: ModificationType,
        parent_id: Option<VersionId>,
    ) -> Result<VersionId> {
        let comment = default_comment(action_type, parent_id);
        self.store_specification_version_with_comment(
            payload,
            agent_name,
            action_type,
            parent_id,
            &comment,
        )
    }

    /// Same as [`store_specification_version`](Self::store_specification_version)
    /// with an explicit rationale.
    pub fn store_specification_version_with_comment(
        &self,
        payload: serde_json::Value,
        agent_name: AgentRole,
        action_type: ModificationType,
        parent_id: Option<VersionId>,
        comment: &str,
    ) -> Result<VersionId> {
        if agent_name.is_blank() {
            return Err(CahierError::EmptyAgentName);
        }
        validate_payload(action_type, &payload)?;
        self.versions
            .create_version(payload, agent_name, action_type, parent_id, comment)
    }

    /// Register follow-up work for `target_agent`.
    ///
    /// Fails with `NotFound` if the context's source version is unknown.
    pub fn register_agent_dependency(
        &self,
        source_agent: AgentRole,
        target_agent: AgentRole,
        context: DependencyContext,
    ) -> Result<RequestId> {
        if !self.versions.contains(context.source_version_id) {
            return Err(CahierError::NotFound(context.source_version_id));
        }
        self.dependencies.register(
            context.source_version_id,
            source_agent,
            target_agent,
            context.context_type,
            context.data,
            context.priority,
        )
    }

    pub fn get_version(&self, version_id: VersionId) -> Result<SpecificationVersion> {
        self.versions.get_version(version_id)
    }

    pub fn get_ancestry(&self, version_id: VersionId) -> Result<Vec<SpecificationVersion>> {
        self.versions.get_ancestry(version_id)
    }

    pub fn latest_version(&self) -> Option<SpecificationVersion> {
        self.versions.latest()
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn dependencies(&self) -> &DependencyRegistry {
        &self.dependencies
    }

    pub fn pending_for(&self, target_agent: &AgentRole) -> Vec<DependencyRequest> {
        self.dependencies.pending_for(target_agent)
    }

    pub fn acknowledge(&self, request_id: RequestId) -> Result<()> {
        self.dependencies.acknowledge(request_id)
    }

    /// Acknowledge every pending request for `target_agent` raised about
    /// `source_version_id`. Returns how many were consumed.
    pub fn acknowledge_pending(
        &self,
        target_agent: &AgentRole,
        source_version_id: VersionId,
    ) -> Result<usize> {
        let matching: Vec<RequestId> = self
            .dependencies
            .pending_for(target_agent)
            .into_iter()
            .filter(|r| r.source_version_id == source_version_id)
            .map(|r| r.request_id)
            .collect();
        for id in &matching {
            self.dependencies.acknowledge(*id)?;
        }
        Ok(matching.len())
    }

    /// Capture the whole session.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            user_input: self.get_user_input(),
            versions: self.versions.list(),
            requests: self.dependencies.all(),
        }
    }

    /// Rebuild a session from a snapshot, re-checking history integrity.
    pub fn restore(snapshot: ContextSnapshot) -> Result<Self> {
        let versions = VersionStore::from_records(snapshot.versions)?;
        if let Some(orphan) = snapshot
            .requests
            .iter()
            .find(|r| !versions.contains(r.source_version_id))
        {
            return Err(CahierError::NotFound(orphan.source_version_id));
        }
        let dependencies = DependencyRegistry::from_requests(snapshot.requests)?;
        Ok(Self {
            versions,
            dependencies,
            user_input: Mutex::new(snapshot.user_input),
        })
    }

    /// Write the session snapshot as pretty JSON.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let content =
            serde_json::to_string_pretty(&self.snapshot()).context("serialize session snapshot")?;
        std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Load a session previously written by [`save_json`](Self::save_json).
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let snapshot: ContextSnapshot =
            serde_json::from_str(&content).context("parse session snapshot")?;
        Ok(Self::restore(snapshot)?)
    }
}
