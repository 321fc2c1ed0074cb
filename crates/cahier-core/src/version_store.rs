//! Append-only store of specification versions.
//!
//! Every mutation goes through one mutex guarding both the records and the
//! id counter, so concurrent `create_version` calls never hand out the
//! same id or lose a record. Records are cloned out; callers never hold a
//! reference into the store.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, error};

use crate::domain::digest::payload_digest;
use crate::domain::{
    AgentRole, CahierError, ModificationType, Result, SpecificationVersion, VersionId,
};
use crate::metrics::METRICS;
use crate::obs;

#[derive(Debug, Default)]
struct Inner {
    versions: Vec<SpecificationVersion>,
    index: HashMap<VersionId, usize>,
    last_id: u64,
}

impl Inner {
    fn get(&self, id: VersionId) -> Option<&SpecificationVersion> {
        self.index.get(&id).map(|&i| &self.versions[i])
    }
}

/// Versions of one session, in creation order.
#[derive(Debug, Default)]
pub struct VersionStore {
    inner: Mutex<Inner>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Records are only ever pushed whole, so a poisoned guard still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new version and return its freshly assigned id.
    ///
    /// Fails with `UnknownParent` (leaving the store untouched) if
    /// `parent_version_id` does not resolve.
    pub fn create_version(
        &self,
        payload: serde_json::Value,
        agent_name: AgentRole,
        modification_type: ModificationType,
        parent_version_id: Option<VersionId>,
        comment: &str,
    ) -> Result<VersionId> {
        let digest = payload_digest(&payload);
        let mut inner = self.lock();

        if let Some(parent) = parent_version_id {
            if !inner.index.contains_key(&parent) {
                return Err(CahierError::UnknownParent(parent));
            }
        }

        inner.last_id += 1;
        let version_id = VersionId::new(inner.last_id);
        let record = SpecificationVersion {
            version_id,
            parent_version_id,
            agent_name,
            modification_type,
            timestamp: Utc::now(),
            payload,
            payload_digest: digest,
            comment: comment.to_string(),
        };

        let position = inner.versions.len();
        inner.index.insert(version_id, position);
        inner.versions.push(record);
        let record = &inner.versions[position];

        obs::emit_version_stored(
            version_id,
            parent_version_id,
            &record.agent_name,
            modification_type,
        );
        METRICS.inc_versions_created();
        Ok(version_id)
    }

    /// Look up a version by id.
    pub fn get_version(&self, version_id: VersionId) -> Result<SpecificationVersion> {
        self.lock()
            .get(version_id)
            .cloned()
            .ok_or(CahierError::NotFound(version_id))
    }

    pub fn contains(&self, version_id: VersionId) -> bool {
        self.lock().index.contains_key(&version_id)
    }

    /// Root-first chain of versions ending at `version_id`.
    pub fn get_ancestry(&self, version_id: VersionId) -> Result<Vec<SpecificationVersion>> {
        let inner = self.lock();
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(version_id);

        while let Some(id) = cursor {
            if !seen.insert(id) {
                error!(
                    event = "history.cycle_detected",
                    version_id = %id,
                    start = %version_id,
                    "version history is inconsistent"
                );
                return Err(CahierError::CycleDetected(id));
            }
            let record = inner.get(id).ok_or(CahierError::NotFound(id))?;
            cursor = record.parent_version_id;
            chain.push(record.clone());
        }

        chain.reverse();
        debug!(version_id = %version_id, depth = chain.len(), "ancestry resolved");
        Ok(chain)
    }

    /// Most recently created version.
    pub fn latest(&self) -> Option<SpecificationVersion> {
        self.lock().versions.last().cloned()
    }

    /// Versions whose parent is `version_id`, in creation order.
    pub fn children(&self, version_id: VersionId) -> Vec<SpecificationVersion> {
        self.lock()
            .versions
            .iter()
            .filter(|v| v.parent_version_id == Some(version_id))
            .cloned()
            .collect()
    }

    /// All versions in creation order.
    pub fn list(&self) -> Vec<SpecificationVersion> {
        self.lock().versions.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().versions.is_empty()
    }

    /// Rebuild a store from previously exported records.
    ///
    /// Rejects duplicate ids, dangling parents and payloads whose digest no
    /// longer matches. Parent ordering is not checked, so a hand-edited
    /// history may still contain a cycle; `get_ancestry` reports it.
    /// New ids continue after the highest imported id.
    pub fn from_records(records: Vec<SpecificationVersion>) -> Result<Self> {
        let mut inner = Inner::default();

        for record in records {
            if let Some(actual) = record.verify() {
                return Err(CahierError::DigestMismatch {
                    version: record.version_id,
                    expected: record.payload_digest.clone(),
                    actual,
                });
            }
            if inner.index.contains_key(&record.version_id) {
                return Err(CahierError::DuplicateVersion(record.version_id));
            }
            inner.last_id = inner.last_id.max(record.version_id.get());
            inner.index.insert(record.version_id, inner.versions.len());
            inner.versions.push(record);
        }

        if let Some(dangling) = inner
            .versions
            .iter()
            .filter_map(|v| v.parent_version_id)
            .find(|p| !inner.index.contains_key(p))
        {
            return Err(CahierError::UnknownParent(dangling));
        }

        debug!(versions = inner.versions.len(), "version store restored");
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }
}
