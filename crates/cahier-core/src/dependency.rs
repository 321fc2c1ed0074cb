//! Registry of follow-up work requested between agents.
//!
//! Requests are recorded once and read many times. The only state change
//! after registration is the one-way `acknowledged` marker.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::domain::{
    AgentRole, CahierError, ContextType, DependencyRequest, Priority, RequestId, Result,
    VersionId,
};
use crate::metrics::METRICS;
use crate::obs;

#[derive(Debug, Default)]
struct Inner {
    /// Registration order; `request_id` n lives at index n - 1.
    requests: Vec<DependencyRequest>,
}

impl Inner {
    fn position(&self, request_id: RequestId) -> Option<usize> {
        let idx = usize::try_from(request_id.get()).ok()?.checked_sub(1)?;
        (idx < self.requests.len()).then_some(idx)
    }
}

/// Per-session dependency requests.
#[derive(Debug, Default)]
pub struct DependencyRegistry {
    inner: Mutex<Inner>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request from `source_agent` to `target_agent`.
    ///
    /// The target is an open set of names; only a blank name is refused.
    /// Source-version existence is the caller's check (see `ContextManager`).
    pub fn register(
        &self,
        source_version_id: VersionId,
        source_agent: AgentRole,
        target_agent: AgentRole,
        context_type: ContextType,
        data: serde_json::Map<String, serde_json::Value>,
        priority: Priority,
    ) -> Result<RequestId> {
        if target_agent.is_blank() {
            return Err(CahierError::EmptyAgentName);
        }

        let mut inner = self.lock();
        let request_id = RequestId::new(inner.requests.len() as u64 + 1);
        obs::emit_dependency_registered(
            request_id,
            &source_agent,
            &target_agent,
            &context_type,
            priority,
        );
        inner.requests.push(DependencyRequest {
            request_id,
            source_version_id,
            source_agent,
            target_agent,
            context_type,
            data,
            priority,
            registered_at: Utc::now(),
            acknowledged: false,
        });
        METRICS.inc_requests_registered();
        Ok(request_id)
    }

    /// Unacknowledged requests for `target_agent`, most urgent first.
    ///
    /// Lower priority numbers come first; equal priorities keep
    /// registration order. Reading does not consume anything.
    pub fn pending_for(&self, target_agent: &AgentRole) -> Vec<DependencyRequest> {
        let mut pending: Vec<DependencyRequest> = self
            .lock()
            .requests
            .iter()
            .filter(|r| !r.acknowledged && &r.target_agent == target_agent)
            .cloned()
            .collect();
        // stable sort keeps registration order within a priority
        pending.sort_by_key(|r| r.priority);
        pending
    }

    /// Mark a request as consumed. Acknowledging twice is a no-op.
    pub fn acknowledge(&self, request_id: RequestId) -> Result<()> {
        let mut inner = self.lock();
        let idx = inner
            .position(request_id)
            .ok_or(CahierError::RequestNotFound(request_id))?;
        let request = &mut inner.requests[idx];
        if !request.acknowledged {
            request.acknowledged = true;
            obs::emit_dependency_acknowledged(request_id, &request.target_agent);
        }
        Ok(())
    }

    pub fn get(&self, request_id: RequestId) -> Result<DependencyRequest> {
        let inner = self.lock();
        inner
            .position(request_id)
            .map(|idx| inner.requests[idx].clone())
            .ok_or(CahierError::RequestNotFound(request_id))
    }

    /// Requests raised about `version_id`, in registration order.
    pub fn from_source(&self, version_id: VersionId) -> Vec<DependencyRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.source_version_id == version_id)
            .cloned()
            .collect()
    }

    /// Every request in registration order, acknowledged or not.
    pub fn all(&self) -> Vec<DependencyRequest> {
        self.lock().requests.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().requests.is_empty()
    }

    /// Rebuild a registry from exported requests.
    ///
    /// Ids must be exactly `req-1..=req-n` in order, which is what `all`
    /// exports.
    pub fn from_requests(requests: Vec<DependencyRequest>) -> Result<Self> {
        for (idx, request) in requests.iter().enumerate() {
            if request.request_id.get() != idx as u64 + 1 {
                return Err(CahierError::MalformedPayload(format!(
                    "request {} out of sequence at position {}",
                    request.request_id,
                    idx + 1
                )));
            }
        }
        Ok(Self {
            inner: Mutex::new(Inner { requests }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(reg: &DependencyRegistry, target: AgentRole, priority: Priority) -> RequestId {
        reg.register(
            VersionId::new(1),
            AgentRole::Writer,
            target,
            ContextType::EvaluationRequest,
            serde_json::Map::new(),
            priority,
        )
        .unwrap()
    }

    #[test]
    fn test_pending_orders_by_priority_then_registration() {
        let reg = DependencyRegistry::new();
        let a = register(&reg, AgentRole::Evaluator, 2);
        let b = register(&reg, AgentRole::Evaluator, 1);
        let c = register(&reg, AgentRole::Evaluator, 1);

        let ids: Vec<_> = reg
            .pending_for(&AgentRole::Evaluator)
            .iter()
            .map(|r| r.request_id)
            .collect();
        assert_eq!(ids, vec![b, c, a]);
    }

    #[test]
    fn test_pending_filters_by_target() {
        let reg = DependencyRegistry::new();
        register(&reg, AgentRole::Evaluator, 1);
        let opt = register(&reg, AgentRole::Optimizer, 2);

        let pending = reg.pending_for(&AgentRole::Optimizer);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, opt);
        assert!(reg
            .pending_for(&AgentRole::from("Translator"))
            .is_empty());
    }

    #[test]
    fn test_pending_is_non_destructive() {
        let reg = DependencyRegistry::new();
        register(&reg, AgentRole::Evaluator, 1);

        let first = reg.pending_for(&AgentRole::Evaluator);
        let second = reg.pending_for(&AgentRole::Evaluator);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_acknowledge_removes_from_pending_and_is_idempotent() {
        let reg = DependencyRegistry::new();
        let a = register(&reg, AgentRole::Evaluator, 1);
        let b = register(&reg, AgentRole::Evaluator, 1);

        reg.acknowledge(a).unwrap();
        reg.acknowledge(a).unwrap();

        let pending = reg.pending_for(&AgentRole::Evaluator);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, b);
        assert!(reg.get(a).unwrap().acknowledged);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_acknowledge_unknown_request() {
        let reg = DependencyRegistry::new();
        assert!(matches!(
            reg.acknowledge(RequestId::new(1)),
            Err(CahierError::RequestNotFound(_))
        ));
        assert!(matches!(
            reg.acknowledge(RequestId::new(0)),
            Err(CahierError::RequestNotFound(_))
        ));
    }

    #[test]
    fn test_blank_target_rejected() {
        let reg = DependencyRegistry::new();
        let err = reg
            .register(
                VersionId::new(1),
                AgentRole::Writer,
                AgentRole::from(""),
                ContextType::EvaluationRequest,
                serde_json::Map::new(),
                1,
            )
            .unwrap_err();
        assert!(matches!(err, CahierError::EmptyAgentName));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_from_source_and_round_trip_export() {
        let reg = DependencyRegistry::new();
        register(&reg, AgentRole::Evaluator, 1);
        reg.register(
            VersionId::new(2),
            AgentRole::Evaluator,
            AgentRole::Optimizer,
            ContextType::OptimizationRequest,
            serde_json::Map::new(),
            2,
        )
        .unwrap();

        assert_eq!(reg.from_source(VersionId::new(2)).len(), 1);

        let restored = DependencyRegistry::from_requests(reg.all()).unwrap();
        assert_eq!(restored.all(), reg.all());
        let next = register(&restored, AgentRole::Evaluator, 1);
        assert_eq!(next, RequestId::new(3));
    }

    #[test]
    fn test_from_requests_rejects_gaps() {
        let reg = DependencyRegistry::new();
        register(&reg, AgentRole::Evaluator, 1);
        register(&reg, AgentRole::Evaluator, 1);
        let mut exported = reg.all();
        exported.remove(0);
        assert!(DependencyRegistry::from_requests(exported).is_err());
    }
}
