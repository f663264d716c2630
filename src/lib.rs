pub mod domain;
pub mod services;
pub mod store;

use {
    chrono::{DateTime, Utc},
    serde_json::Value,
    std::collections::BTreeMap,
    std::sync::Arc,
    uuid::Uuid,
};

use crate::{
    domain::audit::AuditRecord,
    domain::error::AuditError,
    domain::id::{ActorRef, RecordRef, RecordType},
    domain::policy::{AuditOptions, PolicyRegistry},
    services::history::{HistoryEntry, HistoryProjector},
    services::recorder::Recorder,
    services::restore::{RestorePlan, Restorer},
    store::{AuditQuery, AuditStore, SortOrder},
    store::memory::MemoryAuditStore,
};

/// One audit engine over one store: policy configuration, the capture path,
/// and the read-side query/restore surface, wired together.
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    policies: Arc<PolicyRegistry>,
    recorder: Recorder,
    projector: HistoryProjector,
    restorer: Restorer,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        let policies = Arc::new(PolicyRegistry::new());
        Self {
            recorder: Recorder::new(Arc::clone(&store), Arc::clone(&policies)),
            projector: HistoryProjector::new(Arc::clone(&store), Arc::clone(&policies)),
            restorer: Restorer::new(Arc::clone(&store), Arc::clone(&policies)),
            store,
            policies,
        }
    }

    /// Engine over the in-process store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryAuditStore::new()))
    }

    /// Declare a record type and set its audit policy. See
    /// [`AuditOptions`] for the `only`/`except`/`on` rules.
    pub fn configure(
        &self,
        record_type: RecordType,
        fields: impl IntoIterator<Item = impl Into<String>>,
        options: AuditOptions,
    ) {
        self.policies.configure(record_type, fields, options);
    }

    /// The capture-path entry points (`record_created` and friends).
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub async fn history_for(
        &self,
        record: &RecordRef,
        fields: &[String],
    ) -> Result<Vec<HistoryEntry>, AuditError> {
        self.projector.history_for(record, fields).await
    }

    pub async fn restore_as_of(
        &self,
        record: &RecordRef,
        fields: &[String],
        at: DateTime<Utc>,
        current: &BTreeMap<String, Value>,
    ) -> Result<RestorePlan, AuditError> {
        self.restorer.restore_as_of(record, fields, at, current).await
    }

    pub async fn restore_to_audit(
        &self,
        record: &RecordRef,
        audit_id: Uuid,
    ) -> Result<BTreeMap<String, Value>, AuditError> {
        self.restorer.restore_to_audit(record, audit_id).await
    }

    /// The record's full trail in the requested order.
    pub async fn audit_trail(
        &self,
        record: &RecordRef,
        order: SortOrder,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let query = AuditQuery {
            order,
            ..AuditQuery::default()
        };
        self.store.query(record, &query).await
    }

    /// The record's trail narrowed by the query's filters.
    pub async fn audit_trail_where(
        &self,
        record: &RecordRef,
        query: &AuditQuery,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        self.store.query(record, query).await
    }

    /// Everything a given actor did, most recent first.
    pub async fn actor_trail(&self, actor: &ActorRef) -> Result<Vec<AuditRecord>, AuditError> {
        self.store.actor_trail(actor).await
    }
}
