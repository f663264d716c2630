use {
    super::{AuditQuery, AuditStore, SortOrder},
    crate::domain::audit::{AuditRecord, NewAuditRecord},
    crate::domain::error::AuditError,
    crate::domain::id::{ActorRef, RecordRef},
    parking_lot::RwLock,
    std::collections::HashMap,
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// In-process store. Per-record vectors stay in append order, so version
/// order and insertion order coincide; an id index backs `find`.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<HashMap<RecordRef, Vec<AuditRecord>>>,
    by_id: RwLock<HashMap<Uuid, AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(
        &self,
        record: NewAuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<AuditRecord, AuditError>> + Send + '_>> {
        Box::pin(async move {
            let mut records = self.records.write();
            let trail = records.entry(record.record.clone()).or_default();

            // The write lock spans the check and the push, so the uniqueness
            // guarantee holds even against racing appends.
            if trail.iter().any(|r| r.version() == record.version) {
                return Err(AuditError::VersionConflict {
                    record_type: record.record.record_type().as_str().to_string(),
                    record_id: record.record.record_id(),
                    version: record.version,
                });
            }

            let stored = record.into_record(Uuid::now_v7());
            trail.push(stored.clone());
            drop(records);

            self.by_id.write().insert(stored.id(), stored.clone());
            Ok(stored)
        })
    }

    fn max_version<'a>(
        &'a self,
        record: &'a RecordRef,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.records.read();
            Ok(records
                .get(record)
                .and_then(|trail| trail.iter().map(AuditRecord::version).max()))
        })
    }

    fn query<'a>(
        &'a self,
        record: &'a RecordRef,
        query: &'a AuditQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.records.read();
            let mut selected: Vec<AuditRecord> = records
                .get(record)
                .map(|trail| {
                    trail
                        .iter()
                        .filter(|r| query.matches(r))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            drop(records);

            selected.sort_by_key(AuditRecord::version);
            if query.order == SortOrder::VersionDesc {
                selected.reverse();
            }
            Ok(selected)
        })
    }

    fn find(
        &self,
        audit_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AuditRecord>, AuditError>> + Send + '_>> {
        Box::pin(async move { Ok(self.by_id.read().get(&audit_id).cloned()) })
    }

    fn actor_trail<'a>(
        &'a self,
        actor: &'a ActorRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.records.read();
            let mut selected: Vec<AuditRecord> = records
                .values()
                .flatten()
                .filter(|r| r.actor() == Some(actor))
                .cloned()
                .collect();
            drop(records);

            selected.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then(b.version().cmp(&a.version()))
            });
            Ok(selected)
        })
    }
}
