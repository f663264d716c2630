pub mod memory;
pub mod postgres;

use {
    crate::domain::audit::{AuditAction, AuditRecord, NewAuditRecord},
    crate::domain::error::AuditError,
    crate::domain::id::{ActorRef, RecordRef},
    chrono::{DateTime, Utc},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Creation order, oldest first.
    #[default]
    VersionAsc,
    /// Most recent first.
    VersionDesc,
}

/// Filters for reading one record's trail. All filters are conjunctive;
/// the default selects the whole trail in creation order.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub up_until: Option<DateTime<Utc>>,
    pub from_version: Option<i64>,
    pub to_version: Option<i64>,
    pub order: SortOrder,
}

impl AuditQuery {
    pub fn newest_first() -> Self {
        Self {
            order: SortOrder::VersionDesc,
            ..Self::default()
        }
    }

    pub fn up_to_version(version: i64) -> Self {
        Self {
            to_version: Some(version),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(action) = self.action {
            if record.action() != action {
                return false;
            }
        }
        if let Some(until) = self.up_until {
            if record.created_at() > until {
                return false;
            }
        }
        if let Some(from) = self.from_version {
            if record.version() < from {
                return false;
            }
        }
        if let Some(to) = self.to_version {
            if record.version() > to {
                return false;
            }
        }
        true
    }
}

/// Append-only persistence for audit records.
///
/// `append` is the only write; it must assign the record id and reject a
/// duplicate `(record_type, record_id, version)` with
/// [`AuditError::VersionConflict`]. Reads may run concurrently with appends
/// and are allowed to miss an append still in flight.
pub trait AuditStore: Send + Sync {
    fn append(
        &self,
        record: NewAuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<AuditRecord, AuditError>> + Send + '_>>;

    fn max_version<'a>(
        &'a self,
        record: &'a RecordRef,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>, AuditError>> + Send + 'a>>;

    fn query<'a>(
        &'a self,
        record: &'a RecordRef,
        query: &'a AuditQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>>;

    fn find(
        &self,
        audit_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<Option<AuditRecord>, AuditError>> + Send + '_>>;

    /// Everything a given actor did, most recent first.
    fn actor_trail<'a>(
        &'a self,
        actor: &'a ActorRef,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AuditRecord>, AuditError>> + Send + 'a>>;
}
