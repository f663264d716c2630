use {
    crate::domain::audit::{AuditAction, AuditRecord, NewAuditRecord},
    crate::domain::changeset::{ChangeSet, FieldChange},
    crate::domain::context::{self, OperationContext},
    crate::domain::error::AuditError,
    crate::domain::id::RecordRef,
    crate::domain::policy::PolicyRegistry,
    crate::domain::tracked::ChangeTrackable,
    crate::store::AuditStore,
    chrono::Utc,
    parking_lot::Mutex,
    serde_json::Value,
    std::collections::{BTreeMap, HashMap},
    std::sync::Arc,
};

/// Appends racing past the per-key lock (other processes sharing the same
/// store) are retried this many times before the conflict surfaces.
const MAX_VERSION_RETRIES: u32 = 3;

/// The capture path. The host calls one of the `record_*` entry points at
/// the matching lifecycle moment; the recorder filters the mutation through
/// the type's field policy, assigns the next version, stamps the operation
/// context, and appends exactly one audit record, or none when the
/// mutation touches nothing audited.
pub struct Recorder {
    store: Arc<dyn AuditStore>,
    policies: Arc<PolicyRegistry>,
    locks: Mutex<HashMap<RecordRef, Arc<tokio::sync::Mutex<()>>>>,
}

impl Recorder {
    pub fn new(store: Arc<dyn AuditStore>, policies: Arc<PolicyRegistry>) -> Self {
        Self {
            store,
            policies,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Capture a creation. `changes` is the new record's field → (old, new)
    /// diff as reported by the host's change tracking.
    pub async fn record_created(
        &self,
        record: &RecordRef,
        changes: BTreeMap<String, FieldChange>,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        self.capture(record, AuditAction::Create, ChangeSet::diff(changes), comment, ctx)
            .await
    }

    /// Capture an update, before the host commits it.
    pub async fn record_updated(
        &self,
        record: &RecordRef,
        changes: BTreeMap<String, FieldChange>,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        self.capture(record, AuditAction::Update, ChangeSet::diff(changes), comment, ctx)
            .await
    }

    /// Capture a destroy, before the host commits it. Takes the record's
    /// full attribute snapshot, not a diff, and always writes, even when
    /// no audited field remains after filtering.
    pub async fn record_destroyed(
        &self,
        record: &RecordRef,
        attributes: BTreeMap<String, Value>,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        let comment = Some(match comment {
            Some(c) => format!("deleted record {}: {c}", record.record_id()),
            None => format!("deleted record {}", record.record_id()),
        });
        self.capture(
            record,
            AuditAction::Destroy,
            ChangeSet::snapshot(attributes),
            comment,
            ctx,
        )
        .await
    }

    /// `record_created` for a type implementing the tracking capabilities.
    pub async fn created_for<M: ChangeTrackable>(
        &self,
        model: &M,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        self.record_created(&model.record_ref(), model.pending_changes(), comment, ctx)
            .await
    }

    /// `record_updated` for a type implementing the tracking capabilities.
    pub async fn updated_for<M: ChangeTrackable>(
        &self,
        model: &M,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        self.record_updated(&model.record_ref(), model.pending_changes(), comment, ctx)
            .await
    }

    /// `record_destroyed` for a type implementing the tracking capabilities.
    pub async fn destroyed_for<M: ChangeTrackable>(
        &self,
        model: &M,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        self.record_destroyed(&model.record_ref(), model.attribute_snapshot(), comment, ctx)
            .await
    }

    async fn capture(
        &self,
        record: &RecordRef,
        action: AuditAction,
        changes: ChangeSet,
        comment: Option<String>,
        ctx: Option<&OperationContext>,
    ) -> Result<Option<AuditRecord>, AuditError> {
        let Some(policy) = self.policies.policy(record.record_type()) else {
            tracing::debug!(record = %record, "record type not configured, skipping");
            return Ok(None);
        };

        if !policy.triggers().allows(action) {
            return Ok(None);
        }

        let changes = changes.retain_permitted(&policy.permitted_fields());

        // Create/update with nothing audited left in the diff is a no-op,
        // not an error. Destroys always write, tracked fields or not.
        if changes.is_empty() && action != AuditAction::Destroy {
            tracing::debug!(record = %record, %action, "no audited fields changed, suppressing");
            return Ok(None);
        }

        let ctx = match ctx {
            Some(c) => Some(c.clone()),
            None => context::current(),
        };
        let (actor, origin) = match ctx {
            Some(c) => (c.actor, c.origin),
            None => (None, None),
        };

        // Serialize version assignment per record: the max-version read and
        // the append must not interleave with another writer on the same key.
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(record.clone()).or_default())
        };
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            let version = self.store.max_version(record).await?.unwrap_or(0) + 1;

            let entry = NewAuditRecord {
                record: record.clone(),
                actor: actor.clone(),
                origin: origin.clone(),
                action,
                changes: changes.clone(),
                comment: comment.clone(),
                version,
                created_at: Utc::now(),
            };

            match self.store.append(entry).await {
                Ok(stored) => {
                    tracing::debug!(
                        record = %record,
                        %action,
                        version = stored.version(),
                        "audit record appended"
                    );
                    return Ok(Some(stored));
                }
                Err(AuditError::VersionConflict { .. }) if attempt < MAX_VERSION_RETRIES => {
                    // A writer outside this process won the version; re-read
                    // the max and try once more.
                    attempt += 1;
                    tracing::warn!(
                        record = %record,
                        version,
                        attempt,
                        "version conflict on append, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
