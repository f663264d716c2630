use {
    crate::domain::audit::AuditRecord,
    crate::domain::error::AuditError,
    crate::domain::id::RecordRef,
    crate::domain::policy::PolicyRegistry,
    crate::store::{AuditQuery, AuditStore},
    chrono::{DateTime, Utc},
    serde::Serialize,
    serde_json::Value,
    std::collections::BTreeMap,
    std::sync::Arc,
};

/// One step in a field's value-over-time view: the requested fields this
/// audit entry changed, mapped to the values they changed *to*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub values: BTreeMap<String, Value>,
    pub changed_at: DateTime<Utc>,
}

/// Read-side projection of a record's trail into field history.
pub struct HistoryProjector {
    store: Arc<dyn AuditStore>,
    policies: Arc<PolicyRegistry>,
}

impl HistoryProjector {
    pub fn new(store: Arc<dyn AuditStore>, policies: Arc<PolicyRegistry>) -> Self {
        Self { store, policies }
    }

    /// Value history of the requested fields, most recent change first.
    ///
    /// Every requested field must be audited for the record's type; that is
    /// checked before the trail is read. A record whose trail never touches
    /// the fields yields an empty vector, not an error.
    pub async fn history_for(
        &self,
        record: &RecordRef,
        fields: &[String],
    ) -> Result<Vec<HistoryEntry>, AuditError> {
        let policy = self.policies.policy(record.record_type());
        for field in fields {
            let permitted = policy
                .as_ref()
                .is_some_and(|p| p.is_permitted(field));
            if !permitted {
                return Err(AuditError::InvalidField(field.clone()));
            }
        }

        let trail = self
            .store
            .query(record, &AuditQuery::newest_first())
            .await?;
        Ok(project(&trail, fields))
    }
}

/// Project an already-loaded trail. `trail` is expected most-recent-first;
/// entries touching none of the fields are dropped, and each retained entry
/// carries only the requested fields it actually changed.
pub fn project(trail: &[AuditRecord], fields: &[String]) -> Vec<HistoryEntry> {
    trail
        .iter()
        .filter_map(|audit| {
            let values: BTreeMap<String, Value> = fields
                .iter()
                .filter_map(|field| {
                    audit
                        .changes()
                        .new_value(field)
                        .map(|v| (field.clone(), v.clone()))
                })
                .collect();

            if values.is_empty() {
                return None;
            }
            Some(HistoryEntry {
                values,
                changed_at: audit.created_at(),
            })
        })
        .collect()
}
