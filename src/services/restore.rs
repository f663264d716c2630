use {
    crate::domain::audit::AuditRecord,
    crate::domain::error::AuditError,
    crate::domain::id::RecordRef,
    crate::domain::policy::PolicyRegistry,
    crate::store::{AuditQuery, AuditStore},
    chrono::{DateTime, Utc},
    serde_json::Value,
    std::collections::BTreeMap,
    std::sync::Arc,
    uuid::Uuid,
};

/// The attribute writes needed to roll a record back. Empty when the record
/// already holds the requested past state.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePlan {
    attributes: BTreeMap<String, Value>,
}

impl RestorePlan {
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn changed(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn into_attributes(self) -> BTreeMap<String, Value> {
        self.attributes
    }
}

/// Computes point-in-time and to-version rollback values from the trail.
/// The caller owns applying them to the live record; the core never writes
/// anything but audit entries.
pub struct Restorer {
    store: Arc<dyn AuditStore>,
    policies: Arc<PolicyRegistry>,
}

impl Restorer {
    pub fn new(store: Arc<dyn AuditStore>, policies: Arc<PolicyRegistry>) -> Self {
        Self { store, policies }
    }

    /// Field values the record held at instant `at`, for each requested
    /// field independently. `current` is the record's live attribute map;
    /// a value the record already holds is left out of the plan.
    ///
    /// A field whose every audit postdates `at` restores to the *old* side
    /// of its oldest audit: the value it held before tracking began.
    pub async fn restore_as_of(
        &self,
        record: &RecordRef,
        fields: &[String],
        at: DateTime<Utc>,
        current: &BTreeMap<String, Value>,
    ) -> Result<RestorePlan, AuditError> {
        if fields.is_empty() {
            return Err(AuditError::MissingArgument("fields"));
        }

        let policy = self.policies.policy(record.record_type());
        for field in fields {
            let permitted = policy.as_ref().is_some_and(|p| p.is_permitted(field));
            if !permitted {
                return Err(AuditError::InvalidField(field.clone()));
            }
        }

        let trail = self
            .store
            .query(record, &AuditQuery::newest_first())
            .await?;

        let mut attributes = BTreeMap::new();
        for field in fields {
            let touching: Vec<&AuditRecord> = trail
                .iter()
                .filter(|a| a.changes().contains(field))
                .collect();

            for audit in &touching {
                if audit.created_at() < at {
                    if let Some(value) = audit.changes().new_value(field) {
                        if current.get(field) != Some(value) {
                            attributes.insert(field.clone(), value.clone());
                        }
                    }
                    break;
                }
            }

            // `at` predates every audit of this field: reconstruct the
            // pre-history value from the oldest audit's old side.
            if !attributes.contains_key(field) {
                if let Some(oldest) = touching.last() {
                    if at < oldest.created_at() {
                        if let Some(value) = oldest.changes().old_value(field) {
                            attributes.insert(field.clone(), value.clone());
                        }
                    }
                }
            }
        }

        Ok(RestorePlan { attributes })
    }

    /// Field values to apply so the record matches its state strictly before
    /// the target audit entry and everything that preceded it: for each field
    /// touched anywhere in versions `1..=target`, the first old value seen
    /// walking oldest → newest.
    ///
    /// The target must exist and belong to `record`; restoring one record
    /// from another record's trail is refused.
    pub async fn restore_to_audit(
        &self,
        record: &RecordRef,
        audit_id: Uuid,
    ) -> Result<BTreeMap<String, Value>, AuditError> {
        let target = self
            .store
            .find(audit_id)
            .await?
            .ok_or_else(|| AuditError::NotFound(format!("audit record {audit_id}")))?;

        if target.record() != record {
            return Err(AuditError::NotFound(format!(
                "audit record {audit_id} does not belong to {record}"
            )));
        }

        let chain = self
            .store
            .query(record, &AuditQuery::up_to_version(target.version()))
            .await?;

        let mut attributes: BTreeMap<String, Value> = BTreeMap::new();
        for audit in &chain {
            for field in audit.changes().fields() {
                if !attributes.contains_key(field) {
                    if let Some(old) = audit.changes().old_value(field) {
                        attributes.insert(field.to_string(), old.clone());
                    }
                }
            }
        }

        Ok(attributes)
    }
}
