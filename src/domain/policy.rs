use {
    super::audit::AuditAction,
    super::id::RecordType,
    parking_lot::RwLock,
    std::collections::{BTreeSet, HashMap},
    std::sync::Arc,
};

/// Bookkeeping fields no one wants in an audit trail unless asked for.
pub const DEFAULT_EXCLUDED: [&str; 5] = [
    "lock_version",
    "created_at",
    "updated_at",
    "created_on",
    "updated_on",
];

/// Which of the three lifecycle points produce audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditTriggers {
    create: bool,
    update: bool,
    destroy: bool,
}

impl AuditTriggers {
    pub fn all() -> Self {
        Self {
            create: true,
            update: true,
            destroy: true,
        }
    }

    pub fn from_actions(actions: &[AuditAction]) -> Self {
        if actions.is_empty() {
            return Self::all();
        }
        Self {
            create: actions.contains(&AuditAction::Create),
            update: actions.contains(&AuditAction::Update),
            destroy: actions.contains(&AuditAction::Destroy),
        }
    }

    pub fn allows(&self, action: AuditAction) -> bool {
        match action {
            AuditAction::Create => self.create,
            AuditAction::Update => self.update,
            AuditAction::Destroy => self.destroy,
        }
    }
}

impl Default for AuditTriggers {
    fn default() -> Self {
        Self::all()
    }
}

/// Configuration for one record type. `only` and `except` are mutually
/// overriding: `only` recomputes the exclusions as everything-but-these,
/// `except` as the defaults plus these. Field names are not validated against
/// any schema; unknown names are silently carried.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    pub only: Option<Vec<String>>,
    pub except: Option<Vec<String>>,
    pub on: Vec<AuditAction>,
}

impl AuditOptions {
    pub fn only(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            only: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn except(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            except: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn on(actions: impl IntoIterator<Item = AuditAction>) -> Self {
        Self {
            on: actions.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Immutable per-type audit policy. Reconfiguration replaces the whole value
/// in the registry; nothing here mutates after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    fields: BTreeSet<String>,
    excluded: BTreeSet<String>,
    triggers: AuditTriggers,
}

impl FieldPolicy {
    pub fn build(
        fields: impl IntoIterator<Item = impl Into<String>>,
        options: &AuditOptions,
    ) -> Self {
        let fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();

        let mut excluded: BTreeSet<String> =
            DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect();

        if let Some(only) = &options.only {
            let keep: BTreeSet<&str> = only.iter().map(String::as_str).collect();
            excluded = fields
                .iter()
                .filter(|f| !keep.contains(f.as_str()))
                .cloned()
                .collect();
        }

        if let Some(except) = &options.except {
            excluded = DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect();
            excluded.extend(except.iter().cloned());
        }

        Self {
            fields,
            excluded,
            triggers: AuditTriggers::from_actions(&options.on),
        }
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn triggers(&self) -> AuditTriggers {
        self.triggers
    }

    /// Declared fields minus exclusions.
    pub fn permitted_fields(&self) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|f| !self.excluded.contains(*f))
            .cloned()
            .collect()
    }

    pub fn is_permitted(&self, field: &str) -> bool {
        self.fields.contains(field) && !self.excluded.contains(field)
    }
}

/// Record-type → policy map. Policies are stored behind `Arc` and swapped
/// wholesale on reconfiguration, so captures running concurrently with a
/// `configure` call see either the old policy or the new one, never a
/// half-updated set.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<RecordType, Arc<FieldPolicy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a record type's fields and (re)configure its policy.
    /// Last call wins wholesale; options do not accumulate across calls.
    pub fn configure(
        &self,
        record_type: RecordType,
        fields: impl IntoIterator<Item = impl Into<String>>,
        options: AuditOptions,
    ) {
        let policy = Arc::new(FieldPolicy::build(fields, &options));
        self.policies.write().insert(record_type, policy);
    }

    /// `None` means the type was never configured and is not audited.
    pub fn policy(&self, record_type: &RecordType) -> Option<Arc<FieldPolicy>> {
        self.policies.read().get(record_type).cloned()
    }
}
