use {
    super::audit::AuditAction,
    super::error::AuditError,
    serde::{Deserialize, Serialize, Serializer},
    serde_json::Value,
    std::collections::{BTreeMap, BTreeSet},
};

/// Old and new value of one field within one mutation.
/// Serializes as a two-element array `[old, new]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange(Value, Value);

impl FieldChange {
    pub fn new(old: Value, new: Value) -> Self {
        Self(old, new)
    }

    pub fn old(&self) -> &Value {
        &self.0
    }

    pub fn new_value(&self) -> &Value {
        &self.1
    }
}

/// What one audit entry records about the mutated fields.
///
/// Create and update entries carry a `Diff` of (old, new) pairs. Destroy
/// entries instead carry a `Snapshot` of the record's final attributes: a
/// plain field → value map with no pairs. Downstream restoration relies on
/// that asymmetry, so it is part of the contract, not an irregularity to
/// normalize away.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSet {
    Diff(BTreeMap<String, FieldChange>),
    Snapshot(BTreeMap<String, Value>),
}

impl ChangeSet {
    pub fn diff(changes: BTreeMap<String, FieldChange>) -> Self {
        Self::Diff(changes)
    }

    pub fn snapshot(attributes: BTreeMap<String, Value>) -> Self {
        Self::Snapshot(attributes)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Diff(m) => m.is_empty(),
            Self::Snapshot(m) => m.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Diff(m) => m.len(),
            Self::Snapshot(m) => m.len(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        match self {
            Self::Diff(m) => m.contains_key(field),
            Self::Snapshot(m) => m.contains_key(field),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        let keys: Vec<&str> = match self {
            Self::Diff(m) => m.keys().map(String::as_str).collect(),
            Self::Snapshot(m) => m.keys().map(String::as_str).collect(),
        };
        keys.into_iter()
    }

    /// Value the field held after this mutation. For a snapshot that is the
    /// recorded attribute itself.
    pub fn new_value(&self, field: &str) -> Option<&Value> {
        match self {
            Self::Diff(m) => m.get(field).map(FieldChange::new_value),
            Self::Snapshot(m) => m.get(field),
        }
    }

    /// Value the field held before this mutation. A snapshot records no
    /// before/after pair, so the attribute value stands in for both sides.
    pub fn old_value(&self, field: &str) -> Option<&Value> {
        match self {
            Self::Diff(m) => m.get(field).map(FieldChange::old),
            Self::Snapshot(m) => m.get(field),
        }
    }

    /// Drop every field not in `permitted`.
    pub fn retain_permitted(self, permitted: &BTreeSet<String>) -> Self {
        match self {
            Self::Diff(mut m) => {
                m.retain(|field, _| permitted.contains(field));
                Self::Diff(m)
            }
            Self::Snapshot(mut m) => {
                m.retain(|field, _| permitted.contains(field));
                Self::Snapshot(m)
            }
        }
    }

    pub fn to_value(&self) -> Result<Value, AuditError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Recover a change set from its stored JSON. The action disambiguates
    /// the two layouts: destroy rows hold snapshots, everything else diffs.
    pub fn from_value(action: AuditAction, value: Value) -> Result<Self, AuditError> {
        match action {
            AuditAction::Destroy => Ok(Self::Snapshot(serde_json::from_value(value)?)),
            AuditAction::Create | AuditAction::Update => {
                Ok(Self::Diff(serde_json::from_value(value)?))
            }
        }
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Diff(m) => m.serialize(serializer),
            Self::Snapshot(m) => m.serialize(serializer),
        }
    }
}
