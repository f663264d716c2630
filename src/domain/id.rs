use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::AuditError;

/// Record-type name (`"general_model"`, `"user"`). Keys the policy registry
/// and the audit log's polymorphic references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordType(String);

impl RecordType {
    pub fn new(name: impl Into<String>) -> Result<Self, AuditError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuditError::Validation(
                "RecordType cannot be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Identifies the record a history entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    record_type: RecordType,
    record_id: Uuid,
}

impl RecordRef {
    pub fn new(record_type: RecordType, record_id: Uuid) -> Self {
        Self {
            record_type,
            record_id,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn record_id(&self) -> Uuid {
        self.record_id
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.record_type, self.record_id)
    }
}

/// Identifies who caused a mutation. Same polymorphic shape as [`RecordRef`]
/// so any record type can act.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    actor_type: RecordType,
    actor_id: Uuid,
}

impl ActorRef {
    pub fn new(actor_type: RecordType, actor_id: Uuid) -> Self {
        Self {
            actor_type,
            actor_id,
        }
    }

    pub fn actor_type(&self) -> &RecordType {
        &self.actor_type
    }

    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}
