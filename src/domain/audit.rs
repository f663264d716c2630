use {
    super::changeset::ChangeSet,
    super::error::AuditError,
    super::id::{ActorRef, RecordRef},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Destroy,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = AuditError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "destroy" => Ok(Self::Destroy),
            other => Err(AuditError::Validation(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// One immutable history entry (for reads). Never updated or deleted once
/// appended; retention is the storage owner's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    id: Uuid,
    record: RecordRef,
    actor: Option<ActorRef>,
    origin: Option<String>,
    action: AuditAction,
    changes: ChangeSet,
    comment: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record(&self) -> &RecordRef {
        &self.record
    }

    pub fn actor(&self) -> Option<&ActorRef> {
        self.actor.as_ref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// For append — the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub record: RecordRef,
    pub actor: Option<ActorRef>,
    pub origin: Option<String>,
    pub action: AuditAction,
    pub changes: ChangeSet,
    pub comment: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl NewAuditRecord {
    pub fn into_record(self, id: Uuid) -> AuditRecord {
        AuditRecord {
            id,
            record: self.record,
            actor: self.actor,
            origin: self.origin,
            action: self.action,
            changes: self.changes,
            comment: self.comment,
            version: self.version,
            created_at: self.created_at,
        }
    }
}
