use {
    super::changeset::FieldChange,
    super::id::{RecordRef, RecordType},
    serde_json::Value,
    std::collections::BTreeMap,
    uuid::Uuid,
};

/// A record type the audit log can point at.
pub trait Identifiable {
    fn record_type(&self) -> RecordType;
    fn record_id(&self) -> Uuid;

    fn record_ref(&self) -> RecordRef {
        RecordRef::new(self.record_type(), self.record_id())
    }
}

/// A record that can report its own pending mutation. `pending_changes` is
/// the host change-tracker's field → (old, new) diff since the last save;
/// `attribute_snapshot` is the full current attribute map, used verbatim for
/// destroy entries.
pub trait ChangeTrackable: Identifiable {
    fn pending_changes(&self) -> BTreeMap<String, FieldChange>;
    fn attribute_snapshot(&self) -> BTreeMap<String, Value>;
}
