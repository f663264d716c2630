#![allow(dead_code)]

use retrace::AuditTrail;
use retrace::domain::changeset::FieldChange;
use retrace::domain::id::{ActorRef, RecordRef, RecordType};
use retrace::domain::policy::AuditOptions;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Declared fields of the stand-in record type used across the suites.
pub const MODEL_FIELDS: [&str; 7] = [
    "id",
    "user_id",
    "name",
    "settings",
    "position",
    "created_at",
    "updated_at",
];

pub fn model_type() -> RecordType {
    RecordType::new("general_model").unwrap()
}

pub fn user_type() -> RecordType {
    RecordType::new("user").unwrap()
}

/// Engine over the in-memory store with the stand-in type configured with
/// default options (all triggers, default exclusions).
pub fn engine() -> AuditTrail {
    let trail = AuditTrail::in_memory();
    trail.configure(model_type(), MODEL_FIELDS, AuditOptions::default());
    trail
}

pub fn model_ref() -> RecordRef {
    RecordRef::new(model_type(), Uuid::now_v7())
}

pub fn actor() -> ActorRef {
    ActorRef::new(user_type(), Uuid::now_v7())
}

pub fn diff<const N: usize>(entries: [(&str, Value, Value); N]) -> BTreeMap<String, FieldChange> {
    entries
        .into_iter()
        .map(|(field, old, new)| (field.to_string(), FieldChange::new(old, new)))
        .collect()
}

/// Creation diff for a record born with `name`.
pub fn creation(name: &str) -> BTreeMap<String, FieldChange> {
    diff([("name", Value::Null, json!(name))])
}

pub fn name_change(old: &str, new: &str) -> BTreeMap<String, FieldChange> {
    diff([("name", json!(old), json!(new))])
}

pub fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Keep consecutive captures on strictly increasing timestamps; the
/// as-of restoration tests compare against instant boundaries.
pub async fn tick() {
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
}
