#![allow(dead_code)]

use eventdesk_core::constants::FORM_TABLE;
use eventdesk_core::store::Fields;
use eventdesk_core::store::memory::MemoryStore;
use serde_json::{Value, json};

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

/// Seed one stored form row for `event_id`.
pub fn seed_question(store: &MemoryStore, event_id: i64, name: &str, rank: i64) {
    store.seed(
        FORM_TABLE,
        fields(json!({
            "event_id": event_id,
            "name": name,
            "type": "text",
            "is_required": false,
            "rank": rank,
        })),
    );
}

/// Stored form rows of `event_id`, in store order.
pub fn form_rows(store: &MemoryStore, event_id: i64) -> Vec<Fields> {
    store
        .rows(FORM_TABLE)
        .into_iter()
        .filter(|r| r.i64_field("event_id") == Some(event_id))
        .map(|r| r.fields)
        .collect()
}
