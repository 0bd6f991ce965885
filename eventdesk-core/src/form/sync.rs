//! Loading and saving form schemas against the remote store.
//!
//! Saving replaces every row of the event: old rows are deleted, then one
//! row per question is created in rank order. The two phases are not
//! atomic. An interrupted save can leave the event with no rows or with
//! old and new rows side by side, and concurrent editors overwrite each
//! other (last writer wins). After input checks, every remote step is
//! best-effort: failures are collected in the [`SaveReport`] instead of
//! aborting, and nothing is rolled back.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::{BATCH_DELETE_LIMIT, FORM_TABLE, REGISTRATION_FORM_FEATURE_ID};
use crate::error::{EventDeskError, EventDeskResult};
use crate::event::EventId;
use crate::feature::FeatureFlags;
use crate::form::codec::{decode_options, decode_type, encode_options};
use crate::form::{FormSchema, Question};
use crate::store::{Fields, Filter, Record, TableStore, value_as_i64};

/// A question whose row could not be created.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFailure {
    pub label: String,
    pub rank: usize,
    pub error: String,
}

/// What a save actually did.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub event_id: EventId,
    pub deleted: usize,
    pub created: usize,
    pub failures: Vec<QuestionFailure>,
    pub warnings: Vec<String>,
}

impl SaveReport {
    fn new(event_id: EventId) -> Self {
        SaveReport {
            event_id,
            deleted: 0,
            created: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

pub struct SchemaSynchronizer<'s, S> {
    store: &'s S,
}

impl<'s, S: TableStore + Sync> SchemaSynchronizer<'s, S> {
    pub fn new(store: &'s S) -> Self {
        SchemaSynchronizer { store }
    }

    /// Read the stored form of an event. No rows means an empty schema.
    pub async fn load(&self, event_id: &str) -> EventDeskResult<FormSchema> {
        let event_id: EventId = event_id.parse()?;

        let mut rows = self
            .store
            .query_all(FORM_TABLE, &event_filter(event_id))
            .await?;

        // Stable sort: rows sharing a rank keep store order.
        rows.sort_by(|a, b| stored_rank(a).total_cmp(&stored_rank(b)));

        let mut schema = FormSchema::new();
        for row in &rows {
            schema.push(
                row.str_field("name").unwrap_or_default(),
                decode_type(row.str_field("type").unwrap_or_default()),
                truthy(row.field("is_required")),
                decode_options(row.field("possible_answers").unwrap_or(&Value::Null)),
            );
        }

        debug!(%event_id, questions = schema.len(), "Loaded form");
        Ok(schema)
    }

    /// Replace the stored form of an event with `schema`.
    pub async fn save(&self, schema: &FormSchema, event_id: &str) -> EventDeskResult<SaveReport> {
        if schema.is_empty() {
            return Err(EventDeskError::EmptySchema);
        }
        let event_id: EventId = event_id.parse()?;

        let mut report = SaveReport::new(event_id);

        self.delete_existing(event_id, &mut report).await;
        self.create_rows(schema, event_id, &mut report).await;

        if let Err(e) = FeatureFlags::new(self.store)
            .set_active(event_id, REGISTRATION_FORM_FEATURE_ID, true)
            .await
        {
            warn!(%event_id, "Could not activate the registration form feature: {e}");
            report
                .warnings
                .push(format!("Could not activate the registration form feature: {e}"));
        }

        info!(
            %event_id,
            deleted = report.deleted,
            created = report.created,
            failed = report.failures.len(),
            "Saved form"
        );
        Ok(report)
    }

    async fn delete_existing(&self, event_id: EventId, report: &mut SaveReport) {
        let existing = match self.store.query_all(FORM_TABLE, &event_filter(event_id)).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%event_id, "Could not read the previous form: {e}");
                report
                    .warnings
                    .push(format!("Could not read the previous form, old questions may remain: {e}"));
                return;
            }
        };

        let ids: Vec<String> = existing.into_iter().map(|row| row.id).collect();

        for chunk in ids.chunks(BATCH_DELETE_LIMIT) {
            match self.store.batch_delete(FORM_TABLE, chunk).await {
                Ok(()) => report.deleted += chunk.len(),
                Err(e) => {
                    debug!("Batch delete failed, deleting one by one: {e}");
                    for id in chunk {
                        match self.store.delete(FORM_TABLE, id).await {
                            Ok(()) => report.deleted += 1,
                            Err(e) => {
                                warn!(record_id = %id, "Could not delete previous question: {e}");
                                report
                                    .warnings
                                    .push(format!("Could not delete previous question {id}: {e}"));
                            }
                        }
                    }
                }
            }
        }
    }

    async fn create_rows(&self, schema: &FormSchema, event_id: EventId, report: &mut SaveReport) {
        let mut ordered: Vec<&Question> = schema.iter().collect();
        ordered.sort_by_key(|q| q.rank());

        for question in ordered {
            match self.store.create(FORM_TABLE, row_fields(question, event_id)).await {
                Ok(_) => report.created += 1,
                Err(e) => {
                    warn!(%event_id, label = %question.label, "Could not save question: {e}");
                    report.failures.push(QuestionFailure {
                        label: question.label.clone(),
                        rank: question.rank(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

fn event_filter(event_id: EventId) -> Filter {
    Filter::eq("event_id", event_id.value())
}

fn row_fields(question: &Question, event_id: EventId) -> Fields {
    let mut fields = Fields::new();
    fields.insert("event_id".into(), event_id.value().into());
    fields.insert("name".into(), question.label.clone().into());
    fields.insert("type".into(), question.data_type.code().into());
    fields.insert("is_required".into(), question.required.into());
    fields.insert("rank".into(), question.rank().into());
    if let Some(options) = question.persisted_options() {
        fields.insert("possible_answers".into(), encode_options(options).into());
    }
    fields
}

/// Rank column as a number. Missing or unreadable ranks sort as 0.
fn stored_rank(row: &Record) -> f64 {
    match row.field("rank") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Loose boolean reading of a stored flag; missing means false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(number @ Value::Number(_)) => value_as_i64(number).is_none_or(|n| n != 0),
        Some(Value::String(s)) => {
            let s = s.trim();
            !s.is_empty() && !matches!(s.to_ascii_lowercase().as_str(), "false" | "0" | "no")
        }
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}
