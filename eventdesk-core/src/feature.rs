//! Optional per-event features and their on/off switches.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::constants::{FEATURES_TABLE, REGISTRATION_FORM_FEATURE_ID};
use crate::error::EventDeskResult;
use crate::event::EventId;
use crate::store::{Fields, Filter, TableStore};

/// When in an event's lifecycle a feature is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureCategory {
    BeforeEvent,
    DuringEvent,
    AfterEvent,
}

impl FeatureCategory {
    pub const ALL: [FeatureCategory; 3] = [
        FeatureCategory::BeforeEvent,
        FeatureCategory::DuringEvent,
        FeatureCategory::AfterEvent,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FeatureCategory::BeforeEvent => "Before the event",
            FeatureCategory::DuringEvent => "During the event",
            FeatureCategory::AfterEvent => "After the event",
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub id: i64,
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: FeatureCategory,
}

/// Every feature a host can configure.
pub const FEATURES: &[Feature] = &[Feature {
    id: REGISTRATION_FORM_FEATURE_ID,
    key: "registration_form",
    name: "Registration form",
    description: "Build a custom registration form for your event and collect attendee details.",
    category: FeatureCategory::BeforeEvent,
}];

pub fn features_in(category: FeatureCategory) -> impl Iterator<Item = &'static Feature> {
    FEATURES.iter().filter(move |f| f.category == category)
}

/// Reads and writes the `event_features` table.
pub struct FeatureFlags<'s, S> {
    store: &'s S,
}

impl<'s, S: TableStore + Sync> FeatureFlags<'s, S> {
    pub fn new(store: &'s S) -> Self {
        FeatureFlags { store }
    }

    /// Feature ID → active, for every flag row of the event.
    pub async fn load(&self, event_id: EventId) -> EventDeskResult<BTreeMap<i64, bool>> {
        let records = self
            .store
            .query_all(FEATURES_TABLE, &Filter::eq("event_id", event_id.value()))
            .await?;

        Ok(records
            .iter()
            .filter_map(|r| {
                let feature_id = r.i64_field("feature_id")?;
                let active = r
                    .field("is_active")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                Some((feature_id, active))
            })
            .collect())
    }

    /// Upsert the flag row for (event, feature).
    pub async fn set_active(
        &self,
        event_id: EventId,
        feature_id: i64,
        active: bool,
    ) -> EventDeskResult<()> {
        let filter = Filter::eq("event_id", event_id.value()).and(Filter::eq("feature_id", feature_id));
        let existing = self.store.query_all(FEATURES_TABLE, &filter).await?;

        let mut fields = Fields::new();
        fields.insert("is_active".into(), active.into());

        match existing.first() {
            Some(record) => {
                debug!(%event_id, feature_id, active, "Updating feature flag");
                self.store.update(FEATURES_TABLE, &record.id, fields).await?;
            }
            None => {
                debug!(%event_id, feature_id, active, "Creating feature flag");
                fields.insert("event_id".into(), event_id.value().into());
                fields.insert("feature_id".into(), feature_id.into());
                self.store.create(FEATURES_TABLE, fields).await?;
            }
        }
        Ok(())
    }
}
