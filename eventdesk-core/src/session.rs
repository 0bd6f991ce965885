//! Per-event form editing session.
//!
//! The session owns the schema being edited and the load-once guard:
//! the stored form is read when the session first needs it and never
//! again until [`EditingSession::reload`], so unsaved edits are not
//! clobbered by a later load.

use tracing::warn;

use crate::error::EventDeskResult;
use crate::form::{FormSchema, SaveReport, SchemaSynchronizer};
use crate::store::TableStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Editing,
    Saving,
    Saved,
}

/// Result of [`EditingSession::ensure_loaded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The guard was already set; nothing was read.
    AlreadyLoaded,
    /// The stored form was read (possibly with zero questions).
    Loaded { questions: usize },
    /// Loading failed; the session continues with an empty form.
    Degraded { warning: String },
}

pub struct EditingSession {
    event_id: String,
    schema: FormSchema,
    loaded: bool,
    state: SessionState,
}

impl EditingSession {
    pub fn new(event_id: impl Into<String>) -> Self {
        EditingSession {
            event_id: event_id.into(),
            schema: FormSchema::new(),
            loaded: false,
            state: SessionState::Empty,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Mutable access for edits. Editing before any load also sets the
    /// guard, so a later `ensure_loaded` keeps the edits.
    pub fn schema_mut(&mut self) -> &mut FormSchema {
        self.loaded = true;
        self.state = SessionState::Editing;
        &mut self.schema
    }

    /// Load the stored form unless this session already did.
    pub async fn ensure_loaded<S: TableStore + Sync>(
        &mut self,
        sync: &SchemaSynchronizer<'_, S>,
    ) -> LoadOutcome {
        if self.loaded {
            return LoadOutcome::AlreadyLoaded;
        }

        // A failed load still counts as the one load of this session.
        self.loaded = true;
        self.state = SessionState::Loaded;

        match sync.load(&self.event_id).await {
            Ok(schema) => {
                let questions = schema.len();
                self.schema = schema;
                LoadOutcome::Loaded { questions }
            }
            Err(e) => {
                warn!(event_id = %self.event_id, "Could not load the existing form: {e}");
                self.schema = FormSchema::new();
                LoadOutcome::Degraded {
                    warning: format!("Could not load the existing form: {e}"),
                }
            }
        }
    }

    /// Drop local edits and read the stored form again.
    pub async fn reload<S: TableStore + Sync>(
        &mut self,
        sync: &SchemaSynchronizer<'_, S>,
    ) -> LoadOutcome {
        self.loaded = false;
        self.state = SessionState::Empty;
        self.ensure_loaded(sync).await
    }

    /// Persist the current schema. On an input error (empty form, bad
    /// event ID) the session stays where it was.
    pub async fn save<S: TableStore + Sync>(
        &mut self,
        sync: &SchemaSynchronizer<'_, S>,
    ) -> EventDeskResult<SaveReport> {
        let previous = self.state;
        self.state = SessionState::Saving;

        match sync.save(&self.schema, &self.event_id).await {
            Ok(report) => {
                self.state = SessionState::Saved;
                Ok(report)
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }
}
