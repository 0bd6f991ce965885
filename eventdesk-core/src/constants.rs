/// Table holding one row per event.
pub const EVENTS_TABLE: &str = "events";

/// Table holding one row per registration-form question.
pub const FORM_TABLE: &str = "registration_form";

/// Table holding per-event feature switches.
pub const FEATURES_TABLE: &str = "event_features";

/// Feature identifier of the registration form.
pub const REGISTRATION_FORM_FEATURE_ID: i64 = 1;

/// Default Airtable-compatible API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

/// Per-request timeout for the hosted table API.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retries on top of the first attempt for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// First backoff delay; doubled after every failed attempt.
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Upper bound on a single backoff delay.
pub const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// The hosted API refuses batch deletes larger than this.
pub const BATCH_DELETE_LIMIT: usize = 10;

/// Host ID used when none is configured.
pub const DEFAULT_HOST_ID: i64 = 1000;
