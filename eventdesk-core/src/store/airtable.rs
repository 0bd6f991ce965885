//! HTTP client for the hosted table API (Airtable REST dialect).
//!
//! Every request carries a bounded timeout and failed requests are
//! retried with capped exponential backoff up to `max_retries` times.
//! Reads, updates and deletes are retried on connection failures,
//! timeouts, HTTP 429 and 5xx. Creates are not idempotent, so they are
//! only retried when the API never processed them (connection refused
//! or HTTP 429).

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::EventDeskConfig;
use crate::constants::{MAX_RETRY_DELAY_MS, RETRY_BASE_DELAY_MS};
use crate::error::{EventDeskError, EventDeskResult};
use crate::store::{Fields, Filter, Record, TableStore};

const PAGE_SIZE: &str = "100";

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(default)]
    records: Vec<Record>,
    offset: Option<String>,
}

pub struct AirtableStore {
    http: reqwest::Client,
    api_url: Url,
    base_id: String,
    api_key: String,
    max_retries: u32,
}

impl AirtableStore {
    pub fn new(config: &EventDeskConfig) -> EventDeskResult<Self> {
        let (base_id, api_key) = config.credentials()?;

        let api_url = Url::parse(&config.api_url)
            .map_err(|e| EventDeskError::Config(format!("Invalid api_url '{}': {e}", config.api_url)))?;
        if api_url.cannot_be_a_base() {
            return Err(EventDeskError::Config(format!(
                "Invalid api_url '{}'",
                config.api_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EventDeskError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(AirtableStore {
            http,
            api_url,
            base_id: base_id.to_string(),
            api_key: api_key.to_string(),
            max_retries: config.max_retries,
        })
    }

    /// `{api_url}/{base_id}/{table}[/{record_id}]`, each segment percent-encoded.
    fn table_url(&self, table: &str, record_id: Option<&str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.base_id).push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        url
    }

    /// Send the request built by `build`, retrying failures `retry` allows.
    async fn send<F>(&self, retry: Retry, build: F) -> EventDeskResult<Value>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.send_once(build().bearer_auth(&self.api_key)).await {
                Err(Attempt::Failed { message, unsent })
                    if retry.allows(unsent) && attempt < self.max_retries =>
                {
                    let delay = backoff_delay(attempt);
                    attempt += 1;
                    warn!(attempt, ?delay, "Table API request failed, retrying: {message}");
                    tokio::time::sleep(delay).await;
                }
                Err(Attempt::Failed { message, .. }) => {
                    return Err(EventDeskError::RemoteUnavailable(message));
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Ok(value) => return Ok(value),
            }
        }
    }

    async fn send_json<T, F>(&self, retry: Retry, build: F) -> EventDeskResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let value = self.send(retry, build).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Value, Attempt> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                Attempt::unsent(e.to_string())
            } else if e.is_timeout() || e.is_request() {
                Attempt::maybe_processed(e.to_string())
            } else {
                Attempt::Fatal(EventDeskError::RemoteUnavailable(e.to_string()))
            }
        })?;

        let status = response.status();
        debug!(%status, url = %response.url(), "Table API response");

        let body = response
            .text()
            .await
            .map_err(|e| Attempt::maybe_processed(e.to_string()))?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| Attempt::Fatal(e.into()));
        }

        let message = error_message(&body);
        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(Attempt::unsent(format!("{status}: {message}")))
        } else if status.is_server_error() {
            Err(Attempt::maybe_processed(format!("{status}: {message}")))
        } else {
            Err(Attempt::Fatal(EventDeskError::Remote {
                status: status.as_u16(),
                message,
            }))
        }
    }
}

/// Which failed attempts may be sent again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Repeating the request has no extra effect.
    Idempotent,
    /// Only retry requests the API provably never processed.
    UnsentOnly,
}

impl Retry {
    fn allows(self, unsent: bool) -> bool {
        match self {
            Retry::Idempotent => true,
            Retry::UnsentOnly => unsent,
        }
    }
}

enum Attempt {
    /// Transient failure. `unsent` means the API did not act on the request.
    Failed { message: String, unsent: bool },
    Fatal(EventDeskError),
}

impl Attempt {
    fn unsent(message: String) -> Self {
        Attempt::Failed {
            message,
            unsent: true,
        }
    }

    fn maybe_processed(message: String) -> Self {
        Attempt::Failed {
            message,
            unsent: false,
        }
    }
}

/// Delay before retry number `attempt + 1`, doubling from the base and capped.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(
        RETRY_BASE_DELAY_MS
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY_MS),
    )
}

/// Pull a readable message out of an API error body.
///
/// The API answers either `{"error": {"type": .., "message": ..}}` or
/// `{"error": "NOT_FOUND"}`.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| match v.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(o)) => o
            .get("message")
            .or_else(|| o.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    });

    message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response".to_string()
        } else {
            trimmed.to_string()
        }
    })
}

impl TableStore for AirtableStore {
    async fn query_all(&self, table: &str, filter: &Filter) -> EventDeskResult<Vec<Record>> {
        let url = self.table_url(table, None);
        let formula = filter.to_formula();
        debug!(table, filter = %filter, "Querying records");

        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let page: ListPage = self
                .send_json(Retry::Idempotent, || {
                    let mut request = self
                        .http
                        .get(url.clone())
                        .query(&[("pageSize", PAGE_SIZE)]);
                    if let Some(formula) = &formula {
                        request = request.query(&[("filterByFormula", formula)]);
                    }
                    if let Some(offset) = &offset {
                        request = request.query(&[("offset", offset)]);
                    }
                    request
                })
                .await?;

            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn create(&self, table: &str, fields: Fields) -> EventDeskResult<Record> {
        let url = self.table_url(table, None);
        let body = json!({ "fields": fields });
        debug!(table, "Creating record");

        self.send_json(Retry::UnsentOnly, || self.http.post(url.clone()).json(&body))
            .await
    }

    async fn update(&self, table: &str, record_id: &str, fields: Fields) -> EventDeskResult<Record> {
        let url = self.table_url(table, Some(record_id));
        let body = json!({ "fields": fields });
        debug!(table, record_id, "Updating record");

        self.send_json(Retry::Idempotent, || self.http.patch(url.clone()).json(&body))
            .await
    }

    async fn delete(&self, table: &str, record_id: &str) -> EventDeskResult<()> {
        let url = self.table_url(table, Some(record_id));
        debug!(table, record_id, "Deleting record");

        self.send(Retry::Idempotent, || self.http.delete(url.clone()))
            .await?;
        Ok(())
    }

    async fn batch_delete(&self, table: &str, record_ids: &[String]) -> EventDeskResult<()> {
        if record_ids.is_empty() {
            return Ok(());
        }

        let url = self.table_url(table, None);
        let params: Vec<(&str, &str)> = record_ids
            .iter()
            .map(|id| ("records[]", id.as_str()))
            .collect();
        debug!(table, count = record_ids.len(), "Batch deleting records");

        self.send(Retry::Idempotent, || {
            self.http.delete(url.clone()).query(&params)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_url: &str) -> AirtableStore {
        let config = EventDeskConfig {
            api_url: api_url.to_string(),
            base_id: Some("appBase".into()),
            api_key: Some("patKey".into()),
            ..EventDeskConfig::default()
        };
        AirtableStore::new(&config).unwrap()
    }

    #[test]
    fn test_table_url() {
        let store = store("https://api.airtable.com/v0");
        assert_eq!(
            store.table_url("registration_form", None).as_str(),
            "https://api.airtable.com/v0/appBase/registration_form"
        );
        assert_eq!(
            store.table_url("event features", Some("rec1")).as_str(),
            "https://api.airtable.com/v0/appBase/event%20features/rec1"
        );
    }

    #[test]
    fn test_table_url_trailing_slash() {
        let store = store("http://localhost:8080/v0/");
        assert_eq!(
            store.table_url("events", None).as_str(),
            "http://localhost:8080/v0/appBase/events"
        );
    }

    #[test]
    fn test_new_requires_credentials() {
        let config = EventDeskConfig::default();
        assert!(matches!(
            AirtableStore::new(&config),
            Err(EventDeskError::Config(_))
        ));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":{"type":"INVALID_REQUEST","message":"Bad formula"}}"#),
            "Bad formula"
        );
        assert_eq!(error_message(r#"{"error":"NOT_FOUND"}"#), "NOT_FOUND");
        assert_eq!(error_message("gateway down"), "gateway down");
        assert_eq!(error_message(""), "empty response");
    }

    #[test]
    fn test_retry_policy() {
        assert!(Retry::Idempotent.allows(true));
        assert!(Retry::Idempotent.allows(false));
        assert!(Retry::UnsentOnly.allows(true));
        assert!(!Retry::UnsentOnly.allows(false));
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(250));
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(10), Duration::from_millis(MAX_RETRY_DELAY_MS));
        assert_eq!(backoff_delay(64), Duration::from_millis(MAX_RETRY_DELAY_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_RETRY_DELAY_MS));
    }

    #[test]
    fn test_list_page_parses() {
        let page: ListPage = serde_json::from_str(
            r#"{"records":[{"id":"rec1","createdTime":"2025-01-01T00:00:00.000Z","fields":{"event_id":42}}],"offset":"itr1"}"#,
        )
        .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].i64_field("event_id"), Some(42));
        assert_eq!(page.offset.as_deref(), Some("itr1"));
    }
}
