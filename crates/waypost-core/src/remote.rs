//! Remote authority client
//!
//! The engine depends on the backend only through the [`RemoteAuthority`]
//! trait: one create operation whose result falls into exactly four
//! classes (created, already exists, rejected, transient). [`HttpRemote`]
//! is the production implementation over HTTP/JSON; tests script the trait
//! directly and never touch the network.
//!
//! Credentials are injected through [`CredentialProvider`] at call time,
//! never read from ambient process state, so nothing here requires a live
//! session to test.

use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{PendingRecord, SyncAttemptResult};

/// The representation of a record that actually crosses the wire.
///
/// Local bookkeeping (`local_id`, `sync_state`, rejection history) cannot
/// be expressed here, which is what keeps it off the remote authority.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRecord {
    /// Remote endpoint segment, e.g. "beneficiaries"
    pub collection: String,
    /// The key the remote authority enforces uniqueness on
    pub business_key: String,
    /// Field values to create
    pub payload: Map<String, Value>,
}

impl OutboundRecord {
    /// Build the outbound form of a queued record, stripping everything
    /// local
    pub fn from_record(record: &PendingRecord) -> Self {
        Self {
            collection: record.collection.clone(),
            business_key: record.business_key.clone(),
            payload: record.payload.clone(),
        }
    }

    /// Request body: the payload fields plus the business key, and the
    /// submitting actor when one is known
    pub fn body(&self, actor: Option<&str>) -> Map<String, Value> {
        let mut body = self.payload.clone();
        body.insert(
            "business_key".to_string(),
            Value::String(self.business_key.clone()),
        );
        if let Some(actor) = actor {
            body.insert(
                "registered_by".to_string(),
                Value::String(actor.to_string()),
            );
        }
        body
    }
}

/// Session material for talking to the remote authority.
///
/// Passed into the engine explicitly; the engine never reads auth state
/// from globals.
pub trait CredentialProvider: Send + Sync {
    /// Bearer token for the remote authority, if a session exists
    fn token(&self) -> Option<String>;

    /// Identity stamped onto outbound records as `registered_by`
    fn actor(&self) -> Option<String> {
        None
    }
}

/// Fixed credentials, for the CLI and for tests
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
    actor: Option<String>,
}

impl StaticCredentials {
    /// No session at all; requests go out unauthenticated
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn actor(&self) -> Option<String> {
        self.actor.clone()
    }
}

/// The backend service with the server-enforced uniqueness constraint.
///
/// Implementations classify every possible outcome of a create attempt
/// into a [`SyncAttemptResult`]; they do not return transport errors,
/// because to the engine an unreachable server and a 5xx are the same
/// thing: try again next drain.
pub trait RemoteAuthority: Send + Sync {
    /// Submit one record create
    fn create(&self, record: OutboundRecord) -> impl Future<Output = SyncAttemptResult> + Send;
}

/// HTTP implementation of the remote authority.
///
/// Creates are POSTs to `{api_url}/{collection}` with a JSON body.
/// Status mapping: 2xx → accepted, 409 → already exists, other 4xx →
/// rejected, 5xx and transport failures → transient.
pub struct HttpRemote {
    client: reqwest::Client,
    api_url: String,
    credentials: Arc<dyn CredentialProvider>,
    /// Identifies this engine instance in request logs server-side
    client_id: String,
}

impl HttpRemote {
    pub fn new(api_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let client_id = format!("waypost-{}", &uuid::Uuid::new_v4().to_string()[..8]);
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            credentials,
            client_id,
        }
    }

    /// This engine instance's client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn endpoint(&self, collection: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), collection)
    }
}

impl RemoteAuthority for HttpRemote {
    fn create(&self, record: OutboundRecord) -> impl Future<Output = SyncAttemptResult> + Send {
        async move {
            let url = self.endpoint(&record.collection);
            let body = record.body(self.credentials.actor().as_deref());

            let mut request = self
                .client
                .post(&url)
                .header("x-waypost-client", &self.client_id)
                .json(&Value::Object(body));
            if let Some(token) = self.credentials.token() {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    return SyncAttemptResult::TransientFailure {
                        message: e.to_string(),
                    }
                }
            };

            let status = response.status();
            debug!(%url, business_key = %record.business_key, %status, "create submitted");

            if status.is_success() {
                return SyncAttemptResult::Accepted;
            }
            if status == StatusCode::CONFLICT {
                return SyncAttemptResult::AlreadyExists;
            }

            let message = response.text().await.unwrap_or_default();
            if status.is_client_error() {
                SyncAttemptResult::RejectedByServer {
                    status: status.as_u16(),
                    message,
                }
            } else {
                SyncAttemptResult::TransientFailure {
                    message: format!("HTTP {status}: {message}"),
                }
            }
        }
    }
}
