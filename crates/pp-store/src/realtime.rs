//! Realtime database over its REST interface: `PUT {base}/{path}.json`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use pp_schemas::{Collection, InitState};

use crate::{RealtimeStore, StoreError};

pub struct RestRealtimeStore {
    base_url: String,
    auth: Option<String>,
    http: reqwest::Client,
    state: InitState,
}

impl std::fmt::Debug for RestRealtimeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRealtimeStore")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth.as_ref().map(|_| "<REDACTED>"))
            .field("state", &self.state)
            .finish()
    }
}

impl RestRealtimeStore {
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            auth,
            http,
            state: InitState::Uninitialized,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), path)
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        self.auth
            .as_deref()
            .map(|a| vec![("auth", a)])
            .unwrap_or_default()
    }
}

async fn check(resp: reqwest::Response) -> Result<(), StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(StoreError::Http {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RealtimeStore for RestRealtimeStore {
    fn name(&self) -> &'static str {
        "realtime-rest"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    /// Shallow read of the root; proves reachability and credentials.
    async fn init(&mut self) -> Result<(), StoreError> {
        let mut query = self.auth_query();
        query.push(("shallow", "true"));
        let result = async {
            let resp = self
                .http
                .get(format!("{}/.json", self.base_url.trim_end_matches('/')))
                .query(&query)
                .send()
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            check(resp).await.map_err(|e| StoreError::Connect(e.to_string()))
        }
        .await;

        match result {
            Ok(()) => {
                info!(base_url = %self.base_url, "realtime store ready");
                self.state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn put_document(
        &self,
        collection: Collection,
        key: &str,
        doc: &Value,
    ) -> Result<(), StoreError> {
        if !self.state.is_ready() {
            debug!(%collection, key, "realtime store not ready; put skipped");
            return Ok(());
        }
        let resp = self
            .http
            .put(self.url(&format!("{}/{}", collection.as_str(), key)))
            .query(&self.auth_query())
            .json(doc)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        check(resp).await
    }
}
