use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use pp_reconcile::PricePolicy;
use pp_schemas::{Brand, Fueltype, InitState, Price, Station};

use crate::token::{AccessToken, TokenCache};
use crate::wire::{self, PriceData, ReferenceData};
use crate::{timestamp, FuelCheckError, Upstream};

const TOKEN_PATH: &str = "/oauth/client_credential/accesstoken";
const LOVS_PATH: &str = "/FuelCheckRefData/v1/fuel/lovs";
const PRICES_PATH: &str = "/FuelPriceCheck/v1/fuel/prices";
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Everything the client needs. Credentials come from resolved secrets and
/// are never logged.
#[derive(Clone)]
pub struct FuelCheckConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timezone: Tz,
    pub token_cache_path: PathBuf,
    pub max_token_attempts: u32,
    pub timeout: Duration,
    pub policy: PricePolicy,
}

impl std::fmt::Debug for FuelCheckConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuelCheckConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .field("timezone", &self.timezone)
            .field("token_cache_path", &self.token_cache_path)
            .field("max_token_attempts", &self.max_token_attempts)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    brands: Vec<Brand>,
    fueltypes: Vec<Fueltype>,
    stations: Vec<Station>,
    prices: Vec<Price>,
}

/// NSW FuelCheck API client.
#[derive(Debug)]
pub struct FuelCheckClient {
    config: FuelCheckConfig,
    http: reqwest::Client,
    cache: TokenCache,
    state: InitState,
    snapshot: Snapshot,
}

impl FuelCheckClient {
    pub fn new(config: FuelCheckConfig) -> Result<Self, FuelCheckError> {
        if config.max_token_attempts == 0 {
            return Err(FuelCheckError::Config(
                "max_token_attempts must be at least 1".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FuelCheckError::Config(e.to_string()))?;
        let cache = TokenCache::new(config.token_cache_path.clone());
        Ok(Self {
            config,
            http,
            cache,
            state: InitState::Uninitialized,
            snapshot: Snapshot::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// A valid access token: the cached one when still live, otherwise a
    /// freshly issued one. Issuance is attempted at most
    /// `max_token_attempts` times with exponential backoff between tries.
    pub async fn access_token(&self) -> Result<AccessToken, FuelCheckError> {
        if let Some(t) = self.cache.load_valid(Utc::now()) {
            debug!("using cached fuelcheck token");
            return Ok(t);
        }

        let max = self.config.max_token_attempts;
        let mut last_err = FuelCheckError::Unauthorized("no token attempt made".into());
        for attempt in 1..=max {
            info!(attempt, max, "fetching fuelcheck access token");
            match self.request_token().await {
                Ok(token) if !token.is_expired(Utc::now()) => {
                    if let Err(e) = self.cache.store(&token) {
                        warn!(error = %e, "token not cached");
                    }
                    return Ok(token);
                }
                Ok(_) => {
                    last_err = FuelCheckError::Unauthorized("issued token already expired".into());
                }
                Err(e @ FuelCheckError::Unauthorized(_)) => return Err(e),
                Err(e) => last_err = e,
            }
            if attempt < max {
                tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
            }
        }
        Err(last_err)
    }

    async fn request_token(&self) -> Result<AccessToken, FuelCheckError> {
        let resp = self
            .http
            .get(self.url(TOKEN_PATH))
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| FuelCheckError::Transport(e.to_string()))?;
        decode(resp).await
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &AccessToken,
        if_modified_since: Option<String>,
    ) -> Result<T, FuelCheckError> {
        let now = timestamp::format(Utc::now(), self.config.timezone);
        let mut req = self
            .http
            .get(self.url(path))
            .header("apikey", &self.config.api_key)
            .header("Authorization", token.bearer())
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header("requesttimestamp", now)
            .header("transactionid", uuid::Uuid::new_v4().to_string());
        if let Some(since) = if_modified_since {
            req = req.header("if-modified-since", since);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| FuelCheckError::Transport(e.to_string()))?;
        decode(resp).await
    }

    async fn fetch_all(&self, token: &AccessToken) -> Result<Snapshot, FuelCheckError> {
        let epoch = timestamp::format(DateTime::<Utc>::default(), self.config.timezone);
        let reference: ReferenceData = self.get_data(LOVS_PATH, token, Some(epoch)).await?;
        let price_data: PriceData = self.get_data(PRICES_PATH, token, None).await?;

        let (prices, ingest) = wire::prices(
            &price_data.prices,
            self.config.timezone,
            &self.config.policy,
            Utc::now(),
        );
        info!(
            kept = ingest.kept,
            expired = ingest.expired,
            undated = ingest.undated,
            malformed = ingest.malformed,
            "fuelcheck prices converted"
        );

        Ok(Snapshot {
            brands: wire::brands(&reference.brands.items),
            fueltypes: wire::fueltypes(&reference.fueltypes.items),
            stations: reference.stations.items.iter().map(wire::station).collect(),
            prices,
        })
    }

    fn gated<T: Clone>(&self, what: &str, data: &[T]) -> Vec<T> {
        if self.state.is_ready() {
            data.to_vec()
        } else {
            debug!(collection = what, state = ?self.state, "fuelcheck not ready");
            Vec::new()
        }
    }
}

/// Decode a JSON body, mapping non-success statuses onto error variants.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, FuelCheckError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| FuelCheckError::Transport(e.to_string()))?;

    if !status.is_success() {
        let (code, message) = error_details(&body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FuelCheckError::Unauthorized(message),
            _ => FuelCheckError::Api {
                status: status.as_u16(),
                code,
                message,
            },
        });
    }

    serde_json::from_str(&body).map_err(|e| FuelCheckError::Decode(e.to_string()))
}

/// Token errors use `{ErrorCode, Error}`; data errors use
/// `{errorDetails: {code, message}}`.
fn error_details(body: &str) -> (Option<String>, String) {
    let v: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    if let Some(details) = v.get("errorDetails") {
        return (
            text(details.get("code")),
            text(details.get("message")).unwrap_or_else(|| body.to_string()),
        );
    }
    if v.get("ErrorCode").is_some() || v.get("Error").is_some() {
        return (
            text(v.get("ErrorCode")),
            text(v.get("Error")).unwrap_or_else(|| body.to_string()),
        );
    }
    (None, body.to_string())
}

#[async_trait]
impl Upstream for FuelCheckClient {
    fn name(&self) -> &'static str {
        "fuelcheck"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), FuelCheckError> {
        let result = async {
            let token = self.access_token().await?;
            match self.fetch_all(&token).await {
                // A revoked cached token surfaces here; drop it and reissue once.
                Err(FuelCheckError::Unauthorized(msg)) => {
                    warn!(reason = %msg, "fuelcheck rejected token; reissuing");
                    self.cache.clear();
                    let token = self.access_token().await?;
                    self.fetch_all(&token).await
                }
                other => other,
            }
        }
        .await;

        match result {
            Ok(snapshot) => {
                info!(
                    brands = snapshot.brands.len(),
                    fueltypes = snapshot.fueltypes.len(),
                    stations = snapshot.stations.len(),
                    prices = snapshot.prices.len(),
                    "fuelcheck initialised"
                );
                self.snapshot = snapshot;
                self.state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn brands(&self) -> Vec<Brand> {
        self.gated("brands", &self.snapshot.brands)
    }

    fn fueltypes(&self) -> Vec<Fueltype> {
        self.gated("fueltypes", &self.snapshot.fueltypes)
    }

    fn stations(&self) -> Vec<Station> {
        self.gated("stations", &self.snapshot.stations)
    }

    fn prices(&self) -> Vec<Price> {
        self.gated("prices", &self.snapshot.prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_details_shapes() {
        assert_eq!(
            error_details(r#"{"errorDetails":{"code":"E1","message":"nope"}}"#),
            (Some("E1".to_string()), "nope".to_string())
        );
        assert_eq!(
            error_details(r#"{"ErrorCode":"invalid_client","Error":"bad secret"}"#),
            (Some("invalid_client".to_string()), "bad secret".to_string())
        );
        assert_eq!(error_details("oops"), (None, "oops".to_string()));
    }
}
