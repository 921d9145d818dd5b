use std::time::Duration;

use async_trait::async_trait;
use nexure_core::config::AppConfig;
use nexure_core::domain::chat::{HistoryEntry, ReplyRequest, ReplyResponse};
use nexure_core::domain::order::{OrderProjection, OrderResultData, TrackOrderRequest};
use nexure_core::flows::{OrderLookup, RemoteError, ReplyService};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::guardrails::{ChatGuardrail, GuardrailDecision, GuardrailIntent};

pub const TRACK_ORDER_PATH: &str = "orders/track";
pub const CHAT_REPLY_PATH: &str = "chat/";

/// HTTP adapter for the storefront REST API.
#[derive(Clone)]
pub struct StorefrontClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    guardrail: ChatGuardrail,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .field("guardrail", &self.guardrail)
            .finish()
    }
}

impl StorefrontClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| RemoteError::Transport(format!("failed to build http client: {error}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            guardrail: ChatGuardrail::default(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteError> {
        let client = Self::new(&config.api.base_url, Duration::from_secs(config.api.timeout_secs))?
            .with_guardrail(ChatGuardrail::new(config.chat.max_message_chars));
        Ok(match &config.api.api_key {
            Some(api_key) => client.with_api_key(api_key.clone()),
            None => client,
        })
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_guardrail(mut self, guardrail: ChatGuardrail) -> Self {
        self.guardrail = guardrail;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check(&self, intent: GuardrailIntent<'_>) -> Result<(), RemoteError> {
        let decision = self.guardrail.evaluate(&intent);
        if let GuardrailDecision::Deny { reason_code, .. } = &decision {
            warn!(
                event_name = "storefront_api.guardrail_denied",
                action = intent.action_key(),
                reason_code = *reason_code,
                "outbound request blocked before sending"
            );
        }
        decision.into_result()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut request = self.http.post(&url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            warn!(event_name = "storefront_api.transport_failed", url = %url, error = %error, "request failed");
            RemoteError::Transport(error.to_string())
        })?;

        let status = response.status();
        debug!(event_name = "storefront_api.response", url = %url, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.json::<T>().await.map_err(|error| {
            warn!(event_name = "storefront_api.decode_failed", url = %url, error = %error, "invalid response body");
            RemoteError::Decode(error.to_string())
        })
    }
}

fn classify_status(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::NotFound
        }
        other => RemoteError::Rejected { status: other.as_u16() },
    }
}

#[async_trait]
impl OrderLookup for StorefrontClient {
    async fn track_order(
        &self,
        request: &TrackOrderRequest,
    ) -> Result<OrderResultData, RemoteError> {
        self.check(GuardrailIntent::OrderLookup { order_number: &request.order_number })?;

        let projection: OrderProjection = self.post_json(TRACK_ORDER_PATH, request).await?;
        Ok(OrderResultData::from(projection))
    }
}

#[async_trait]
impl ReplyService for StorefrontClient {
    async fn reply(&self, message: &str, history: &[HistoryEntry]) -> Result<String, RemoteError> {
        self.check(GuardrailIntent::FreeFormMessage { message })?;

        let body = ReplyRequest { message: message.to_string(), history: history.to_vec() };
        let response: ReplyResponse = self.post_json(CHAT_REPLY_PATH, &body).await?;
        Ok(response.reply)
    }
}
