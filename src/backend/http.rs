//! Hosted backend client.
//!
//! Talks to a backend-as-a-service REST surface: `auth/v1` for identity,
//! `storage/v1` for images, `functions/v1` for dish identification and
//! `rest/v1` for the meals table.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};
use tracing::debug;

use super::MealBackend;
use crate::config::BackendConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::model::{DishIdentification, Identity, MealRecord};

pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> CaptureResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(concat!("mealcap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CaptureError::external("reqwest", e))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Attach the API key and the user's token (or the API key when signed out).
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }
}

#[async_trait]
impl MealBackend for HttpBackend {
    async fn current_user(&self) -> Result<Option<Identity>> {
        let Some(token) = self.config.access_token.as_deref() else {
            return Ok(None);
        };
        let response = self
            .client
            .get(self.endpoint("auth/v1/user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to reach authentication service")?;
        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let identity = response
            .error_for_status()?
            .json::<Identity>()
            .await
            .context("Malformed user response")?;
        Ok(Some(identity))
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", bucket, key));
        debug!(%url, size = bytes.len(), "Uploading image");
        self.authorized(self.client.post(url))
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()
            .context("Failed to upload image")?;
        Ok(())
    }

    async fn public_url(&self, bucket: &str, key: &str) -> Result<String> {
        let raw = self.endpoint(&format!("storage/v1/object/public/{}/{}", bucket, key));
        let url = Url::parse(&raw).with_context(|| format!("Invalid public URL: {}", raw))?;
        Ok(url.to_string())
    }

    async fn identify_dish(&self, image: &str) -> Result<DishIdentification> {
        let url = self.endpoint(&format!("functions/v1/{}", self.config.identify_function));
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "image": image }))
            .send()
            .await
            .context("Failed to reach dish identification")?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("Malformed dish identification response")?;
        if let Some(message) = body.get("error").and_then(error_message) {
            return Err(anyhow!(message));
        }
        if !status.is_success() {
            return Err(anyhow!("Dish identification failed with status {}", status));
        }
        serde_json::from_value(body).context("Dish identification returned an unexpected shape")
    }

    async fn insert_meal(&self, record: &MealRecord) -> Result<()> {
        let url = self.endpoint(&format!("rest/v1/{}", self.config.meals_table));
        self.authorized(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?
            .error_for_status()
            .context("Failed to save meal")?;
        Ok(())
    }
}

/// The `error` field of a function response, as a string or `{ "message": .. }`.
fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}
