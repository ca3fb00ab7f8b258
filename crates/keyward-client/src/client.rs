//! Keyward client implementation.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use keyward_core::models::{
    ApiKey, CreateKeyRequest, CreateProjectRequest, DeviceCheckSettings, PlayIntegritySettings,
    Project, Subscription, UpdateDeviceCheck, UpdatePlayIntegrity, UserInfo,
};

use crate::error::KeywardError;
use crate::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_TIMEOUT, Keyward, KeywardConfig,
};

#[derive(Deserialize)]
struct ProjectList {
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct KeyList {
    keys: Vec<ApiKey>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl Keyward {
    /// Create a new client with just a token. Reads other config from env vars.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::Config` if the token is empty.
    pub fn new(token: String) -> Result<Self, KeywardError> {
        Self::with_config(KeywardConfig {
            token,
            ..Default::default()
        })
    }

    /// Create a new client with full configuration.
    ///
    /// Empty `token` / `base_url` fall back to `KEYWARD_TOKEN` /
    /// `KEYWARD_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::Config` if no token is available, or
    /// `KeywardError::Network` if the HTTP client cannot be built.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: KeywardConfig) -> Result<Self, KeywardError> {
        let token = first_non_empty(&[
            &cfg.token,
            &std::env::var("KEYWARD_TOKEN").unwrap_or_default(),
        ]);
        if token.is_empty() {
            return Err(KeywardError::Config(
                "missing token — set KEYWARD_TOKEN or pass --token".to_owned(),
            ));
        }

        let base_url = first_non_empty(&[
            &cfg.base_url,
            &std::env::var("KEYWARD_API_URL").unwrap_or_default(),
            DEFAULT_BASE_URL,
        ])
        .trim_end_matches('/')
        .to_owned();

        let timeout = non_zero_or(cfg.timeout, DEFAULT_TIMEOUT);
        let max_retries = if cfg.max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            cfg.max_retries
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyward-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(KeywardError::Network)?;

        Ok(Self {
            token,
            base_url,
            max_retries,
            retry_base_delay: non_zero_or(cfg.retry_base_delay, DEFAULT_RETRY_BASE_DELAY),
            cache_ttl: non_zero_or(cfg.cache_ttl, DEFAULT_CACHE_TTL),
            client,
        })
    }

    /// API base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    // ── Account ──────────────────────────────────────────────────────

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn me(&self) -> Result<UserInfo, KeywardError> {
        self.get_json("/me").await
    }

    /// The account's current subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn subscription(&self) -> Result<Subscription, KeywardError> {
        self.get_json("/billing/subscription").await
    }

    // ── Projects ─────────────────────────────────────────────────────

    /// List all projects visible to the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_projects(&self) -> Result<Vec<Project>, KeywardError> {
        let list: ProjectList = self.get_json("/projects").await?;
        Ok(list.projects)
    }

    /// Fetch a single project.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::NotFound` if the project does not exist.
    pub async fn get_project(&self, project_id: Uuid) -> Result<Project, KeywardError> {
        self.get_json(&format!("/projects/{project_id}")).await
    }

    /// Create a project.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::Invalid` if the request fails validation, or an
    /// API error.
    pub async fn create_project(
        &self,
        req: &CreateProjectRequest,
    ) -> Result<Project, KeywardError> {
        req.validate()?;
        let body = serde_json::to_value(req)?;
        let text = self.send(Method::POST, "/projects", Some(body)).await?;
        parse(&text)
    }

    /// Delete a project and every key in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<(), KeywardError> {
        self.send(Method::DELETE, &format!("/projects/{project_id}"), None)
            .await?;
        Ok(())
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// List proxied keys of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_keys(&self, project_id: Uuid) -> Result<Vec<ApiKey>, KeywardError> {
        let list: KeyList = self.get_json(&format!("/projects/{project_id}/keys")).await?;
        Ok(list.keys)
    }

    /// Create a proxied key. The upstream secret is sent once and never
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_key(
        &self,
        project_id: Uuid,
        req: &CreateKeyRequest,
    ) -> Result<ApiKey, KeywardError> {
        let body = serde_json::to_value(req)?;
        let text = self
            .send(Method::POST, &format!("/projects/{project_id}/keys"), Some(body))
            .await?;
        parse(&text)
    }

    /// Delete a proxied key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn delete_key(&self, project_id: Uuid, key_id: Uuid) -> Result<(), KeywardError> {
        self.send(
            Method::DELETE,
            &format!("/projects/{project_id}/keys/{key_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    // ── Device attestation ───────────────────────────────────────────

    /// `DeviceCheck` settings of a project, `None` if never configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_device_check(
        &self,
        project_id: Uuid,
    ) -> Result<Option<DeviceCheckSettings>, KeywardError> {
        optional(
            self.get_json(&format!("/projects/{project_id}/devicecheck"))
                .await,
        )
    }

    /// Replace `DeviceCheck` settings of a project.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::Invalid` if the request fails validation, or an
    /// API error.
    pub async fn put_device_check(
        &self,
        project_id: Uuid,
        req: &UpdateDeviceCheck,
    ) -> Result<DeviceCheckSettings, KeywardError> {
        req.validate()?;
        let body = serde_json::to_value(req)?;
        let text = self
            .send(
                Method::PUT,
                &format!("/projects/{project_id}/devicecheck"),
                Some(body),
            )
            .await?;
        parse(&text)
    }

    /// Play Integrity settings of a project, `None` if never configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_play_integrity(
        &self,
        project_id: Uuid,
    ) -> Result<Option<PlayIntegritySettings>, KeywardError> {
        optional(
            self.get_json(&format!("/projects/{project_id}/play-integrity"))
                .await,
        )
    }

    /// Replace Play Integrity settings of a project.
    ///
    /// # Errors
    ///
    /// Returns `KeywardError::Invalid` if the request fails validation, or an
    /// API error.
    pub async fn put_play_integrity(
        &self,
        project_id: Uuid,
        req: &UpdatePlayIntegrity,
    ) -> Result<PlayIntegritySettings, KeywardError> {
        req.validate()?;
        let body = serde_json::to_value(req)?;
        let text = self
            .send(
                Method::PUT,
                &format!("/projects/{project_id}/play-integrity"),
                Some(body),
            )
            .await?;
        parse(&text)
    }

    // --- Private ---

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, KeywardError> {
        let text = self.send(Method::GET, path, None).await?;
        parse(&text)
    }

    /// Send a request with retries and return the raw success body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, KeywardError> {
        let url = format!("{}/v1{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            let mut req = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token);
            if let Some(ref b) = body {
                req = req.json(b);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    tracing::debug!(
                        %method,
                        path,
                        attempt,
                        status = status.as_u16(),
                        "api response"
                    );

                    if status.is_success() {
                        return resp.text().await.map_err(KeywardError::Network);
                    }

                    let error_text = resp.text().await.unwrap_or_default();
                    let msg = serde_json::from_str::<ApiErrorBody>(&error_text)
                        .ok()
                        .and_then(|b| b.message.or(b.error))
                        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(KeywardError::Auth(msg));
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(KeywardError::NotFound(msg));
                    }

                    last_err = Some(KeywardError::Api {
                        status_code: status.as_u16(),
                        message: msg,
                    });

                    if attempt < self.max_retries && is_retryable(status) {
                        self.sleep_with_jitter(attempt).await;
                        continue;
                    }
                }
                Err(e) => {
                    tracing::debug!(%method, path, attempt, error = %e, "api request failed");
                    last_err = Some(if e.is_timeout() {
                        KeywardError::Timeout
                    } else {
                        KeywardError::Network(e)
                    });

                    if attempt < self.max_retries {
                        self.sleep_with_jitter(attempt).await;
                        continue;
                    }
                }
            }

            break;
        }

        Err(last_err.unwrap_or(KeywardError::Api {
            status_code: 0,
            message: "unknown error".to_owned(),
        }))
    }

    async fn sleep_with_jitter(&self, attempt: u32) {
        #[allow(clippy::cast_possible_truncation)]
        let base = (self.retry_base_delay.as_millis() as u64)
            .saturating_mul(2u64.saturating_pow(attempt));
        #[allow(clippy::cast_precision_loss)]
        let base_f = base as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jitter = (base_f * 0.3 * rand_f64()) as u64;
        tokio::time::sleep(Duration::from_millis(base.saturating_add(jitter))).await;
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, KeywardError> {
    // Empty bodies (204s) deserialize like an empty object.
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(KeywardError::Json)
}

fn optional<T>(result: Result<T, KeywardError>) -> Result<Option<T>, KeywardError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(KeywardError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Pseudo-random f64 in [0, 1) from the clock; only used for jitter.
fn rand_f64() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

fn first_non_empty(vals: &[&str]) -> String {
    vals.iter()
        .find(|v| !v.is_empty())
        .map(|v| (*v).to_owned())
        .unwrap_or_default()
}
