use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AdminError;
use crate::policy::ActivationPolicy;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const API_VERSION: &str = "v1beta4";

/// Merge-patch body for an instance. Only the activation policy is set so the
/// rest of the instance configuration is left as is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseInstancePatch {
    pub settings: SettingsPatch,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub activation_policy: ActivationPolicy,
}

impl DatabaseInstancePatch {
    pub fn new(activation_policy: ActivationPolicy) -> Self {
        Self {
            settings: SettingsPatch { activation_policy },
        }
    }
}

/// Long running operation descriptor returned by the admin service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Operation {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub operation_type: Option<String>,
    pub status: Option<String>,
    pub target_id: Option<String>,
    pub target_project: Option<String>,
    pub target_link: Option<String>,
    pub self_link: Option<String>,
    pub insert_time: Option<String>,
}

/// Instance management calls used by the dispatcher.
#[async_trait]
pub trait InstanceAdmin: Send + Sync {
    /// Applies `patch` to `instance` in `project`. Returns as soon as the
    /// service acknowledges the change.
    async fn patch_instance(
        &self,
        project: &str,
        instance: &str,
        patch: &DatabaseInstancePatch,
    ) -> Result<Operation, AdminError>;
}

/// Hands out an authenticated admin client for one invocation.
#[async_trait]
pub trait AdminClientFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn InstanceAdmin>, AdminError>;
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AdminError>;
}

/// A token minted outside of this process.
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, AdminError> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials: a `GOOGLE_APPLICATION_CREDENTIALS` key
/// file, gcloud user credentials, or the compute metadata server.
#[derive(Default)]
pub struct AdcTokenSource {
    provider: OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
}

impl AdcTokenSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenSource for AdcTokenSource {
    async fn access_token(&self) -> Result<String, AdminError> {
        let provider = self
            .provider
            .get_or_try_init(gcp_auth::provider)
            .await
            .map_err(|e| AdminError::Token(e.to_string()))?;

        let token = provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| AdminError::Token(e.to_string()))?;

        Ok(token.as_str().to_string())
    }
}

/// REST client for the Cloud SQL Admin API.
pub struct SqlAdminClient {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl SqlAdminClient {
    pub fn new(http: reqwest::Client, endpoint: Url, token: String) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }

    /// Resource URL of an instance. Identifiers are percent-encoded as single
    /// path segments; dot segments would be collapsed by the URL parser and
    /// are refused.
    pub fn instance_url(&self, project: &str, instance: &str) -> Result<Url, AdminError> {
        for id in [project, instance] {
            if matches!(id, "" | "." | "..") {
                return Err(AdminError::Identifier(id.to_string()));
            }
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AdminError::Endpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["sql", API_VERSION, "projects", project, "instances", instance]);
        Ok(url)
    }
}

#[async_trait]
impl InstanceAdmin for SqlAdminClient {
    async fn patch_instance(
        &self,
        project: &str,
        instance: &str,
        patch: &DatabaseInstancePatch,
    ) -> Result<Operation, AdminError> {
        let url = self.instance_url(project, instance)?;
        debug!(%url, "Patching instance");

        let response = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .json(patch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to read admin error body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), "Admin service rejected patch");
            return Err(AdminError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        Ok(response.json::<Operation>().await?)
    }
}

/// Pulls the message out of a Google API error body, falling back to the raw
/// text.
pub fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }

    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}

pub struct SqlAdminClientFactory {
    http: reqwest::Client,
    endpoint: Url,
    tokens: Arc<dyn TokenSource>,
}

impl SqlAdminClientFactory {
    pub fn new(http: reqwest::Client, endpoint: Url, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            endpoint,
            tokens,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AdminError> {
        let http = reqwest::Client::new();
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| AdminError::Endpoint(format!("{}: {}", config.endpoint, e)))?;

        let tokens: Arc<dyn TokenSource> = match &config.access_token {
            Some(token) => Arc::new(StaticTokenSource::new(token.clone())),
            None => Arc::new(AdcTokenSource::new()),
        };

        Ok(Self::new(http, endpoint, tokens))
    }
}

#[async_trait]
impl AdminClientFactory for SqlAdminClientFactory {
    async fn create(&self) -> Result<Box<dyn InstanceAdmin>, AdminError> {
        let token = self.tokens.access_token().await?;
        Ok(Box::new(SqlAdminClient::new(
            self.http.clone(),
            self.endpoint.clone(),
            token,
        )))
    }
}
