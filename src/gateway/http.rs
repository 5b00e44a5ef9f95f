use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::errors::GatewayError;
use super::types::{Factor, ModelDescriptor, RemoteVerifyDecision, RemoteVerifyRequest};

/// Single capability through which the edge talks to the cloud backend.
///
/// Every method reports connectivity loss as [`GatewayError::Unreachable`]
/// so all callers handle the same failure shape.
#[async_trait]
pub trait CloudGateway: Send + Sync {
    /// Descriptor of the currently active model, or `None` if no model has
    /// been trained yet
    async fn fetch_model_descriptor(&self) -> Result<Option<ModelDescriptor>, GatewayError>;

    /// Download a model artifact by its advertised URI
    async fn download_artifact(&self, uri: &str) -> Result<Vec<u8>, GatewayError>;

    /// Server-side re-validation of locally collected factor results
    async fn remote_verify(
        &self,
        request: &RemoteVerifyRequest,
    ) -> Result<RemoteVerifyDecision, GatewayError>;
}

/// HTTP implementation of [`CloudGateway`] against the backend API
#[derive(Debug, Clone)]
pub struct HttpCloudGateway {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct VerifyResponse {
    approved: bool,
    failed_factor: Option<Factor>,
}

impl HttpCloudGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("Invalid base URL: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Config(format!("Invalid endpoint path: {e}")))
    }
}

#[async_trait]
impl CloudGateway for HttpCloudGateway {
    #[tracing::instrument(skip(self))]
    async fn fetch_model_descriptor(&self) -> Result<Option<ModelDescriptor>, GatewayError> {
        let url = self.endpoint("api/get-model-info")?;
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }

        let descriptor: ModelDescriptor = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(Some(descriptor))
    }

    #[tracing::instrument(skip(self))]
    async fn download_artifact(&self, uri: &str) -> Result<Vec<u8>, GatewayError> {
        // Artifact URIs are advertised absolute; relative ones resolve
        // against the gateway base.
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(_) => self.endpoint(uri)?,
        };

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        tracing::info!(size = bytes.len(), "Model artifact downloaded");
        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn remote_verify(
        &self,
        request: &RemoteVerifyRequest,
    ) -> Result<RemoteVerifyDecision, GatewayError> {
        let url = self.endpoint("api/verify-user")?;
        let response = self.client.post(url).json(request).send().await?;

        if !response.status().is_success() && response.status().as_u16() != 401 {
            return Err(GatewayError::Status(response.status().as_u16()));
        }

        let verdict: VerifyResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if verdict.approved {
            Ok(RemoteVerifyDecision::Approved)
        } else {
            Ok(RemoteVerifyDecision::Rejected {
                // The server names the disagreeing factor when it can; face
                // is the stale-model default otherwise.
                failed_factor: verdict.failed_factor.unwrap_or(Factor::Face),
            })
        }
    }
}
