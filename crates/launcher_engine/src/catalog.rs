use std::time::Duration;

use reqwest::header::AUTHORIZATION;

use crate::{CatalogError, CatalogFailureKind, PipelineRecord};

const PIPELINES_PATH: &str = "api/GetPipelines";

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl CatalogSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7071".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Pipelines visible to the bearer of `access_token`, in server order.
    async fn fetch_pipelines(&self, access_token: &str)
        -> Result<Vec<PipelineRecord>, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestCatalogClient {
    settings: CatalogSettings,
    client: reqwest::Client,
}

impl ReqwestCatalogClient {
    pub fn new(settings: CatalogSettings) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| CatalogError::new(CatalogFailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn pipelines_url(&self) -> Result<reqwest::Url, CatalogError> {
        let mut base = self.settings.base_url.trim_end_matches('/').to_string();
        base.push('/');
        reqwest::Url::parse(&base)
            .and_then(|base| base.join(PIPELINES_PATH))
            .map_err(|err| CatalogError::new(CatalogFailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogClient for ReqwestCatalogClient {
    async fn fetch_pipelines(
        &self,
        access_token: &str,
    ) -> Result<Vec<PipelineRecord>, CatalogError> {
        if access_token.trim().is_empty() {
            return Err(CatalogError::new(
                CatalogFailureKind::MissingToken,
                "refusing to call the catalog without a bearer token",
            ));
        }
        let url = self.pipelines_url()?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::new(
                CatalogFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice::<Vec<PipelineRecord>>(&body)
            .map_err(|err| CatalogError::new(CatalogFailureKind::Decode, err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        return CatalogError::new(CatalogFailureKind::Timeout, err.to_string());
    }
    CatalogError::new(CatalogFailureKind::Network, err.to_string())
}
