use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::error::AnalysisError;
use crate::models::analysis::{AnalysisRequest, AnalysisResponse};

/// External coaching-feedback service
#[allow(async_fn_in_trait)]
pub trait AnalysisService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError>;
}

impl<A: AnalysisService> AnalysisService for std::sync::Arc<A> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        (**self).analyze(request).await
    }
}

/// HTTP client for `POST {base_url}/api/analyze`
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/analyze", self.base_url)
    }
}

impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        let url = self.endpoint();

        tracing::debug!(
            "Requesting analysis of {} frames for {}",
            request.keypoint_frames.len(),
            request.lift_type
        );

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if status.is_success() {
            let analysis: AnalysisResponse = response
                .json()
                .await
                .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;
            Ok(analysis)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(AnalysisError::from_status(status, error_text))
        }
    }
}
