//! Recommendation provider — invoked once per completed interview.
//!
//! Failures here are always soft: the interview still finishes and the
//! client still receives the final frame. The handler logs and moves on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RecommendationError;

/// What the provider produced for a finished interview.
#[derive(Debug, Clone, Default)]
pub struct RecommendationOutcome {
    /// Free-form career consultation text, if the recommender generated one.
    pub consultation: Option<String>,
    /// External vacancy ids (HeadHunter ids in the reference deployment).
    pub hh_ids: Vec<String>,
    /// Full recommendation payloads, passed through to the client as-is.
    pub recommendations: Vec<serde_json::Value>,
}

/// Produces recommendations from the collected answer map.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn produce(
        &self,
        collected_data: &HashMap<String, String>,
    ) -> Result<RecommendationOutcome, RecommendationError>;
}

/// HTTP-backed provider: POSTs the collected answers to an external
/// recommender service and maps its response onto the outcome.
pub struct HttpRecommendationProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RecommenderResponse {
    #[serde(default)]
    consultation: Option<String>,
    #[serde(default)]
    hh_ids: Vec<String>,
    #[serde(default)]
    recommendations: Vec<serde_json::Value>,
}

impl HttpRecommendationProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RecommendationProvider for HttpRecommendationProvider {
    async fn produce(
        &self,
        collected_data: &HashMap<String, String>,
    ) -> Result<RecommendationOutcome, RecommendationError> {
        let url = format!("{}/recommendations", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(collected_data)
            .send()
            .await
            .map_err(|e| RecommendationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RecommendationError::Request(format!(
                "recommender returned {}",
                response.status()
            )));
        }

        let body: RecommenderResponse = response
            .json()
            .await
            .map_err(|e| RecommendationError::InvalidResponse(e.to_string()))?;

        Ok(RecommendationOutcome {
            consultation: body.consultation,
            hh_ids: body.hh_ids,
            recommendations: body.recommendations,
        })
    }
}
