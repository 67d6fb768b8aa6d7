use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{Result, WorkchatError};
use crate::models::{AnalyticsAnswer, AnalyticsQuestion, ForecastRequest, ForecastResponse};

/// Minimum number of observations the forecast endpoint can work with.
pub const MIN_FORECAST_POINTS: usize = 2;

/// Client-side view of the financial analytics API.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// Ask a free-form financial question. Timeout is in seconds and is
    /// enforced by the backend.
    async fn ask(&self, question: &str, timeout_secs: u64) -> Result<AnalyticsAnswer>;

    /// Run a statistical forecast over a numeric series.
    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse>;
}

/// Reject series too short to forecast before any network call is made.
pub fn validate_forecast_input(ts: &[f64]) -> Result<()> {
    if ts.len() < MIN_FORECAST_POINTS {
        return Err(WorkchatError::Validation(format!(
            "forecast requires at least {MIN_FORECAST_POINTS} data points, got {}",
            ts.len()
        )));
    }
    Ok(())
}

pub struct HttpAnalyticsApi {
    client: Client,
    base_url: String,
}

impl HttpAnalyticsApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config
                .api
                .analytics_base_url
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WorkchatError::Api { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AnalyticsApi for HttpAnalyticsApi {
    async fn ask(&self, question: &str, timeout_secs: u64) -> Result<AnalyticsAnswer> {
        let body = AnalyticsQuestion {
            question: question.to_string(),
            timeout: timeout_secs,
        };
        tracing::debug!("submitting analytics question");
        let response = self
            .client
            .post(format!("{}/r-analytics/ask", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        validate_forecast_input(&request.ts)?;
        tracing::debug!(
            model = %request.model,
            points = request.ts.len(),
            horizon = request.h,
            "requesting forecast"
        );
        let response = self
            .client
            .post(format!("{}/r-analytics/forecast", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }
}

/// Canned financial analyses offered alongside free-form questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPreset {
    Credit,
    Revenue,
    Expenses,
    Profit,
    CashFlow,
}

impl AnalysisPreset {
    pub const ALL: [AnalysisPreset; 5] = [
        AnalysisPreset::Credit,
        AnalysisPreset::Revenue,
        AnalysisPreset::Expenses,
        AnalysisPreset::Profit,
        AnalysisPreset::CashFlow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisPreset::Credit => "credit",
            AnalysisPreset::Revenue => "revenue",
            AnalysisPreset::Expenses => "expenses",
            AnalysisPreset::Profit => "profit",
            AnalysisPreset::CashFlow => "cash-flow",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            AnalysisPreset::Credit => "How large is the current credit exposure?",
            AnalysisPreset::Revenue => "How has revenue been changing?",
            AnalysisPreset::Expenses => "How have expenses been changing?",
            AnalysisPreset::Profit => "How has profit been changing?",
            AnalysisPreset::CashFlow => "How is the cash flow position?",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.label() == label)
    }
}
