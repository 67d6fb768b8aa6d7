use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{Result, WorkchatError};
use crate::models::{SearchRequest, Task, TaskAck};

/// Client-side view of the asynchronous task API.
///
/// One outbound call per operation, no retry at this layer: a transport
/// failure or non-2xx status surfaces to the caller as-is.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submit a query as a search task against a user-facing service id.
    async fn create_search_task(&self, query: &str, service_id: &str) -> Result<TaskAck>;

    /// Read a single task by id.
    async fn get_task(&self, task_id: &str) -> Result<Task>;

    /// Read every task known to the backend.
    async fn list_tasks(&self) -> Result<Vec<Task>>;
}

pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api.task_base_url.trim_end_matches('/').to_string(),
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
impl TaskApi for HttpTaskApi {
    async fn create_search_task(&self, query: &str, service_id: &str) -> Result<TaskAck> {
        let body = SearchRequest::for_service(query, service_id);
        tracing::debug!(
            service_name = body.service_name.as_str(),
            "submitting search task"
        );
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        let response = self
            .client
            .get(format!("{}/tasks/{}", self.base_url, task_id))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let response = self
            .client
            .get(format!("{}/tasks", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let mut config = Config::default();
        config.api.task_base_url = "http://localhost:8000/".to_string();
        let api = HttpTaskApi::new(&config).expect("client should build");
        assert_eq!(api.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_a_transport_error() {
        // Port 9 (discard) is not listening in the test environment.
        let mut config = Config::default();
        config.api.task_base_url = "http://127.0.0.1:9".to_string();
        config.api.request_timeout_secs = 1;
        let api = HttpTaskApi::new(&config).expect("client should build");

        let err = api.get_task("t-1").await.expect_err("must fail");
        assert!(matches!(err, WorkchatError::Transport(_)));
    }
}
