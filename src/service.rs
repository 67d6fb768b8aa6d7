use std::sync::Arc;

use crate::analytics::{AnalyticsApi, HttpAnalyticsApi};
use crate::config::Config;
use crate::error::{Result, WorkchatError};
use crate::models::{
    AnalyticsAnswer, ChatHistory, ForecastRequest, ForecastResponse, MessageRole, Task,
};
use crate::poller::{CancelToken, PollConfig, TaskPoller};
use crate::repository::ChatHistoryRepository;
use crate::transport::{HttpTaskApi, TaskApi};

/// Front door for the chat workflow: submit a query as a backend task, poll
/// it to a terminal state, and keep the conversation in the history
/// repository.
pub struct AssistantService {
    tasks: Arc<dyn TaskApi>,
    analytics: Arc<dyn AnalyticsApi>,
    history: Arc<dyn ChatHistoryRepository>,
    poller: TaskPoller,
    config: Arc<Config>,
}

impl AssistantService {
    /// Wire up HTTP clients from configuration.
    pub fn new(config: Arc<Config>, history: Arc<dyn ChatHistoryRepository>) -> Result<Self> {
        let tasks: Arc<dyn TaskApi> = Arc::new(HttpTaskApi::new(&config)?);
        let analytics: Arc<dyn AnalyticsApi> = Arc::new(HttpAnalyticsApi::new(&config)?);
        let poller = TaskPoller::new(
            Arc::clone(&tasks),
            PollConfig {
                interval: config.poll_interval(),
                timeout: config.poll_timeout(),
            },
        );
        Ok(Self {
            tasks,
            analytics,
            history,
            poller,
            config,
        })
    }

    /// Assemble from pre-built parts. Used by tests and bespoke wiring.
    pub fn from_parts(
        tasks: Arc<dyn TaskApi>,
        analytics: Arc<dyn AnalyticsApi>,
        history: Arc<dyn ChatHistoryRepository>,
        poller: TaskPoller,
        config: Arc<Config>,
    ) -> Self {
        Self {
            tasks,
            analytics,
            history,
            poller,
            config,
        }
    }

    /// Ask a question against a service and wait for the answer.
    ///
    /// The user message is recorded before submission, the assistant answer
    /// after the task completes. Any failure along the way propagates; the
    /// caller decides how to render it.
    pub async fn ask(
        &self,
        chat_id: &str,
        query: &str,
        service_id: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Task> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WorkchatError::Validation(
                "query must not be empty".to_string(),
            ));
        }

        self.history
            .add_message(chat_id, MessageRole::User, query)
            .await?;

        let ack = self.tasks.create_search_task(query, service_id).await?;
        tracing::info!(
            task_id = ack.task_id.as_str(),
            service = service_id,
            "search task submitted"
        );

        let task = self.poller.poll_until_done(&ack.task_id, cancel).await?;

        if let Some(result) = &task.result {
            self.history
                .add_message(chat_id, MessageRole::Assistant, &result.answer)
                .await?;
        } else if let Some(error) = &task.error {
            tracing::warn!(
                task_id = task.task_id.as_str(),
                error = error.as_str(),
                "task finished without a result"
            );
        }

        Ok(task)
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        self.analytics.forecast(request).await
    }

    pub async fn analytics_ask(&self, question: &str) -> Result<AnalyticsAnswer> {
        self.analytics
            .ask(question, self.config.api.analytics_ask_timeout_secs)
            .await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.tasks.list_tasks().await
    }

    pub async fn new_chat(&self) -> Result<ChatHistory> {
        self.history.create_chat().await
    }

    pub fn history(&self) -> &Arc<dyn ChatHistoryRepository> {
        &self.history
    }
}
