use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::services;

/// Task type tag sent with every search submission.
pub const SEARCH_TASK_TYPE: &str = "search-and-answer";

/// Result cap requested from the backend per search.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Chat titles are derived from the first message, truncated to this length.
pub const CHAT_TITLE_MAX_CHARS: usize = 30;

/// Status of a backend task as observed by the client.
///
/// The backend treats status as an open string set; only `completed` and
/// `failed` are terminal. Unrecognized values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(untagged)]
    Other(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Filter block attached to a search submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    pub category: String,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub task_type: String,
    pub service_name: String,
    pub filters: SearchFilters,
    pub max_results: u32,
}

impl SearchRequest {
    /// Build a submission body for a query against a user-facing service id,
    /// translating the id to its backend name and filter category through
    /// the shared catalog.
    pub fn for_service(query: &str, service_id: &str) -> Self {
        Self {
            query: query.to_string(),
            task_type: SEARCH_TASK_TYPE.to_string(),
            service_name: services::api_name(service_id).to_string(),
            filters: SearchFilters {
                category: services::category(service_id).to_string(),
            },
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Acknowledgement returned by `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAck {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub message: String,
    pub created_at: String,
}

/// Input payload echoed back on task reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub query: String,
    pub filters: SearchFilters,
    pub max_results: u32,
}

/// Result attached to a task once processing finishes. Immutable after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub answer: String,
    #[serde(default)]
    pub processed: bool,
    pub processing_time_ms: u64,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub timestamp: String,
}

/// A task as stored by the backend. Mutated server-side only; the client
/// reads it by polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub service_name: String,
    pub task_type: String,
    pub payload: TaskPayload,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Forecast model accepted by the analytics backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastModel {
    #[default]
    Arima,
    Ets,
    Naive,
}

impl std::fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastModel::Arima => write!(f, "arima"),
            ForecastModel::Ets => write!(f, "ets"),
            ForecastModel::Naive => write!(f, "naive"),
        }
    }
}

/// Body of `POST /r-analytics/forecast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub ts: Vec<f64>,
    pub model: ForecastModel,
    pub frequency: u32,
    pub h: u32,
    pub level: f64,
}

impl ForecastRequest {
    /// A request with the backend's documented defaults: ARIMA, monthly
    /// frequency, six periods ahead, 90% confidence.
    pub fn new(ts: Vec<f64>) -> Self {
        Self {
            ts,
            model: ForecastModel::Arima,
            frequency: 12,
            h: 6,
            level: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub method: String,
    pub forecast: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub level: f64,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /r-analytics/ask`. Timeout is in seconds and enforced
/// server-side.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsQuestion {
    pub question: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_count: u64,
    pub total_sum: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRawData {
    #[serde(rename = "type")]
    pub kind: String,
    pub historical_totals: Vec<f64>,
    pub historical_count: u64,
    pub historical_sum: f64,
    pub forecast_values: Vec<f64>,
    pub forecast_periods: u32,
    pub forecast_sum: f64,
    pub output_length: u64,
    pub script_type: String,
    pub summary: AnalyticsSummary,
    pub raw_output: String,
}

/// Structured answer from the analytics question endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsAnswer {
    pub success: bool,
    pub answer: String,
    #[serde(default)]
    pub script_used: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub raw_data: Option<AnalyticsRawData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One message in a chat history. Ids and timestamps are assigned on
/// construction, never by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", uuid::Uuid::new_v4()),
            content: content.into(),
            role,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// A locally persisted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: String,
    pub title: String,
    pub last_message: String,
    /// Epoch milliseconds of the most recent activity.
    pub timestamp: i64,
    pub messages: Vec<Message>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self {
            id: format!("chat-{}", uuid::Uuid::new_v4()),
            title: "New Chat".to_string(),
            last_message: String::new(),
            timestamp: Utc::now().timestamp_millis(),
            messages: Vec::new(),
        }
    }

    /// Append a message, updating the preview, the recency timestamp, and
    /// (for the first message) the derived title.
    pub fn push_message(&mut self, message: Message) {
        self.last_message = message.content.clone();
        self.timestamp = Utc::now().timestamp_millis();
        self.messages.push(message);
        if self.messages.len() == 1 {
            self.title = derive_title(&self.messages[0].content);
        }
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// First-message chat title, truncated with an ellipsis past 30 characters.
pub fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(CHAT_TITLE_MAX_CHARS).collect();
    if content.chars().count() > CHAT_TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_deserializes_known_and_unknown_values() {
        let completed: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(completed, TaskStatus::Completed);
        assert!(completed.is_terminal());

        let failed: TaskStatus = serde_json::from_str("\"failed\"").unwrap();
        assert!(failed.is_terminal());

        let pending: TaskStatus = serde_json::from_str("\"pending\"").unwrap();
        assert!(!pending.is_terminal());

        let exotic: TaskStatus = serde_json::from_str("\"awaiting-review\"").unwrap();
        assert_eq!(exotic, TaskStatus::Other("awaiting-review".to_string()));
        assert!(!exotic.is_terminal());
    }

    #[test]
    fn status_serializes_back_to_wire_strings() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Other("queued".to_string())).unwrap(),
            "\"queued\""
        );
    }

    #[test]
    fn search_request_maps_service_names_through_catalog() {
        let req = SearchRequest::for_service("test", "company-policies");
        assert_eq!(req.service_name, "work-internal");
        assert_eq!(req.filters.category, "policies");
        assert_eq!(req.task_type, SEARCH_TASK_TYPE);
        assert_eq!(req.max_results, DEFAULT_MAX_RESULTS);

        let req = SearchRequest::for_service("test", "employee-directory");
        assert_eq!(req.service_name, "workers-info");
        assert_eq!(req.filters.category, "employees");

        // Unknown ids pass through unchanged with the general category.
        let req = SearchRequest::for_service("test", "custom-service");
        assert_eq!(req.service_name, "custom-service");
        assert_eq!(req.filters.category, "general");
    }

    #[test]
    fn task_deserializes_without_result_or_error() {
        let json = r#"{
            "task_id": "t-1",
            "service_name": "work-internal",
            "task_type": "search-and-answer",
            "payload": {"query": "pto policy", "filters": {"category": "policies"}, "max_results": 5},
            "status": "pending",
            "created_at": "2025-05-01T10:00:00Z",
            "updated_at": "2025-05-01T10:00:00Z",
            "error": null
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn forecast_request_defaults_match_backend_contract() {
        let req = ForecastRequest::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(req.model, ForecastModel::Arima);
        assert_eq!(req.frequency, 12);
        assert_eq!(req.h, 6);
        assert!((req.level - 0.9).abs() < f64::EPSILON);
        assert_eq!(
            serde_json::to_value(req.model).unwrap(),
            serde_json::json!("arima")
        );
    }

    #[test]
    fn title_derivation_truncates_long_first_messages() {
        assert_eq!(derive_title("short"), "short");
        let long = "a".repeat(45);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), CHAT_TITLE_MAX_CHARS + 3);
        assert!(title.ends_with("..."));

        let exact = "b".repeat(CHAT_TITLE_MAX_CHARS);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn push_message_updates_title_and_preview() {
        let mut chat = ChatHistory::new();
        assert_eq!(chat.title, "New Chat");

        chat.push_message(Message::new(MessageRole::User, "Where is the PTO policy?"));
        assert_eq!(chat.title, "Where is the PTO policy?");
        assert_eq!(chat.last_message, "Where is the PTO policy?");

        chat.push_message(Message::new(MessageRole::Assistant, "In the handbook."));
        // Title stays pinned to the first message.
        assert_eq!(chat.title, "Where is the PTO policy?");
        assert_eq!(chat.last_message, "In the handbook.");
        assert_eq!(chat.messages.len(), 2);
    }
}
