use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, WorkchatError};
use crate::models::{ChatHistory, Message, MessageRole};
use crate::redis::RedisManager;

/// Storage seam for chat histories. Constructed and injected per application
/// instance: in-memory for tests and demos, Redis for real persistence.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ChatHistoryRepository: Send + Sync {
    /// All chats, most recently touched first.
    async fn list_chats(&self) -> Result<Vec<ChatHistory>>;

    async fn get_chat(&self, id: &str) -> Result<Option<ChatHistory>>;

    /// Create an empty chat with a fresh id.
    async fn create_chat(&self) -> Result<ChatHistory>;

    /// Append a message to a chat; returns the updated chat. The message id
    /// and timestamp are assigned here.
    async fn add_message(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatHistory>;

    /// Remove a chat. Deleting an unknown id is a no-op.
    async fn delete_chat(&self, id: &str) -> Result<()>;

    async fn rename_chat(&self, id: &str, title: &str) -> Result<ChatHistory>;
}

/// In-memory repository. The vector is kept ordered with the most recently
/// touched chat at the front.
pub struct InMemoryChatHistoryRepository {
    chats: RwLock<Vec<ChatHistory>>,
}

impl InMemoryChatHistoryRepository {
    pub fn new() -> Self {
        Self {
            chats: RwLock::new(Vec::new()),
        }
    }

    /// A repository pre-filled with short demo conversations so a fresh
    /// install has something to show.
    pub fn with_demo_data() -> Self {
        let chats = vec![
            demo_chat(&[
                (MessageRole::User, "How many vacation days do new employees get?"),
                (
                    MessageRole::Assistant,
                    "New employees accrue 20 vacation days per year, available after the probation period.",
                ),
            ]),
            demo_chat(&[
                (MessageRole::User, "Who is the contact for the finance team?"),
                (
                    MessageRole::Assistant,
                    "The finance team is reachable through its shared inbox; the directory lists the current lead.",
                ),
            ]),
        ];
        Self {
            chats: RwLock::new(chats),
        }
    }
}

impl Default for InMemoryChatHistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_chat(messages: &[(MessageRole, &str)]) -> ChatHistory {
    let mut chat = ChatHistory::new();
    for (role, content) in messages {
        chat.push_message(Message::new(*role, *content));
    }
    chat
}

#[async_trait]
impl ChatHistoryRepository for InMemoryChatHistoryRepository {
    async fn list_chats(&self) -> Result<Vec<ChatHistory>> {
        Ok(self.chats.read().await.clone())
    }

    async fn get_chat(&self, id: &str) -> Result<Option<ChatHistory>> {
        Ok(self
            .chats
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn create_chat(&self) -> Result<ChatHistory> {
        let chat = ChatHistory::new();
        self.chats.write().await.insert(0, chat.clone());
        Ok(chat)
    }

    async fn add_message(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatHistory> {
        let mut chats = self.chats.write().await;
        let index = chats
            .iter()
            .position(|c| c.id == chat_id)
            .ok_or_else(|| WorkchatError::ChatNotFound {
                id: chat_id.to_string(),
            })?;

        // Move the chat to the front of the list.
        let mut chat = chats.remove(index);
        chat.push_message(Message::new(role, content));
        chats.insert(0, chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, id: &str) -> Result<()> {
        self.chats.write().await.retain(|c| c.id != id);
        Ok(())
    }

    async fn rename_chat(&self, id: &str, title: &str) -> Result<ChatHistory> {
        let mut chats = self.chats.write().await;
        let chat = chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| WorkchatError::ChatNotFound { id: id.to_string() })?;
        chat.title = title.to_string();
        Ok(chat.clone())
    }
}

const CHAT_KEY_PREFIX: &str = "chat:";
const CHAT_INDEX_KEY: &str = "chats:by_recency";

fn chat_key(id: &str) -> String {
    format!("{CHAT_KEY_PREFIX}{id}")
}

/// Redis-backed repository: chats as JSON blobs under `chat:{id}`, with a
/// recency-scored sorted set as the listing index.
pub struct RedisChatHistoryRepository {
    redis: RedisManager,
}

impl RedisChatHistoryRepository {
    pub fn new(redis: RedisManager) -> Self {
        Self { redis }
    }

    async fn save(&self, chat: &ChatHistory) -> Result<()> {
        self.redis.set_json(&chat_key(&chat.id), chat).await?;
        self.redis
            .zadd(CHAT_INDEX_KEY, &chat.id, chat.timestamp)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatHistoryRepository for RedisChatHistoryRepository {
    async fn list_chats(&self) -> Result<Vec<ChatHistory>> {
        let ids = self.redis.zrevrange_all(CHAT_INDEX_KEY).await?;
        let mut chats = Vec::with_capacity(ids.len());
        for id in ids {
            // Index entries can outlive expired chat blobs; skip those.
            if let Some(chat) = self.redis.get_json::<ChatHistory>(&chat_key(&id)).await? {
                chats.push(chat);
            }
        }
        Ok(chats)
    }

    async fn get_chat(&self, id: &str) -> Result<Option<ChatHistory>> {
        self.redis.get_json(&chat_key(id)).await
    }

    async fn create_chat(&self) -> Result<ChatHistory> {
        let chat = ChatHistory::new();
        self.save(&chat).await?;
        Ok(chat)
    }

    async fn add_message(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatHistory> {
        let mut chat = self
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| WorkchatError::ChatNotFound {
                id: chat_id.to_string(),
            })?;
        chat.push_message(Message::new(role, content));
        self.save(&chat).await?;
        Ok(chat)
    }

    async fn delete_chat(&self, id: &str) -> Result<()> {
        self.redis.delete(&chat_key(id)).await?;
        self.redis.zrem(CHAT_INDEX_KEY, id).await?;
        Ok(())
    }

    async fn rename_chat(&self, id: &str, title: &str) -> Result<ChatHistory> {
        let mut chat = self
            .get_chat(id)
            .await?
            .ok_or_else(|| WorkchatError::ChatNotFound { id: id.to_string() })?;
        chat.title = title.to_string();
        self.save(&chat).await?;
        Ok(chat)
    }
}
