use chrono::{DateTime, Utc};
use rusqlite::params;

use celeste_shared::constants::{CHAT_TITLE_MAX_CHARS, DEFAULT_CHAT_TITLE};
use celeste_shared::{ChatMessage, Role};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Chat, ChatSummary};

/// Title for a new chat: the first 30 characters of the first user message
/// followed by `"..."`, or `"New Chat"` when nobody has spoken yet.
pub fn derive_title(history: &[ChatMessage]) -> String {
    match history.iter().find(|msg| msg.role == Role::User) {
        Some(msg) => {
            let mut title: String = msg.content.chars().take(CHAT_TITLE_MAX_CHARS).collect();
            title.push_str("...");
            title
        }
        None => DEFAULT_CHAT_TITLE.to_string(),
    }
}

impl Database {
    pub fn add_chat(&self, history: &[ChatMessage]) -> Result<ChatSummary> {
        let title = derive_title(history);
        let history_json = serde_json::to_string(history)?;

        self.conn().execute(
            "INSERT INTO chats (title, history, created_at) VALUES (?1, ?2, ?3)",
            params![title, history_json, Utc::now().to_rfc3339()],
        )?;
        let id = self.conn().last_insert_rowid();

        tracing::debug!(id, messages = history.len(), "chat added");
        Ok(ChatSummary { id, title })
    }

    // Only history is written; title and created_at keep their original values.
    pub fn update_chat(&self, id: i64, history: &[ChatMessage]) -> Result<()> {
        let history_json = serde_json::to_string(history)?;
        let affected = self.conn().execute(
            "UPDATE chats SET history = ?1 WHERE id = ?2",
            params![history_json, id],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(id, messages = history.len(), "chat updated");
        Ok(())
    }

    /// All chats as `{id, title}`, newest first. Histories are not loaded.
    pub fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, title FROM chats ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ChatSummary {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn get_chat_history(&self, id: i64) -> Result<Vec<ChatMessage>> {
        let history_json: String = self
            .conn()
            .query_row(
                "SELECT history FROM chats WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(not_found)?;
        Ok(serde_json::from_str(&history_json)?)
    }

    pub fn get_chat(&self, id: i64) -> Result<Chat> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, title, history, created_at FROM chats WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(not_found)?;
        row_to_chat(row)
    }

    /// Returns whether a chat was removed. Deleting an unknown id is not an error.
    pub fn delete_chat(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM chats WHERE id = ?1", params![id])?;
        tracing::debug!(id, deleted = affected > 0, "chat delete");
        Ok(affected > 0)
    }
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

fn row_to_chat(
    (id, title, history_json, created_str): (i64, String, String, String),
) -> Result<Chat> {
    let history: Vec<ChatMessage> = serde_json::from_str(&history_json)?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc);

    Ok(Chat {
        id,
        title,
        history,
        created_at,
    })
}
