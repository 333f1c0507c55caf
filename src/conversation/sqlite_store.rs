//! SQLite-backed conversation store.
//!
//! One row per conversation: the session is stored as JSON next to indexed
//! `created_at` / `updated_at` columns. Read-modify-write operations run in a
//! single `IMMEDIATE` transaction on the connection's worker thread.

use std::sync::Arc;

use rusqlite::{OptionalExtension, TransactionBehavior};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::conversation::clock::Clock;
use crate::conversation::errors::{ConversationError, ConversationResult};
use crate::conversation::ids::ConversationId;
use crate::conversation::store::{ConversationStore, StoreFuture};
use crate::conversation::types::{ConversationSession, MessageDraft, SessionPatch};

/// `SQLite` implementation of the conversation store.
pub struct SqliteConversationStore {
    conn: Connection,
    table: String,
    clock: Arc<dyn Clock>,
}

impl SqliteConversationStore {
    /// Table name for conversations.
    pub const DEFAULT_TABLE: &'static str = "conversations";

    /// Open the database configured in `config` and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(config: &StorageConfig, clock: Arc<dyn Clock>) -> ConversationResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        info!("Conversation store opened at {}", config.sqlite_path.display());
        Self::with_connection(conn, config.table.clone(), clock).await
    }

    /// Wrap an existing connection and create the table if needed.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn with_connection(
        conn: Connection,
        table: String,
        clock: Arc<dyn Clock>,
    ) -> ConversationResult<Self> {
        let table_name = table.clone();
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    session TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_updated
                    ON {table_name} (updated_at DESC);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table, clock })
    }
}

fn encode(session: &ConversationSession) -> tokio_rusqlite::Result<String> {
    serde_json::to_string(session).map_err(|err| tokio_rusqlite::Error::Other(Box::new(err)))
}

fn decode(raw: &str) -> tokio_rusqlite::Result<ConversationSession> {
    serde_json::from_str(raw).map_err(|err| tokio_rusqlite::Error::Other(Box::new(err)))
}

fn load(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    id: &str,
) -> tokio_rusqlite::Result<Option<ConversationSession>> {
    let raw: Option<String> = tx
        .query_row(
            &format!("SELECT session FROM {table} WHERE id = ?1"),
            rusqlite::params![id],
            |row| row.get(0),
        )
        .optional()?;
    raw.as_deref().map(decode).transpose()
}

fn save(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    session: &ConversationSession,
) -> tokio_rusqlite::Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO {table} (id, created_at, updated_at, session)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                updated_at = excluded.updated_at,
                session = excluded.session"
        ),
        rusqlite::params![
            session.id.as_str(),
            session.created_at,
            session.updated_at,
            encode(session)?
        ],
    )?;
    Ok(())
}

impl ConversationStore for SqliteConversationStore {
    fn get_or_create(
        &self,
        id: ConversationId,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let table = self.table.clone();
            let clock = Arc::clone(&self.clock);
            let session = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                    let session = match load(&tx, &table, id.as_str())? {
                        Some(existing) => existing,
                        None => {
                            let created = ConversationSession::new(id, clock.now_ms());
                            save(&tx, &table, &created)?;
                            created
                        }
                    };
                    tx.commit()?;
                    Ok(session)
                })
                .await?;
            Ok(session)
        })
    }

    fn append(
        &self,
        id: ConversationId,
        draft: MessageDraft,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let table = self.table.clone();
            let clock = Arc::clone(&self.clock);
            let session = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                    let now = clock.now_ms();
                    let mut session = load(&tx, &table, id.as_str())?
                        .unwrap_or_else(|| ConversationSession::new(id, now));
                    session.push_message(draft, now);
                    save(&tx, &table, &session)?;
                    tx.commit()?;
                    Ok(session)
                })
                .await?;
            debug!(
                "Appended message to {} ({} messages)",
                session.id,
                session.messages.len()
            );
            Ok(session)
        })
    }

    fn patch(
        &self,
        id: ConversationId,
        patch: SessionPatch,
    ) -> StoreFuture<'_, ConversationResult<ConversationSession>> {
        Box::pin(async move {
            let table = self.table.clone();
            let clock = Arc::clone(&self.clock);
            let missing = id.to_string();
            let session = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                    let Some(mut session) = load(&tx, &table, id.as_str())? else {
                        return Ok(None);
                    };
                    session.apply_patch(patch, clock.now_ms());
                    save(&tx, &table, &session)?;
                    tx.commit()?;
                    Ok(Some(session))
                })
                .await?;
            session.ok_or(ConversationError::NotFound(missing))
        })
    }

    fn remove(&self, id: ConversationId) -> StoreFuture<'_, ConversationResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE id = ?1"),
                        rusqlite::params![id.as_str()],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn list(&self) -> StoreFuture<'_, ConversationResult<Vec<ConversationSession>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let sessions: Vec<ConversationSession> = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT session FROM {table} ORDER BY updated_at DESC, id ASC"
                    ))?;
                    let rows = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    rows.iter().map(|raw| decode(raw)).collect()
                })
                .await?;
            Ok(sessions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::clock::ManualClock;
    use crate::conversation::store::contract;

    async fn fixture() -> ConversationResult<(SqliteConversationStore, Arc<ManualClock>)> {
        let clock = Arc::new(ManualClock::new(1_000));
        let conn = Connection::open_in_memory().await?;
        let store = SqliteConversationStore::with_connection(
            conn,
            SqliteConversationStore::DEFAULT_TABLE.to_string(),
            clock.clone(),
        )
        .await?;
        Ok((store, clock))
    }

    #[tokio::test]
    async fn appends_preserve_call_order() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::appends_preserve_call_order(&store, &clock).await
    }

    #[tokio::test]
    async fn append_creates_missing_session() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::append_creates_missing_session(&store, &clock).await
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::get_or_create_is_idempotent(&store, &clock).await
    }

    #[tokio::test]
    async fn patch_requires_existing_session() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::patch_requires_existing_session(&store, &clock).await
    }

    #[tokio::test]
    async fn patch_refreshes_updated_at_only() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::patch_refreshes_updated_at_only(&store, &clock).await
    }

    #[tokio::test]
    async fn remove_then_recreate_starts_fresh() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::remove_then_recreate_starts_fresh(&store, &clock).await
    }

    #[tokio::test]
    async fn list_orders_by_recency() -> ConversationResult<()> {
        let (store, clock) = fixture().await?;
        contract::list_orders_by_recency(&store, &clock).await
    }

    #[tokio::test]
    async fn stored_row_holds_session_json() -> ConversationResult<()> {
        let (store, _clock) = fixture().await?;
        let id = ConversationId::parse("raw")?;
        store.append(id, MessageDraft::user("persist me")).await?;

        let raw: String = store
            .conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT session FROM conversations WHERE id = 'raw'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["messages"][0]["content"], "persist me");
        assert_eq!(value["createdAt"], 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn missing_table_is_storage_unavailable() -> ConversationResult<()> {
        let (store, _clock) = fixture().await?;
        store
            .conn
            .call(|conn| {
                conn.execute_batch("DROP TABLE conversations")?;
                Ok(())
            })
            .await?;
        let id = ConversationId::parse("c1")?;

        assert!(matches!(
            store.get_or_create(id.clone()).await,
            Err(ConversationError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.append(id, MessageDraft::user("hi")).await,
            Err(ConversationError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.list().await,
            Err(ConversationError::StorageUnavailable(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_row_is_storage_unavailable() -> ConversationResult<()> {
        let (store, _clock) = fixture().await?;
        store
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO conversations (id, created_at, updated_at, session)
                     VALUES ('bad', 1, 1, 'not json')",
                    [],
                )?;
                Ok(())
            })
            .await?;

        let result = store.get_or_create(ConversationId::parse("bad")?).await;
        assert!(matches!(result, Err(ConversationError::StorageUnavailable(_))));
        Ok(())
    }
}
