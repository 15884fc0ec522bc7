//! SQLite-backed chunk index.
//!
//! The file is produced by the ingestion side (schema below). Searches load
//! rows on a blocking thread and score them in process.

use crate::types::{IndexStats, KnowledgeChunk, KnowledgeSource, ScoredChunk};
use crate::vector_index::{rank_by_similarity, ChunkIndex};
use docask_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    path TEXT,
    url TEXT,
    content_type TEXT NOT NULL,
    learned_at TEXT NOT NULL,
    size_bytes INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT,
    FOREIGN KEY (source_id) REFERENCES sources(id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
"#;

/// Chunk index stored in a SQLite file.
#[derive(Clone)]
pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex").field("path", &self.path).finish()
    }
}

impl SqliteIndex {
    /// Open an existing index read-only.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::Knowledge(format!(
                "No index at {:?}. Ingest documents before asking questions.",
                db_path
            )));
        }

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: db_path.to_path_buf(),
        })
    }

    /// Create (or open for writing) an index file with the expected schema.
    pub fn create(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized SQLite index at {:?}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a source.
    pub fn insert_source(&self, source: &KnowledgeSource) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sources (id, path, url, content_type, learned_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                source.id,
                source.path,
                source.url,
                source.content_type,
                source.learned_at,
                source.size_bytes as i64,
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;
        Ok(())
    }

    /// Insert or replace a chunk. The chunk must carry an embedding.
    pub fn insert_chunk(&self, chunk: &KnowledgeChunk) -> AppResult<()> {
        let embedding = chunk
            .embedding
            .as_deref()
            .ok_or_else(|| AppError::Knowledge(format!("Chunk '{}' missing embedding", chunk.id)))?;

        let metadata_json = serde_json::to_string(&chunk.metadata)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.id,
                chunk.source_id,
                chunk.position as i64,
                chunk.text,
                embedding_to_bytes(embedding),
                metadata_json,
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("SQLite connection lock poisoned".to_string()))
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Knowledge("SQLite connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Index task failed: {}", e)))?
    }
}

fn load_chunks(conn: &Connection, with_embeddings: bool) -> AppResult<Vec<KnowledgeChunk>> {
    let mut stmt = conn
        .prepare("SELECT id, source_id, position, text, embedding, metadata FROM chunks")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| read_chunk(row, with_embeddings))
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut chunks = Vec::new();
    for row in rows {
        match row {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => tracing::warn!("Skipping unreadable chunk row: {}", e),
        }
    }
    Ok(chunks)
}

fn read_chunk(row: &Row<'_>, with_embedding: bool) -> rusqlite::Result<KnowledgeChunk> {
    let embedding = if with_embedding {
        let bytes: Vec<u8> = row.get(4)?;
        Some(bytes_to_embedding(&bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Blob, Box::new(e))
        })?)
    } else {
        None
    };

    let metadata = row
        .get::<_, Option<String>>(5)?
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    Ok(KnowledgeChunk {
        id: row.get(0)?,
        source_id: row.get(1)?,
        position: row.get::<_, i64>(2)? as u32,
        text: row.get(3)?,
        embedding,
        metadata,
    })
}

#[async_trait::async_trait]
impl ChunkIndex for SqliteIndex {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let query = query_embedding.to_vec();
        let results = self
            .with_conn(move |conn| {
                let chunks = load_chunks(conn, true)?;
                Ok(rank_by_similarity(chunks, &query, top_k))
            })
            .await?;

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );
        Ok(results)
    }

    async fn all_chunks(&self) -> AppResult<Vec<KnowledgeChunk>> {
        self.with_conn(|conn| load_chunks(conn, false)).await
    }

    async fn sources(&self, ids: &[String]) -> AppResult<HashMap<String, KnowledgeSource>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, path, url, content_type, learned_at, size_bytes
                     FROM sources WHERE id = ?1",
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

            let mut found = HashMap::new();
            for id in ids {
                let mut rows = stmt
                    .query_map([&id], |row| {
                        Ok(KnowledgeSource {
                            id: row.get(0)?,
                            path: row.get(1)?,
                            url: row.get(2)?,
                            content_type: row.get(3)?,
                            learned_at: row.get(4)?,
                            size_bytes: row.get::<_, i64>(5)?.max(0) as u64,
                        })
                    })
                    .map_err(|e| AppError::Knowledge(format!("Failed to query sources: {}", e)))?;

                if let Some(Ok(source)) = rows.next() {
                    found.insert(source.id.clone(), source);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        self.with_conn(|conn| {
            let count = |table: &str| -> AppResult<u32> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get::<_, i64>(0).map(|v| v as u32)
                })
                .map_err(|e| AppError::Knowledge(format!("Failed to count {}: {}", table, e)))
            };

            Ok(IndexStats {
                sources_count: count("sources")?,
                chunks_count: count("chunks")?,
            })
        })
        .await
    }
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
