use sqlx::SqliteConnection;

use super::SqliteStore;
use super::embeddings::replace_embeddings;
use crate::error::MemoryError;
use crate::types::{Chunk, ChunkId, ChunkRecord, EmbeddedChunk};

type ChunkRow = (
    ChunkId,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    i64,
    i64,
    String,
);

const SELECT_CHUNK: &str = "SELECT id, source_file, source_url, title, content, functions, \
     concepts, code_examples, difficulty, content_type, chunk_index, chunk_size, created_at \
     FROM chunks";

fn row_to_record(row: ChunkRow) -> Result<ChunkRecord, MemoryError> {
    let (
        id,
        source_file,
        source_url,
        title,
        content,
        functions,
        concepts,
        code_examples,
        difficulty,
        content_type,
        chunk_index,
        chunk_size,
        created_at,
    ) = row;

    Ok(ChunkRecord {
        chunk: Chunk {
            id,
            source_file,
            source_url,
            title,
            content,
            functions: serde_json::from_str(&functions)?,
            concepts: serde_json::from_str(&concepts)?,
            code_examples: serde_json::from_str(&code_examples)?,
            difficulty: difficulty.parse().unwrap_or_default(),
            content_type: content_type.parse().unwrap_or_default(),
            chunk_index: usize::try_from(chunk_index)?,
        },
        chunk_size: usize::try_from(chunk_size)?,
        created_at,
    })
}

pub(super) async fn insert_chunk(
    conn: &mut SqliteConnection,
    chunk: &Chunk,
) -> Result<(), MemoryError> {
    sqlx::query(
        "INSERT INTO chunks \
         (id, source_file, source_url, title, content, functions, concepts, code_examples, \
          difficulty, content_type, chunk_index, chunk_size) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
          source_file = excluded.source_file, \
          source_url = excluded.source_url, \
          title = excluded.title, \
          content = excluded.content, \
          functions = excluded.functions, \
          concepts = excluded.concepts, \
          code_examples = excluded.code_examples, \
          difficulty = excluded.difficulty, \
          content_type = excluded.content_type, \
          chunk_index = excluded.chunk_index, \
          chunk_size = excluded.chunk_size",
    )
    .bind(&chunk.id)
    .bind(&chunk.source_file)
    .bind(&chunk.source_url)
    .bind(&chunk.title)
    .bind(&chunk.content)
    .bind(serde_json::to_string(&chunk.functions)?)
    .bind(serde_json::to_string(&chunk.concepts)?)
    .bind(serde_json::to_string(&chunk.code_examples)?)
    .bind(chunk.difficulty.as_str())
    .bind(chunk.content_type.as_str())
    .bind(i64::try_from(chunk.chunk_index)?)
    .bind(i64::try_from(chunk.size())?)
    .execute(conn)
    .await?;
    Ok(())
}

impl SqliteStore {
    /// Insert a chunk, or overwrite the row with the same fingerprint.
    /// Existing embedding records for the chunk are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), MemoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_chunk(&mut conn, chunk).await
    }

    /// Upsert every chunk in `items` and replace its facet vectors, all in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails (whole batch is rolled back).
    pub async fn commit_batch(
        &self,
        items: &[EmbeddedChunk],
        model_name: &str,
    ) -> Result<(), MemoryError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            insert_chunk(&mut tx, &item.chunk).await?;
            if !item.facets.is_empty() {
                replace_embeddings(&mut tx, &item.chunk.id, &item.facets, model_name).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn get_chunk(&self, id: &ChunkId) -> Result<Option<ChunkRecord>, MemoryError> {
        let row: Option<ChunkRow> = sqlx::query_as(&format!("{SELECT_CHUNK} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_record).transpose()
    }

    /// Fingerprints of every stored chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fingerprints(&self) -> Result<Vec<ChunkId>, MemoryError> {
        let ids: Vec<ChunkId> = sqlx::query_scalar("SELECT id FROM chunks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// All chunks produced from `source_file`, in chunk order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn chunks_for_file(&self, source_file: &str) -> Result<Vec<ChunkRecord>, MemoryError> {
        let rows: Vec<ChunkRow> = sqlx::query_as(&format!(
            "{SELECT_CHUNK} WHERE source_file = ? ORDER BY chunk_index ASC, id ASC"
        ))
        .bind(source_file)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fingerprint;
    use crate::types::{ContentType, Difficulty, Facet};

    async fn test_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    fn chunk(content: &str) -> Chunk {
        Chunk {
            id: fingerprint(content),
            source_file: "kb.json".into(),
            source_url: "https://example.org".into(),
            title: "Intro".into(),
            content: content.into(),
            functions: vec!["sound".into()],
            concepts: vec!["sampling".into()],
            code_examples: vec!["sound(\"bd\")".into()],
            difficulty: Difficulty::Beginner,
            content_type: ContentType::Text,
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_chunk() {
        let store = test_store().await;
        let c = chunk("hello world");
        store.upsert_chunk(&c).await.unwrap();

        let record = store.get_chunk(&c.id).await.unwrap().unwrap();
        assert_eq!(record.chunk, c);
        assert_eq!(record.chunk_size, 11);
        assert!(!record.created_at.is_empty());
    }

    #[tokio::test]
    async fn upsert_same_fingerprint_keeps_one_row() {
        let store = test_store().await;
        let mut c = chunk("hello world");
        store.upsert_chunk(&c).await.unwrap();
        c.title = "Renamed".into();
        store.upsert_chunk(&c).await.unwrap();

        assert_eq!(store.fingerprints().await.unwrap().len(), 1);
        let record = store.get_chunk(&c.id).await.unwrap().unwrap();
        assert_eq!(record.chunk.title, "Renamed");
    }

    #[tokio::test]
    async fn upsert_keeps_existing_embeddings() {
        let store = test_store().await;
        let c = chunk("hello world");
        store
            .commit_batch(
                &[EmbeddedChunk {
                    chunk: c.clone(),
                    facets: vec![(Facet::Content, vec![1.0, 0.0])],
                }],
                "m",
            )
            .await
            .unwrap();
        store.upsert_chunk(&c).await.unwrap();

        assert_eq!(store.embeddings_for(&c.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_chunk() {
        let store = test_store().await;
        let missing = ChunkId("nope".into());
        assert!(store.get_chunk(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_batch_writes_chunks_and_facets() {
        let store = test_store().await;
        let items = vec![
            EmbeddedChunk {
                chunk: chunk("first chunk"),
                facets: vec![
                    (Facet::Content, vec![1.0, 0.0]),
                    (Facet::Code, vec![0.0, 1.0]),
                ],
            },
            EmbeddedChunk {
                chunk: chunk("second chunk"),
                facets: Vec::new(),
            },
        ];
        store.commit_batch(&items, "mock-embed").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_embeddings, 2);
    }

    #[tokio::test]
    async fn chunks_for_file_in_order() {
        let store = test_store().await;
        let mut a = chunk("alpha");
        a.chunk_index = 1;
        let mut b = chunk("beta");
        b.chunk_index = 0;
        store.upsert_chunk(&a).await.unwrap();
        store.upsert_chunk(&b).await.unwrap();

        let rows = store.chunks_for_file("kb.json").await.unwrap();
        let contents: Vec<&str> = rows.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["beta", "alpha"]);
    }
}
