use sqlx::SqliteConnection;

use super::SqliteStore;
use crate::error::MemoryError;
use crate::types::{ChunkId, Facet};

/// Encode a vector as little-endian `f32` bytes.
#[must_use]
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes. `None` if the length is not a multiple of 4.
#[must_use]
pub fn blob_to_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

fn decode(chunk_id: &ChunkId, blob: &[u8]) -> Result<Vec<f32>, MemoryError> {
    blob_to_vector(blob).ok_or_else(|| MemoryError::InvalidVector {
        chunk_id: chunk_id.to_string(),
        len: blob.len(),
    })
}

pub(super) async fn replace_embeddings(
    conn: &mut SqliteConnection,
    chunk_id: &ChunkId,
    facets: &[(Facet, Vec<f32>)],
    model_name: &str,
) -> Result<(), MemoryError> {
    sqlx::query("DELETE FROM embeddings WHERE chunk_id = ?")
        .bind(chunk_id)
        .execute(&mut *conn)
        .await?;

    for (facet, vector) in facets {
        sqlx::query(
            "INSERT INTO embeddings (chunk_id, facet, vector, dimensions, model_name) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(chunk_id)
        .bind(facet.as_str())
        .bind(vector_to_blob(vector))
        .bind(i64::try_from(vector.len())?)
        .bind(model_name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

impl SqliteStore {
    /// Replace all facet records of `chunk_id` with `facets`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk does not exist or any statement fails
    /// (previous records are kept on failure).
    pub async fn upsert_embeddings(
        &self,
        chunk_id: &ChunkId,
        facets: &[(Facet, Vec<f32>)],
        model_name: &str,
    ) -> Result<(), MemoryError> {
        let mut tx = self.pool.begin().await?;
        replace_embeddings(&mut tx, chunk_id, facets, model_name).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Every facet vector stored for `chunk_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a blob is malformed.
    pub async fn embeddings_for(
        &self,
        chunk_id: &ChunkId,
    ) -> Result<Vec<(Facet, Vec<f32>)>, MemoryError> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT facet, vector FROM embeddings WHERE chunk_id = ?")
                .bind(chunk_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(facet, blob)| {
                let facet = facet.parse::<Facet>().map_err(MemoryError::Other)?;
                Ok((facet, decode(chunk_id, &blob)?))
            })
            .collect()
    }

    /// `content` facet vectors of all chunks, in ascending chunk id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a blob is malformed.
    pub async fn content_vectors(&self) -> Result<Vec<(ChunkId, Vec<f32>)>, MemoryError> {
        let rows: Vec<(ChunkId, Vec<u8>)> = sqlx::query_as(
            "SELECT chunk_id, vector FROM embeddings WHERE facet = ? ORDER BY chunk_id ASC",
        )
        .bind(Facet::Content.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, blob)| {
                let vector = decode(&id, &blob)?;
                Ok((id, vector))
            })
            .collect()
    }

    /// Chunk ids holding a `content` vector, in the same order as
    /// [`SqliteStore::content_vectors`].
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn content_ids(&self) -> Result<Vec<ChunkId>, MemoryError> {
        let ids = sqlx::query_scalar(
            "SELECT chunk_id FROM embeddings WHERE facet = ? ORDER BY chunk_id ASC",
        )
        .bind(Facet::Content.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Number of stored vectors of one facet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_facet(&self, facet: Facet) -> Result<u64, MemoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings WHERE facet = ?")
            .bind(facet.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count)?)
    }
}
