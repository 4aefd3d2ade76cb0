use crate::corpus::{FragmentMetadata, SchemaFragment};
use crate::db::Db;
use crate::error::{AiblockError, Result};
use chrono::Utc;
use rusqlite::params;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

/// What the store currently holds for one fragment id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFragmentState {
    pub content_hash: String,
    pub embedding_model: Option<String>,
    pub has_embedding: bool,
}

impl StoredFragmentState {
    /// True when the stored vector was computed from `hash` by `model`
    pub fn is_current(&self, hash: &str, model: &str) -> bool {
        self.has_embedding
            && self.content_hash == hash
            && self.embedding_model.as_deref() == Some(model)
    }
}

/// Number of embedded fragments per stored embedding model
pub fn embedded_by_model(states: &HashMap<String, StoredFragmentState>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for state in states.values().filter(|s| s.has_embedding) {
        if let Some(model) = &state.embedding_model {
            *counts.entry(model.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// A fragment together with its freshly computed embedding
#[derive(Debug, Clone)]
pub struct FragmentRow {
    pub fragment: SchemaFragment,
    pub content_hash: String,
    pub embedding_model: String,
    pub embedding: Vec<f32>,
}

/// SHA-256 of the text that gets embedded
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert Vec<f32> to BLOB (raw bytes, little-endian)
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Parse an embedding BLOB; None if the length is not a multiple of 4
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    blob.chunks(4)
        .map(|bytes| {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(f32::from_le_bytes(arr))
        })
        .collect()
}

/// Hash and model of every stored fragment in a collection
pub async fn load_fragment_states(
    db: &Db,
    collection: &str,
) -> Result<HashMap<String, StoredFragmentState>> {
    let collection = collection.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT fragment_id, content_hash, embedding_model, embedding IS NOT NULL
             FROM fragments WHERE collection = ?1",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                StoredFragmentState {
                    content_hash: row.get(1)?,
                    embedding_model: row.get(2)?,
                    has_embedding: row.get(3)?,
                },
            ))
        })?;
        let mut states = HashMap::new();
        for row in rows {
            let (id, state) = row?;
            states.insert(id, state);
        }
        Ok(states)
    })
    .await
}

/// Insert or replace fragment rows with their embeddings in one transaction
pub async fn write_fragments(db: &Db, collection: &str, rows: Vec<FragmentRow>) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let collection = collection.to_string();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        let updated_at = Utc::now().to_rfc3339();
        let mut written = 0;

        for row in rows {
            let metadata_json = serde_json::to_string(&row.fragment.metadata)?;
            written += tx.execute(
                r#"
                INSERT INTO fragments (
                    collection, fragment_id, content, metadata_json,
                    content_hash, embedding_model, embedding, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(collection, fragment_id) DO UPDATE SET
                    content = excluded.content,
                    metadata_json = excluded.metadata_json,
                    content_hash = excluded.content_hash,
                    embedding_model = excluded.embedding_model,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
                params![
                    collection,
                    row.fragment.id,
                    row.fragment.content,
                    metadata_json,
                    row.content_hash,
                    row.embedding_model,
                    encode_embedding(&row.embedding),
                    updated_at
                ],
            )?;
        }

        tx.commit()?;
        Ok::<usize, AiblockError>(written)
    })
    .await
}

/// Delete fragments whose id is not in `keep`; returns how many were removed
pub async fn prune_fragments(db: &Db, collection: &str, keep: HashSet<String>) -> Result<usize> {
    let collection = collection.to_string();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        let stale: Vec<String> = {
            let mut stmt = tx.prepare("SELECT fragment_id FROM fragments WHERE collection = ?1")?;
            let ids = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
            let mut stale = Vec::new();
            for id in ids {
                let id = id?;
                if !keep.contains(&id) {
                    stale.push(id);
                }
            }
            stale
        };

        for id in &stale {
            tx.execute(
                "DELETE FROM fragments WHERE collection = ?1 AND fragment_id = ?2",
                params![collection, id],
            )?;
        }
        tx.commit()?;
        Ok(stale.len())
    })
    .await
}

/// Load every fragment embedded with `model`, ordered by id
pub async fn load_embedded_fragments(
    db: &Db,
    collection: &str,
    model: &str,
) -> Result<Vec<(SchemaFragment, Vec<f32>)>> {
    let collection = collection.to_string();
    let model = model.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT fragment_id, content, metadata_json, embedding
            FROM fragments
            WHERE collection = ?1 AND embedding_model = ?2 AND embedding IS NOT NULL
            ORDER BY fragment_id
            "#,
        )?;
        let mut rows = stmt.query(params![collection, model])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let content: String = row.get(1)?;
            let metadata_json: String = row.get(2)?;
            let blob: Vec<u8> = row.get(3)?;

            let embedding = match decode_embedding(&blob) {
                Some(e) if !e.is_empty() => e,
                _ => {
                    log::warn!("Skipping fragment {} with malformed embedding", id);
                    continue;
                }
            };
            let metadata: FragmentMetadata = serde_json::from_str(&metadata_json)?;
            out.push((SchemaFragment { id, content, metadata }, embedding));
        }
        Ok(out)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SchemaCorpus;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));
        db.migrate().await.unwrap();
        (db, temp_dir)
    }

    fn row(fragment: &SchemaFragment, model: &str, base: f32) -> FragmentRow {
        FragmentRow {
            fragment: fragment.clone(),
            content_hash: content_hash(&fragment.search_document()),
            embedding_model: model.to_string(),
            embedding: vec![base; 8],
        }
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let original: Vec<f32> = (0..1536).map(|i| i as f32 * 0.001).collect();
        let decoded = decode_embedding(&encode_embedding(&original)).unwrap();
        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decode_embedding_invalid_length() {
        assert!(decode_embedding(&[0u8, 1, 2, 3, 4]).is_none());
        assert_eq!(decode_embedding(&[]).unwrap().len(), 0);
    }

    #[test]
    fn test_content_hash_is_stable_hex() {
        let a = content_hash("transfers");
        assert_eq!(a, content_hash("transfers"));
        assert_ne!(a, content_hash("accounts"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_state_is_current() {
        let state = StoredFragmentState {
            content_hash: "abc".to_string(),
            embedding_model: Some("m1".to_string()),
            has_embedding: true,
        };
        assert!(state.is_current("abc", "m1"));
        assert!(!state.is_current("abc", "m2"));
        assert!(!state.is_current("def", "m1"));

        let missing = StoredFragmentState { has_embedding: false, ..state };
        assert!(!missing.is_current("abc", "m1"));
    }

    #[tokio::test]
    async fn test_write_and_load_fragments() {
        let (db, _temp_dir) = setup_test_db().await;
        let corpus = SchemaCorpus::kusama();
        let rows: Vec<FragmentRow> = corpus.fragments()[..3]
            .iter()
            .enumerate()
            .map(|(i, f)| row(f, "m1", i as f32 + 1.0))
            .collect();

        let written = write_fragments(&db, "test", rows).await.unwrap();
        assert_eq!(written, 3);

        let loaded = load_embedded_fragments(&db, "test", "m1").await.unwrap();
        assert_eq!(loaded.len(), 3);
        let (fragment, embedding) = loaded.iter().find(|(f, _)| f.id == "type-account").unwrap();
        assert_eq!(fragment, corpus.get("type-account").unwrap());
        assert_eq!(embedding.len(), 8);

        // Another model sees nothing
        assert!(load_embedded_fragments(&db, "test", "m2").await.unwrap().is_empty());
        // Another collection sees nothing
        assert!(load_embedded_fragments(&db, "other", "m1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_replaces_existing_row() {
        let (db, _temp_dir) = setup_test_db().await;
        let corpus = SchemaCorpus::kusama();
        let fragment = corpus.get("type-transfer").unwrap();

        write_fragments(&db, "test", vec![row(fragment, "m1", 0.1)]).await.unwrap();
        write_fragments(&db, "test", vec![row(fragment, "m2", 0.2)]).await.unwrap();

        let states = load_fragment_states(&db, "test").await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states["type-transfer"].embedding_model.as_deref(), Some("m2"));

        let loaded = load_embedded_fragments(&db, "test", "m2").await.unwrap();
        assert!((loaded[0].1[0] - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_embedded_by_model_counts_each_model() {
        let (db, _temp_dir) = setup_test_db().await;
        let corpus = SchemaCorpus::kusama();
        let fragments = corpus.fragments();
        let rows = vec![
            row(&fragments[0], "nomic-embed-text", 0.1),
            row(&fragments[1], "nomic-embed-text", 0.2),
            row(&fragments[2], "text-embedding-ada-002", 0.3),
        ];
        write_fragments(&db, "test", rows).await.unwrap();

        let states = load_fragment_states(&db, "test").await.unwrap();
        let counts = embedded_by_model(&states);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["nomic-embed-text"], 2);
        assert_eq!(counts["text-embedding-ada-002"], 1);
    }

    #[tokio::test]
    async fn test_write_empty_batch() {
        let (db, _temp_dir) = setup_test_db().await;
        assert_eq!(write_fragments(&db, "test", Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_removes_unknown_ids() {
        let (db, _temp_dir) = setup_test_db().await;
        let corpus = SchemaCorpus::kusama();
        let rows = corpus.fragments()[..4].iter().map(|f| row(f, "m1", 1.0)).collect();
        write_fragments(&db, "test", rows).await.unwrap();

        let keep: HashSet<String> = corpus.fragments()[..2].iter().map(|f| f.id.clone()).collect();
        let removed = prune_fragments(&db, "test", keep.clone()).await.unwrap();
        assert_eq!(removed, 2);

        let states = load_fragment_states(&db, "test").await.unwrap();
        assert_eq!(states.keys().cloned().collect::<HashSet<_>>(), keep);
    }
}
