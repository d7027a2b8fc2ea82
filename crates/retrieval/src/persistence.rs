//! Disk cache for the index generation
//!
//! Three files (BM25 tables, TF-IDF vectorizer + matrix, corpus metadata)
//! written as one logical generation. Each file is written to a temp file in
//! the cache directory and atomically renamed, so readers only ever observe
//! complete files. On load, a missing file, a deserialization error, or a
//! document-count mismatch discards the whole set.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use sherlock_config::constants::cache::{BM25_FILE, METADATA_FILE, TFIDF_FILE};
use sherlock_core::Incident;

use crate::bm25::Bm25Index;
use crate::tfidf::TfidfIndex;
use crate::RetrievalError;

fn write_atomic<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<(), RetrievalError> {
    let temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(temp.as_file(), value)?;
    temp.persist(dir.join(file))
        .map_err(|e| RetrievalError::Persistence(e.to_string()))?;
    Ok(())
}

fn read_file<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, RetrievalError> {
    let bytes = std::fs::read(dir.join(file))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Persist one generation; partially written files never become visible.
pub(crate) fn save_generation(
    dir: &Path,
    bm25: &Bm25Index,
    tfidf: &TfidfIndex,
    incidents: &[Incident],
) -> Result<(), RetrievalError> {
    std::fs::create_dir_all(dir)?;
    write_atomic(dir, BM25_FILE, bm25)?;
    write_atomic(dir, TFIDF_FILE, tfidf)?;
    write_atomic(dir, METADATA_FILE, &incidents)?;
    tracing::info!(
        dir = %dir.display(),
        corpus_size = incidents.len(),
        "Index cache generation persisted"
    );
    Ok(())
}

/// Load a generation if all three files are present and consistent.
pub(crate) fn load_generation(dir: &Path) -> Option<(Bm25Index, TfidfIndex, Vec<Incident>)> {
    for file in [BM25_FILE, TFIDF_FILE, METADATA_FILE] {
        if !dir.join(file).exists() {
            tracing::debug!(file, "Index cache file missing, starting without indices");
            return None;
        }
    }

    let bm25: Bm25Index = match read_file(dir, BM25_FILE) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding index cache: BM25 file unreadable");
            return None;
        }
    };
    let tfidf: TfidfIndex = match read_file(dir, TFIDF_FILE) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding index cache: TF-IDF file unreadable");
            return None;
        }
    };
    let incidents: Vec<Incident> = match read_file(dir, METADATA_FILE) {
        Ok(incidents) => incidents,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding index cache: metadata file unreadable");
            return None;
        }
    };

    if bm25.doc_count() != incidents.len() || tfidf.doc_count() != incidents.len() {
        tracing::warn!(
            bm25_docs = bm25.doc_count(),
            tfidf_docs = tfidf.doc_count(),
            metadata_docs = incidents.len(),
            "Discarding index cache: generation files disagree on document count"
        );
        return None;
    }

    Some((bm25, tfidf, incidents))
}

/// Which cache files currently exist on disk
pub(crate) fn cache_files_exist(dir: &Path) -> (bool, bool, bool) {
    (
        dir.join(BM25_FILE).exists(),
        dir.join(TFIDF_FILE).exists(),
        dir.join(METADATA_FILE).exists(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sherlock_text_processing::tokenize;

    fn incident(id: &str, title: &str) -> Incident {
        Incident {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            resolution: String::new(),
            tags: vec![],
            created_at: String::new(),
            resolved_by: String::new(),
            error_patterns: None,
        }
    }

    fn build(incidents: &[Incident]) -> (Bm25Index, TfidfIndex) {
        let texts: Vec<String> = incidents.iter().map(|i| i.searchable_text()).collect();
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
        (Bm25Index::build(&tokenized), TfidfIndex::build(&texts))
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let incidents = vec![
            incident("JSP-1", "UPI payment failed"),
            incident("JSP-2", "Webhook signature mismatch"),
        ];
        let (bm25, tfidf) = build(&incidents);

        save_generation(dir.path(), &bm25, &tfidf, &incidents).unwrap();
        let (loaded_bm25, loaded_tfidf, loaded) = load_generation(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded_bm25.doc_count(), 2);
        assert_eq!(loaded_tfidf.doc_count(), 2);
        assert_eq!(loaded[0].id, "JSP-1");
    }

    #[test]
    fn test_missing_file_discards_generation() {
        let dir = tempfile::tempdir().unwrap();
        let incidents = vec![incident("JSP-1", "UPI payment failed")];
        let (bm25, tfidf) = build(&incidents);
        save_generation(dir.path(), &bm25, &tfidf, &incidents).unwrap();

        std::fs::remove_file(dir.path().join(TFIDF_FILE)).unwrap();
        assert!(load_generation(dir.path()).is_none());
    }

    #[test]
    fn test_corrupt_file_discards_generation() {
        let dir = tempfile::tempdir().unwrap();
        let incidents = vec![incident("JSP-1", "UPI payment failed")];
        let (bm25, tfidf) = build(&incidents);
        save_generation(dir.path(), &bm25, &tfidf, &incidents).unwrap();

        std::fs::write(dir.path().join(BM25_FILE), b"not json").unwrap();
        assert!(load_generation(dir.path()).is_none());
    }

    #[test]
    fn test_count_mismatch_discards_generation() {
        let dir = tempfile::tempdir().unwrap();
        let one = vec![incident("JSP-1", "UPI payment failed")];
        let two = vec![
            incident("JSP-1", "UPI payment failed"),
            incident("JSP-2", "Webhook signature mismatch"),
        ];
        let (bm25, tfidf) = build(&one);
        save_generation(dir.path(), &bm25, &tfidf, &two).unwrap();
        assert!(load_generation(dir.path()).is_none());
    }
}
