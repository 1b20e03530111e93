// src/storage/local.rs

//! Local filesystem storage backend.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{DocumentRef, ParsedDocument, Partition};
use crate::storage::DocumentStorage;

/// Stores documents under a root directory, one subtree per partition.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Full path for a partition-relative key.
    fn path(&self, partition: &Partition, key: &str) -> PathBuf {
        self.root_dir.join(partition.key()).join(key)
    }

    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: PathBuf, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_gzipped(&self, path: PathBuf, bytes: &[u8]) -> Result<()> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes)?;
        let compressed = encoder.finish()?;
        self.write_bytes(path, &compressed).await
    }
}

#[async_trait]
impl DocumentStorage for LocalStorage {
    async fn save_document_data(
        &self,
        partition: &Partition,
        reference: &DocumentRef,
        document: &ParsedDocument,
    ) -> Result<()> {
        let record = serde_json::json!({
            "id": reference.id,
            "title": reference.title,
            "link": reference.url,
            "labels": reference.labels,
            "eurovoc_classifiers": document.eurovoc_classifiers,
            "full_text": document.full_text,
        });
        let bytes = serde_json::to_vec_pretty(&record)?;
        let path = self.path(partition, &format!("documents/{}.json", reference.id));
        self.write_bytes(path, &bytes).await
    }

    async fn save_document_html(
        &self,
        partition: &Partition,
        id: &str,
        body: &[u8],
    ) -> Result<()> {
        let path = self.path(partition, &format!("html/{id}.html.gz"));
        self.write_gzipped(path, body).await
    }

    async fn save_listing_html(
        &self,
        partition: &Partition,
        page_index: u32,
        body: &[u8],
    ) -> Result<()> {
        let path = self.path(partition, &format!("listing/{page_index}.html.gz"));
        self.write_gzipped(path, body).await
    }

    async fn list_completed_ids(&self, partition: &Partition) -> Result<HashSet<String>> {
        let dir = self.path(partition, "documents");
        let mut ids = HashSet::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(AppError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }

    async fn append_error_log(&self, language: &str, line: &str) -> Result<()> {
        let path = self.root_dir.join(language).join("errors.txt");
        self.ensure_dir(&path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
