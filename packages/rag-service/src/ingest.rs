use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use serde::Serialize;

use crate::{Error, ExtractorRegistry, Result};
use rag_chunking::Chunker;
use rag_domain::Namespace;
use rag_storage::VectorStore;

/// Outcome of ingesting one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestReport {
	pub source: String,
	pub chunks: usize,
	pub written: usize,
	pub skipped: usize,
}

/// One file to ingest: its name drives format dispatch and becomes the chunk source.
#[derive(Clone, Debug)]
pub struct IngestItem {
	pub filename: String,
	pub data: Vec<u8>,
}

pub struct Ingestor {
	registry: ExtractorRegistry,
	chunker: Chunker,
	store: Arc<VectorStore>,
}
impl Ingestor {
	pub fn new(registry: ExtractorRegistry, chunker: Chunker, store: Arc<VectorStore>) -> Self {
		Self { registry, chunker, store }
	}

	pub async fn ingest_bytes(
		&self,
		data: &[u8],
		filename: &str,
		namespace: &Namespace,
	) -> Result<IngestReport> {
		let text = self.registry.extract(data, filename)?;
		let batch = self.chunker.chunk(&text, filename)?;
		let upsert = self.store.upsert(&batch, namespace).await?;

		Ok(IngestReport {
			source: filename.to_string(),
			chunks: batch.len(),
			written: upsert.written,
			skipped: upsert.skipped_existing,
		})
	}

	/// Ingests every item in order. A failing item is logged and recorded, and the rest still run.
	pub async fn ingest_many(
		&self,
		items: Vec<IngestItem>,
		namespace: &Namespace,
	) -> Vec<(String, Result<IngestReport>)> {
		let mut outcomes = Vec::with_capacity(items.len());

		for item in items {
			let result = self.ingest_bytes(&item.data, &item.filename, namespace).await;

			outcomes.push(record(item.filename, result, namespace));
		}

		outcomes
	}

	/// Reads and ingests each file in order. An unreadable path fails only its own item.
	pub async fn ingest_paths(
		&self,
		paths: &[PathBuf],
		namespace: &Namespace,
	) -> Vec<(String, Result<IngestReport>)> {
		let mut outcomes = Vec::with_capacity(paths.len());

		for path in paths {
			let filename = file_name(path);
			let result = match tokio::fs::read(path).await {
				Ok(data) => self.ingest_bytes(&data, &filename, namespace).await,
				Err(err) => Err(Error::Extraction {
					file: path.display().to_string(),
					message: err.to_string(),
				}),
			};

			outcomes.push(record(filename, result, namespace));
		}

		outcomes
	}

	pub async fn delete(&self, ids: &[String], namespace: &Namespace) -> Result<()> {
		self.store.delete(ids, namespace).await?;

		Ok(())
	}
}

fn record(
	filename: String,
	result: Result<IngestReport>,
	namespace: &Namespace,
) -> (String, Result<IngestReport>) {
	if let Err(err) = &result {
		tracing::error!(
			namespace = %namespace,
			source = %filename,
			error = %err,
			"Failed to ingest file."
		);
	}

	(filename, result)
}

/// The bare file name, used as the chunk source.
pub fn file_name(path: &Path) -> String {
	path.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}
