pub mod memory;
pub mod qdrant;

mod error;

pub use error::Error;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::{collections::HashSet, sync::Arc};

use rag_domain::{Chunk, DocumentBatch, Namespace};
use rag_providers::Embedder;

/// Largest id group sent in one existence probe.
pub const EXISTENCE_PROBE_BATCH: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpsertReport {
	/// Chunks in the incoming batch, duplicates included.
	pub requested: usize,
	/// Distinct ids already present in the namespace.
	pub skipped_existing: usize,
	/// Distinct ids embedded and written by this call.
	pub written: usize,
}

/// Chunk vectors partitioned by namespace.
///
/// Every variant upserts idempotently: ids already stored in the namespace are never re-embedded
/// or overwritten.
pub enum VectorStore {
	Qdrant(QdrantStore),
	Memory(MemoryStore),
}
impl VectorStore {
	pub async fn from_config(cfg: &rag_config::Config, embedder: Arc<Embedder>) -> Result<Self> {
		match cfg.storage.backend.as_str() {
			"qdrant" => {
				let qdrant = cfg.storage.qdrant.as_ref().ok_or_else(|| Error::StoreConfig {
					message: "storage.qdrant is required for the qdrant backend.".to_string(),
				})?;
				let store = QdrantStore::connect(qdrant, embedder).await?;

				Ok(Self::Qdrant(store))
			},
			"memory" => {
				let store = MemoryStore::new(cfg.providers.embedding.dimensions, embedder)?;

				Ok(Self::Memory(store))
			},
			other =>
				Err(Error::StoreConfig { message: format!("Unknown storage backend {other}.") }),
		}
	}

	pub fn backend(&self) -> &'static str {
		match self {
			Self::Qdrant(_) => "qdrant",
			Self::Memory(_) => "memory",
		}
	}

	fn embedder(&self) -> &Embedder {
		match self {
			Self::Qdrant(store) => store.embedder(),
			Self::Memory(store) => store.embedder(),
		}
	}

	pub async fn upsert(
		&self,
		batch: &DocumentBatch,
		namespace: &Namespace,
	) -> Result<UpsertReport> {
		let mut seen = HashSet::new();
		let unique: Vec<&Chunk> =
			batch.chunks.iter().filter(|chunk| seen.insert(chunk.id.as_str())).collect();
		let ids: Vec<String> = unique.iter().map(|chunk| chunk.id.clone()).collect();
		let mut existing = HashSet::new();

		for group in ids.chunks(EXISTENCE_PROBE_BATCH) {
			existing.extend(self.existing_ids(group, namespace).await?);
		}

		let fresh: Vec<Chunk> =
			unique.into_iter().filter(|chunk| !existing.contains(&chunk.id)).cloned().collect();
		let report = UpsertReport {
			requested: batch.len(),
			skipped_existing: ids.len() - fresh.len(),
			written: fresh.len(),
		};

		if fresh.is_empty() {
			tracing::info!(
				namespace = %namespace,
				source = %batch.source,
				requested = report.requested,
				"No new chunks to write."
			);

			return Ok(report);
		}

		let texts: Vec<String> = fresh.iter().map(|chunk| chunk.text.clone()).collect();
		let vectors = self.embedder().embed(&texts).await?;

		match self {
			Self::Qdrant(store) => store.write(fresh, vectors, namespace).await?,
			Self::Memory(store) => store.write(fresh, vectors, namespace).await?,
		}

		tracing::info!(
			namespace = %namespace,
			source = %batch.source,
			written = report.written,
			skipped = report.skipped_existing,
			"Upserted chunks."
		);

		Ok(report)
	}

	/// Embeds `text` and returns up to `k` chunks of `namespace` by descending similarity.
	pub async fn query(&self, text: &str, namespace: &Namespace, k: usize) -> Result<Vec<Chunk>> {
		if k == 0 {
			return Ok(Vec::new());
		}

		let vector = self.embedder().embed_one(text).await?;

		self.query_vector(&vector, namespace, k).await
	}

	pub async fn query_vector(
		&self,
		vector: &[f32],
		namespace: &Namespace,
		k: usize,
	) -> Result<Vec<Chunk>> {
		if k == 0 {
			return Ok(Vec::new());
		}

		check_dimension(vector, self.embedder().dimensions())?;

		match self {
			Self::Qdrant(store) => store.search(vector, namespace, k).await,
			Self::Memory(store) => Ok(store.search(vector, namespace, k).await),
		}
	}

	/// Removes `ids` from `namespace`. Unknown ids are ignored.
	pub async fn delete(&self, ids: &[String], namespace: &Namespace) -> Result<()> {
		if ids.is_empty() {
			return Ok(());
		}

		match self {
			Self::Qdrant(store) => store.remove(ids, namespace).await?,
			Self::Memory(store) => store.remove(ids, namespace).await,
		}

		tracing::info!(namespace = %namespace, count = ids.len(), "Deleted chunks.");

		Ok(())
	}

	async fn existing_ids(&self, ids: &[String], namespace: &Namespace) -> Result<Vec<String>> {
		match self {
			Self::Qdrant(store) => store.existing_ids(ids, namespace).await,
			Self::Memory(store) => Ok(store.existing_ids(ids, namespace).await),
		}
	}
}

pub(crate) fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
	if vector.len() != expected {
		return Err(Error::InvalidArgument(format!(
			"Vector dimension {} does not match store dimension {expected}.",
			vector.len()
		)));
	}

	Ok(())
}

pub(crate) fn check_embedder(embedder: &Embedder, vector_dim: u32) -> Result<()> {
	if embedder.dimensions() != vector_dim as usize {
		return Err(Error::StoreConfig {
			message: format!(
				"Embedder dimension {} does not match store dimension {vector_dim}.",
				embedder.dimensions()
			),
		});
	}

	Ok(())
}
