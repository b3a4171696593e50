use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};

use tokio::sync::RwLock;

use crate::{Error, Result};
use rag_domain::{Chunk, Namespace};
use rag_providers::{Embedder, cosine_similarity};

struct Entry {
	chunk: Chunk,
	vector: Vec<f32>,
}

/// Process-local store with exact cosine ranking.
pub struct MemoryStore {
	embedder: Arc<Embedder>,
	vector_dim: usize,
	namespaces: RwLock<HashMap<Namespace, BTreeMap<String, Entry>>>,
}
impl MemoryStore {
	pub fn new(vector_dim: u32, embedder: Arc<Embedder>) -> Result<Self> {
		crate::check_embedder(&embedder, vector_dim)?;

		Ok(Self {
			embedder,
			vector_dim: vector_dim as usize,
			namespaces: RwLock::new(HashMap::new()),
		})
	}

	pub(crate) fn embedder(&self) -> &Embedder {
		&self.embedder
	}

	pub async fn len(&self, namespace: &Namespace) -> usize {
		self.namespaces.read().await.get(namespace).map(BTreeMap::len).unwrap_or(0)
	}

	pub async fn is_empty(&self, namespace: &Namespace) -> bool {
		self.len(namespace).await == 0
	}

	/// Stored chunks of `namespace` ordered by id.
	pub async fn chunks(&self, namespace: &Namespace) -> Vec<Chunk> {
		self.namespaces
			.read()
			.await
			.get(namespace)
			.map(|entries| entries.values().map(|entry| entry.chunk.clone()).collect())
			.unwrap_or_default()
	}

	pub(crate) async fn existing_ids(
		&self,
		ids: &[String],
		namespace: &Namespace,
	) -> Vec<String> {
		let guard = self.namespaces.read().await;
		let Some(entries) = guard.get(namespace) else {
			return Vec::new();
		};

		ids.iter().filter(|id| entries.contains_key(id.as_str())).cloned().collect()
	}

	pub(crate) async fn write(
		&self,
		chunks: Vec<Chunk>,
		vectors: Vec<Vec<f32>>,
		namespace: &Namespace,
	) -> Result<()> {
		if chunks.len() != vectors.len() {
			return Err(Error::InvalidArgument(format!(
				"Got {} vectors for {} chunks.",
				vectors.len(),
				chunks.len()
			)));
		}

		for vector in &vectors {
			crate::check_dimension(vector, self.vector_dim)?;
		}

		let mut guard = self.namespaces.write().await;
		let entries = guard.entry(namespace.clone()).or_default();

		for (chunk, vector) in chunks.into_iter().zip(vectors) {
			entries.entry(chunk.id.clone()).or_insert(Entry { chunk, vector });
		}

		Ok(())
	}

	pub(crate) async fn search(
		&self,
		vector: &[f32],
		namespace: &Namespace,
		k: usize,
	) -> Vec<Chunk> {
		let guard = self.namespaces.read().await;
		let Some(entries) = guard.get(namespace) else {
			return Vec::new();
		};
		let mut scored: Vec<(f32, &Entry)> = entries
			.values()
			.map(|entry| (cosine_similarity(vector, &entry.vector), entry))
			.collect();

		// Entries arrive in id order, so the stable sort breaks ties toward the lower id.
		scored.sort_by(|a, b| b.0.total_cmp(&a.0));

		scored.into_iter().take(k).map(|(_, entry)| entry.chunk.clone()).collect()
	}

	pub(crate) async fn remove(&self, ids: &[String], namespace: &Namespace) {
		let mut guard = self.namespaces.write().await;

		if let Some(entries) = guard.get_mut(namespace) {
			for id in ids {
				entries.remove(id);
			}

			if entries.is_empty() {
				guard.remove(namespace);
			}
		}
	}
}
