use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{EmbeddingError, EmbeddingProvider, Error, HttpEmbedding, Result};
use rag_config::EmbeddingProviderConfig;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Batching front of an [`EmbeddingProvider`].
///
/// Inputs are split into provider batches that run concurrently, bounded by a semaphore that
/// lives as long as the embedder. Build one per process and share it behind an `Arc` so the bound
/// holds for every caller.
pub struct Embedder {
	provider: Arc<dyn EmbeddingProvider>,
	dimensions: usize,
	batch_size: usize,
	permits: Arc<Semaphore>,
}
impl Embedder {
	pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: u32) -> Self {
		Self {
			provider,
			dimensions: dimensions as usize,
			batch_size: DEFAULT_BATCH_SIZE,
			permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
		}
	}

	pub fn with_limits(
		provider: Arc<dyn EmbeddingProvider>,
		dimensions: u32,
		batch_size: u32,
		max_concurrency: u32,
	) -> Result<Self> {
		if dimensions == 0 || batch_size == 0 || max_concurrency == 0 {
			return Err(Error::InvalidConfig {
				message: "Embedder dimensions, batch size and concurrency must be positive."
					.to_string(),
			});
		}

		Ok(Self {
			provider,
			dimensions: dimensions as usize,
			batch_size: batch_size as usize,
			permits: Arc::new(Semaphore::new(max_concurrency as usize)),
		})
	}

	pub fn from_config(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		let provider = Arc::new(HttpEmbedding::new(cfg)?);

		Self::with_limits(provider, cfg.dimensions, cfg.batch_size, cfg.max_concurrency)
	}

	pub fn dimensions(&self) -> usize {
		self.dimensions
	}

	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let mut tasks = JoinSet::new();

		for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
			let start = batch_index * self.batch_size;
			let end = start + batch.len();
			let batch = batch.to_vec();
			let provider = self.provider.clone();
			let permits = self.permits.clone();
			let dimensions = self.dimensions;

			tasks.spawn(async move {
				let fail = |message: String| EmbeddingError { start, end, message };
				let _permit = permits
					.acquire_owned()
					.await
					.map_err(|_| fail("Embedding limiter is closed.".to_string()))?;
				let vectors = provider.embed(&batch).await.map_err(|err| fail(err.to_string()))?;

				check_batch(&vectors, batch.len(), dimensions).map_err(fail)?;

				Ok::<_, EmbeddingError>((batch_index, vectors))
			});
		}

		let mut batches = Vec::with_capacity(tasks.len());

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(Ok(batch)) => batches.push(batch),
				Ok(Err(err)) => {
					tracing::warn!(
						start = err.start,
						end = err.end,
						error = %err.message,
						"Embedding batch failed."
					);

					return Err(err);
				},
				Err(err) => {
					return Err(EmbeddingError {
						start: 0,
						end: texts.len(),
						message: format!("Embedding task failed: {err}"),
					});
				},
			}
		}

		batches.sort_by_key(|(batch_index, _)| *batch_index);

		Ok(batches.into_iter().flat_map(|(_, vectors)| vectors).collect())
	}

	pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
		let mut vectors = self.embed(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| EmbeddingError {
			start: 0,
			end: 1,
			message: "Embedding provider returned no vector.".to_string(),
		})
	}
}

fn check_batch(vectors: &[Vec<f32>], expected: usize, dimensions: usize) -> Result<(), String> {
	if vectors.len() != expected {
		return Err(format!("Provider returned {} vectors for {expected} inputs.", vectors.len()));
	}

	if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions) {
		return Err(format!(
			"Provider returned a vector of dimension {}, expected {dimensions}.",
			vector.len()
		));
	}

	Ok(())
}

/// Cosine similarity of two vectors. Zero when either is empty, zero-norm, or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	};

	use super::*;
	use crate::BoxFuture;

	struct LengthEmbedding {
		calls: AtomicUsize,
		in_flight: AtomicUsize,
		peak: AtomicUsize,
		batches: Mutex<Vec<usize>>,
	}
	impl LengthEmbedding {
		fn new() -> Self {
			Self {
				calls: AtomicUsize::new(0),
				in_flight: AtomicUsize::new(0),
				peak: AtomicUsize::new(0),
				batches: Mutex::new(Vec::new()),
			}
		}
	}
	impl EmbeddingProvider for LengthEmbedding {
		fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

				self.peak.fetch_max(now, Ordering::SeqCst);
				self.batches.lock().unwrap_or_else(|e| e.into_inner()).push(texts.len());

				tokio::time::sleep(std::time::Duration::from_millis(10)).await;

				self.in_flight.fetch_sub(1, Ordering::SeqCst);

				Ok(texts.iter().map(|text| vec![text.len() as f32, 1.0]).collect())
			})
		}
	}

	struct ShortEmbedding;
	impl EmbeddingProvider for ShortEmbedding {
		fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			Box::pin(async move {
				if texts.iter().any(|text| text == "bad") {
					return Err(Error::InvalidResponse { message: "rejected".to_string() });
				}

				Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
			})
		}
	}

	fn inputs(count: usize) -> Vec<String> {
		(0..count).map(|i| "x".repeat(i + 1)).collect()
	}

	#[tokio::test]
	async fn preserves_order_across_batches() {
		let provider = Arc::new(LengthEmbedding::new());
		let embedder =
			Embedder::with_limits(provider.clone(), 2, 3, 2).expect("Expected valid limits.");
		let vectors = embedder.embed(&inputs(10)).await.expect("Embedding failed.");

		assert_eq!(vectors.len(), 10);

		for (i, vector) in vectors.iter().enumerate() {
			assert_eq!(vector[0], (i + 1) as f32);
		}

		assert_eq!(provider.calls.load(Ordering::SeqCst), 4);

		let mut sizes = provider.batches.lock().unwrap_or_else(|e| e.into_inner()).clone();

		sizes.sort_unstable();

		assert_eq!(sizes, vec![1, 3, 3, 3]);
	}

	#[tokio::test]
	async fn concurrency_stays_under_ceiling() {
		let provider = Arc::new(LengthEmbedding::new());
		let embedder =
			Embedder::with_limits(provider.clone(), 2, 1, 2).expect("Expected valid limits.");

		embedder.embed(&inputs(8)).await.expect("Embedding failed.");

		assert!(provider.peak.load(Ordering::SeqCst) <= 2);
	}

	#[tokio::test]
	async fn failed_batch_reports_its_range() {
		let embedder = Embedder::with_limits(Arc::new(ShortEmbedding), 2, 2, 1)
			.expect("Expected valid limits.");
		let texts: Vec<String> =
			["a", "b", "c", "bad", "e"].into_iter().map(ToString::to_string).collect();
		let err = embedder.embed(&texts).await.expect_err("Expected batch failure.");

		assert_eq!((err.start, err.end), (2, 4));
		assert!(err.message.contains("rejected"));
	}

	#[tokio::test]
	async fn wrong_dimension_fails() {
		let embedder = Embedder::new(Arc::new(ShortEmbedding), 3);
		let err = embedder.embed(&inputs(2)).await.expect_err("Expected dimension failure.");

		assert!(err.message.contains("expected 3"));
	}

	#[tokio::test]
	async fn empty_input_skips_provider() {
		let provider = Arc::new(LengthEmbedding::new());
		let embedder = Embedder::new(provider.clone(), 2);

		assert!(embedder.embed(&[]).await.expect("Embedding failed.").is_empty());
		assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn zero_limits_are_rejected() {
		assert!(Embedder::with_limits(Arc::new(ShortEmbedding), 2, 0, 1).is_err());
		assert!(Embedder::with_limits(Arc::new(ShortEmbedding), 2, 1, 0).is_err());
	}

	#[test]
	fn cosine_handles_degenerate_vectors() {
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
	}
}
