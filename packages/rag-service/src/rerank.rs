use std::sync::Arc;

use serde::Serialize;

use crate::{Error, Result};
use rag_domain::Chunk;
use rag_providers::{Embedder, RerankProvider, cosine_similarity};

const PROBE_TEXT: &str = "probe";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMode {
	CrossEncoder,
	BiEncoder,
	PassThrough,
}
impl RerankMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::CrossEncoder => "cross_encoder",
			Self::BiEncoder => "bi_encoder",
			Self::PassThrough => "pass_through",
		}
	}
}

/// Relevance ordering strategy, fixed once at startup.
///
/// [`Reranker::init`] tries the cross-encoder first, then embedding cosine similarity, and settles
/// on pass-through when neither answers its probe. The chosen mode never changes afterwards.
pub enum Reranker {
	CrossEncoder(Arc<dyn RerankProvider>),
	BiEncoder(Arc<Embedder>),
	PassThrough,
}
impl Reranker {
	pub async fn init(
		cross_encoder: Option<Arc<dyn RerankProvider>>,
		bi_encoder: Option<Arc<Embedder>>,
	) -> Self {
		if let Some(provider) = cross_encoder {
			match probe_cross_encoder(provider.as_ref()).await {
				Ok(()) => return Self::selected(Self::CrossEncoder(provider)),
				Err(err) => tracing::warn!(error = %err, "Cross-encoder reranker is unavailable."),
			}
		}
		if let Some(embedder) = bi_encoder {
			match probe_bi_encoder(&embedder).await {
				Ok(()) => return Self::selected(Self::BiEncoder(embedder)),
				Err(err) => tracing::warn!(error = %err, "Bi-encoder reranker is unavailable."),
			}
		}

		Self::selected(Self::PassThrough)
	}

	fn selected(self) -> Self {
		tracing::info!(mode = self.mode().as_str(), "Reranker mode selected.");

		self
	}

	pub fn mode(&self) -> RerankMode {
		match self {
			Self::CrossEncoder(_) => RerankMode::CrossEncoder,
			Self::BiEncoder(_) => RerankMode::BiEncoder,
			Self::PassThrough => RerankMode::PassThrough,
		}
	}

	/// Orders `candidates` by relevance to `query` and keeps at most `top_n`.
	pub async fn rerank(
		&self,
		query: &str,
		mut candidates: Vec<Chunk>,
		top_n: usize,
	) -> Result<Vec<Chunk>> {
		if candidates.len() <= 1 {
			candidates.truncate(top_n);

			return Ok(candidates);
		}

		let docs = || candidates.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
		let scores = match self {
			Self::CrossEncoder(provider) => provider
				.rerank(query, &docs())
				.await
				.map_err(|err| Error::Rerank { message: err.to_string() })?,
			Self::BiEncoder(embedder) => bi_encoder_scores(embedder, query, docs()).await?,
			Self::PassThrough => {
				candidates.truncate(top_n);

				return Ok(candidates);
			},
		};

		if scores.len() != candidates.len() {
			return Err(Error::Rerank {
				message: format!(
					"Reranker returned {} scores for {} candidates.",
					scores.len(),
					candidates.len()
				),
			});
		}

		let mut scored: Vec<(Chunk, f32)> = candidates
			.into_iter()
			.zip(scores)
			.map(|(chunk, score)| (chunk, if score.is_nan() { f32::NEG_INFINITY } else { score }))
			.collect();

		scored.sort_by(|a, b| b.1.total_cmp(&a.1));

		Ok(scored.into_iter().take(top_n).map(|(chunk, _)| chunk).collect())
	}
}

async fn bi_encoder_scores(
	embedder: &Embedder,
	query: &str,
	docs: Vec<String>,
) -> Result<Vec<f32>> {
	let mut texts = Vec::with_capacity(docs.len() + 1);

	texts.push(query.to_string());
	texts.extend(docs);

	let vectors =
		embedder.embed(&texts).await.map_err(|err| Error::Rerank { message: err.to_string() })?;
	let Some((query_vector, doc_vectors)) = vectors.split_first() else {
		return Err(Error::Rerank { message: "Embedder returned no vectors.".to_string() });
	};

	Ok(doc_vectors.iter().map(|vector| cosine_similarity(query_vector, vector)).collect())
}

async fn probe_cross_encoder(provider: &dyn RerankProvider) -> Result<()> {
	let unavailable = |message: String| Error::CapabilityUnavailable {
		capability: "cross-encoder reranker".to_string(),
		message,
	};
	let scores = provider
		.rerank(PROBE_TEXT, &[PROBE_TEXT.to_string()])
		.await
		.map_err(|err| unavailable(err.to_string()))?;

	if scores.len() != 1 {
		return Err(unavailable(format!("Probe returned {} scores.", scores.len())));
	}

	Ok(())
}

async fn probe_bi_encoder(embedder: &Embedder) -> Result<()> {
	embedder.embed_one(PROBE_TEXT).await.map(|_| ()).map_err(|err| Error::CapabilityUnavailable {
		capability: "bi-encoder reranker".to_string(),
		message: err.to_string(),
	})
}
