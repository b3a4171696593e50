//! Composition root. Every process-wide capability is built here, once.

use std::{path::Path, sync::Arc};

use crate::{
	AnswerService, AnswerSettings, ChatExpansion, ChatGenerator, Error, ExtractorRegistry,
	Ingestor, Reranker, Result,
};
use rag_chunking::{Chunker, TokenCodec};
use rag_config::Config;
use rag_domain::IngestParams;
use rag_providers::{ChatProvider, Embedder, HttpChat, HttpRerank, RerankProvider};
use rag_storage::VectorStore;

/// Shared capabilities handed to both the answer path and the ingestion path.
#[derive(Clone)]
pub struct Components {
	pub embedder: Arc<Embedder>,
	pub store: Arc<VectorStore>,
	pub chunker: Chunker,
	pub reranker: Arc<Reranker>,
	pub expansion: Option<Arc<ChatExpansion>>,
	pub generator: Arc<ChatGenerator>,
	pub settings: AnswerSettings,
}
impl Components {
	pub async fn from_config(cfg: &Config) -> Result<Self> {
		let embedder = Arc::new(Embedder::from_config(&cfg.providers.embedding).map_err(config)?);
		let store = Arc::new(VectorStore::from_config(cfg, embedder.clone()).await?);
		let chunker = build_chunker(cfg)?;
		let cross_encoder = build_cross_encoder(cfg);
		let bi_encoder = cfg.search.rerank.bi_encoder.then(|| embedder.clone());
		let reranker = Arc::new(Reranker::init(cross_encoder, bi_encoder).await);
		let chat: Arc<dyn ChatProvider> =
			Arc::new(HttpChat::new(&cfg.providers.llm).map_err(config)?);
		let expansion = cfg.search.expansion.enabled.then(|| {
			Arc::new(ChatExpansion::new(
				chat.clone(),
				cfg.search.expansion.n,
				cfg.search.expansion.temperature,
			))
		});
		let generator = Arc::new(ChatGenerator::new(
			chat,
			cfg.generation.max_context_chars as usize,
			cfg.generation.temperature,
		));

		tracing::info!(
			backend = store.backend(),
			rerank_mode = reranker.mode().as_str(),
			expansion = expansion.is_some(),
			"Components ready."
		);

		Ok(Self {
			embedder,
			store,
			chunker,
			reranker,
			expansion,
			generator,
			settings: AnswerSettings::from_config(&cfg.search),
		})
	}

	pub fn answer_service(&self) -> AnswerService {
		let service = AnswerService::new(
			self.store.clone(),
			self.reranker.clone(),
			self.generator.clone(),
			self.settings,
		);

		match self.expansion.clone() {
			Some(expansion) => service.with_expansion(expansion),
			None => service,
		}
	}

	pub fn ingestor(&self) -> Ingestor {
		Ingestor::new(ExtractorRegistry::default(), self.chunker.clone(), self.store.clone())
	}
}

fn build_chunker(cfg: &Config) -> Result<Chunker> {
	let codec: Arc<dyn TokenCodec> = match (
		cfg.chunking.tokenizer_file.as_deref(),
		cfg.chunking.tokenizer_repo.as_deref(),
	) {
		(Some(file), _) => Arc::new(rag_chunking::load_tokenizer_file(Path::new(file))?),
		(None, Some(repo)) => Arc::new(rag_chunking::load_tokenizer(repo)?),
		(None, None) => {
			return Err(Error::Config {
				message: "chunking.tokenizer_repo or chunking.tokenizer_file must be set."
					.to_string(),
			});
		},
	};
	let params =
		IngestParams { chunk_size: cfg.chunking.max_tokens, overlap: cfg.chunking.overlap_tokens };

	Ok(Chunker::new(params, codec)?)
}

// A rerank client that cannot even be built only costs the cross-encoder mode.
fn build_cross_encoder(cfg: &Config) -> Option<Arc<dyn RerankProvider>> {
	let rerank_cfg = cfg.providers.rerank.as_ref()?;

	match HttpRerank::new(rerank_cfg) {
		Ok(client) => Some(Arc::new(client)),
		Err(err) => {
			tracing::warn!(error = %err, "Failed to build rerank provider.");

			None
		},
	}
}

fn config(err: rag_providers::Error) -> Error {
	Error::Config { message: err.to_string() }
}
