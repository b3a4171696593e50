use std::{collections::HashSet, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{task::JoinSet, time};

use crate::{AnswerGenerator, Error, QueryExpansion, Reranker, Result, expansion};
use rag_domain::{Chunk, Namespace};
use rag_storage::VectorStore;

#[derive(Clone, Debug, Deserialize)]
pub struct AnswerRequest {
	pub query: String,
	/// Namespace the answer is drawn from.
	#[serde(alias = "namespace")]
	pub user_id: String,
	#[serde(default)]
	pub k: Option<u32>,
	#[serde(default)]
	pub trace: bool,
}

/// The answer together with the exact chunks it was generated from, most relevant first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnswerTrace {
	pub answer: String,
	pub chunks: Vec<Chunk>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerOutput {
	Plain(String),
	Traced(AnswerTrace),
}
impl AnswerOutput {
	pub fn answer(&self) -> &str {
		match self {
			Self::Plain(answer) => answer,
			Self::Traced(trace) => &trace.answer,
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct AnswerSettings {
	pub default_k: u32,
	/// Upper bound on the query set, original query included.
	pub max_queries: u32,
	pub request_timeout: Duration,
}
impl AnswerSettings {
	pub fn from_config(cfg: &rag_config::Search) -> Self {
		Self {
			default_k: cfg.default_k,
			max_queries: cfg.max_queries,
			request_timeout: Duration::from_millis(cfg.request_timeout_ms),
		}
	}
}
impl Default for AnswerSettings {
	fn default() -> Self {
		Self { default_k: 8, max_queries: 4, request_timeout: Duration::from_secs(60) }
	}
}

/// Expand, retrieve, dedup, rerank and generate for one question.
pub struct AnswerService {
	store: Arc<VectorStore>,
	expansion: Option<Arc<dyn QueryExpansion>>,
	reranker: Arc<Reranker>,
	generator: Arc<dyn AnswerGenerator>,
	settings: AnswerSettings,
}
impl AnswerService {
	pub fn new(
		store: Arc<VectorStore>,
		reranker: Arc<Reranker>,
		generator: Arc<dyn AnswerGenerator>,
		settings: AnswerSettings,
	) -> Self {
		Self { store, expansion: None, reranker, generator, settings }
	}

	pub fn with_expansion(mut self, expansion: Arc<dyn QueryExpansion>) -> Self {
		self.expansion = Some(expansion);

		self
	}

	pub fn settings(&self) -> AnswerSettings {
		self.settings
	}

	pub fn reranker(&self) -> &Reranker {
		&self.reranker
	}

	pub async fn answer(&self, request: AnswerRequest) -> Result<AnswerOutput> {
		let query = request.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let namespace = Namespace::new(&request.user_id)?;
		let k = match request.k {
			Some(0) => {
				return Err(Error::InvalidRequest {
					message: "k must be greater than zero.".to_string(),
				});
			},
			Some(k) => k as usize,
			None => self.settings.default_k as usize,
		};
		let timeout = self.settings.request_timeout;
		let (answer, chunks) = time::timeout(timeout, self.run(query, &namespace, k))
			.await
			.map_err(|_| Error::Timeout { timeout_ms: timeout.as_millis() as u64 })??;

		Ok(if request.trace {
			AnswerOutput::Traced(AnswerTrace { answer, chunks })
		} else {
			AnswerOutput::Plain(answer)
		})
	}

	async fn run(
		&self,
		query: &str,
		namespace: &Namespace,
		k: usize,
	) -> Result<(String, Vec<Chunk>)> {
		let queries = self.query_set(query).await;
		let retrieved = self.retrieve(&queries, namespace, k).await?;
		let retrieved_count = retrieved.len();
		let candidates = dedup_by_id(retrieved);

		tracing::debug!(
			namespace = %namespace,
			queries = queries.len(),
			retrieved = retrieved_count,
			candidates = candidates.len(),
			"Retrieved candidates."
		);

		let ranked = self.reranker.rerank(query, candidates, k).await?;
		let context: Vec<String> = ranked.iter().map(|chunk| chunk.text.clone()).collect();
		let answer = self.generator.generate(query, &context).await?;

		tracing::info!(
			namespace = %namespace,
			queries = queries.len(),
			chunks = ranked.len(),
			mode = self.reranker.mode().as_str(),
			"Answered query."
		);

		Ok((answer, ranked))
	}

	// Original first. Expansion errors never fail the request.
	async fn query_set(&self, query: &str) -> Vec<String> {
		let max_queries = self.settings.max_queries.max(1) as usize;
		let mut queries = vec![query.to_string()];

		if let Some(expander) = self.expansion.as_ref() {
			match expander.expand(query).await {
				Ok(extra) => queries.extend(expansion::normalize_expansions(
					extra,
					query,
					max_queries - 1,
				)),
				Err(err) => tracing::warn!(
					error = %err,
					"Query expansion failed. Falling back to the original query."
				),
			}
		}

		queries.truncate(max_queries);

		queries
	}

	async fn retrieve(
		&self,
		queries: &[String],
		namespace: &Namespace,
		k: usize,
	) -> Result<Vec<Chunk>> {
		let mut tasks = JoinSet::new();

		for (position, query) in queries.iter().enumerate() {
			let store = self.store.clone();
			let namespace = namespace.clone();
			let query = query.clone();

			tasks.spawn(async move { (position, store.query(&query, &namespace, k).await) });
		}

		let mut results = Vec::with_capacity(queries.len());

		while let Some(joined) = tasks.join_next().await {
			let (position, result) = joined
				.map_err(|err| Error::Store { message: format!("Retrieval task failed: {err}") })?;

			results.push((position, result?));
		}

		results.sort_by_key(|(position, _)| *position);

		Ok(results.into_iter().flat_map(|(_, chunks)| chunks).collect())
	}
}

/// Keeps the first occurrence of every chunk id, preserving merge order.
pub fn dedup_by_id(chunks: Vec<Chunk>) -> Vec<Chunk> {
	let mut seen = HashSet::new();

	chunks.into_iter().filter(|chunk| seen.insert(chunk.id.clone())).collect()
}
