use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{BoxFuture, Error, RerankProvider, Result};
use rag_config::ProviderConfig;

/// Cross-encoder client for the `/rerank` protocol.
pub struct HttpRerank {
	client: Client,
	url: String,
	headers: HeaderMap,
	model: String,
}
impl HttpRerank {
	pub fn new(cfg: &ProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			url: crate::endpoint(&cfg.api_base, &cfg.path),
			headers: crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
			model: cfg.model.clone(),
		})
	}

	async fn request(&self, query: &str, docs: &[String]) -> Result<Vec<f32>> {
		let body = serde_json::json!({ "model": self.model, "query": query, "documents": docs });
		let res =
			self.client.post(&self.url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_rerank_response(json, docs.len())
	}
}
impl RerankProvider for HttpRerank {
	fn rerank<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(self.request(query, docs))
	}
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores: Vec<Option<f32>> = vec![None; doc_count];
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank response is missing results array.".to_string(),
		})?;

	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::InvalidResponse {
				message: "Rerank result missing score.".to_string(),
			})? as f32;
		let slot = scores.get_mut(index).ok_or_else(|| Error::InvalidResponse {
			message: format!("Rerank result index {index} is out of range for {doc_count} docs."),
		})?;

		if slot.replace(score).is_some() {
			return Err(Error::InvalidResponse {
				message: format!("Rerank result index {index} appears more than once."),
			});
		}
	}

	scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| {
			score.ok_or_else(|| Error::InvalidResponse {
				message: format!("Rerank response has no score for document {index}."),
			})
		})
		.collect()
}
