use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub generation: Generation,
	#[serde(default)]
	pub security: Security,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	/// Either "qdrant" or "memory".
	#[serde(default = "default_backend")]
	pub backend: String,
	/// Required when the backend is "qdrant". The memory backend sizes vectors from
	/// `providers.embedding.dimensions`.
	pub qdrant: Option<Qdrant>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	pub api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	/// Optional. Without it the cross-encoder rerank mode is never selected.
	pub rerank: Option<ProviderConfig>,
	pub llm: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	#[serde(default = "default_embedding_batch_size")]
	pub batch_size: u32,
	#[serde(default = "default_embedding_max_concurrency")]
	pub max_concurrency: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub max_tokens: u32,
	pub overlap_tokens: u32,
	pub tokenizer_repo: Option<String>,
	/// Local `tokenizer.json`. Takes precedence over `tokenizer_repo`.
	pub tokenizer_file: Option<String>,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { max_tokens: 500, overlap_tokens: 75, tokenizer_repo: None, tokenizer_file: None }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_k: u32,
	pub max_queries: u32,
	pub request_timeout_ms: u64,
	pub expansion: SearchExpansion,
	pub rerank: SearchRerank,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_k: 8,
			max_queries: 4,
			request_timeout_ms: 60_000,
			expansion: SearchExpansion::default(),
			rerank: SearchRerank::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchExpansion {
	pub enabled: bool,
	pub n: u32,
	pub temperature: f32,
}
impl Default for SearchExpansion {
	fn default() -> Self {
		Self { enabled: true, n: 3, temperature: 0.7 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchRerank {
	/// Allow falling back to embedding cosine similarity when the cross-encoder is unavailable.
	pub bi_encoder: bool,
}
impl Default for SearchRerank {
	fn default() -> Self {
		Self { bi_encoder: true }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Generation {
	/// Counted in Unicode scalar values after the context is joined.
	pub max_context_chars: u32,
	pub temperature: f32,
}
impl Default for Generation {
	fn default() -> Self {
		Self { max_context_chars: 12_000, temperature: 0.0 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_backend() -> String {
	"qdrant".to_string()
}

fn default_embedding_batch_size() -> u32 {
	100
}

fn default_embedding_max_concurrency() -> u32 {
	5
}
