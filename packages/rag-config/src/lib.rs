mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, Generation, LlmProviderConfig, ProviderConfig,
	Providers, Qdrant, Search, SearchExpansion, SearchRerank, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.storage.backend.as_str(), "qdrant" | "memory") {
		return Err(Error::Validation {
			message: "storage.backend must be one of qdrant or memory.".to_string(),
		});
	}
	if cfg.storage.backend == "qdrant" && cfg.storage.qdrant.is_none() {
		return Err(Error::Validation {
			message: "storage.qdrant is required when storage.backend is qdrant.".to_string(),
		});
	}
	if let Some(qdrant) = cfg.storage.qdrant.as_ref() {
		for (label, value) in
			[("storage.qdrant.url", &qdrant.url), ("storage.qdrant.collection", &qdrant.collection)]
		{
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}
		if cfg.providers.embedding.dimensions != qdrant.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
					.to_string(),
			});
		}
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.batch_size == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.max_concurrency == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.max_concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.max_tokens == 0 {
		return Err(Error::Validation {
			message: "chunking.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_tokens >= cfg.chunking.max_tokens {
		return Err(Error::Validation {
			message: "chunking.overlap_tokens must be less than chunking.max_tokens.".to_string(),
		});
	}
	if cfg.chunking.tokenizer_repo.is_none() && cfg.chunking.tokenizer_file.is_none() {
		return Err(Error::Validation {
			message: "chunking.tokenizer_repo or chunking.tokenizer_file must be set.".to_string(),
		});
	}
	if cfg.search.default_k == 0 {
		return Err(Error::Validation {
			message: "search.default_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_queries == 0 {
		return Err(Error::Validation {
			message: "search.max_queries must be greater than zero.".to_string(),
		});
	}
	if cfg.search.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.expansion.temperature.is_finite() || cfg.search.expansion.temperature < 0.0 {
		return Err(Error::Validation {
			message: "search.expansion.temperature must be a finite number zero or greater."
				.to_string(),
		});
	}
	if cfg.generation.max_context_chars == 0 {
		return Err(Error::Validation {
			message: "generation.max_context_chars must be greater than zero.".to_string(),
		});
	}
	if !cfg.generation.temperature.is_finite() || cfg.generation.temperature < 0.0 {
		return Err(Error::Validation {
			message: "generation.temperature must be a finite number zero or greater.".to_string(),
		});
	}

	let mut keys =
		vec![("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)];

	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		keys.push(("rerank", &rerank.api_key));
	}

	for (label, key) in keys {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.chunking.tokenizer_repo.as_deref().map(|repo| repo.trim().is_empty()).unwrap_or(false) {
		cfg.chunking.tokenizer_repo = None;
	}
	if cfg.chunking.tokenizer_file.as_deref().map(|file| file.trim().is_empty()).unwrap_or(false) {
		cfg.chunking.tokenizer_file = None;
	}
	if let Some(qdrant) = cfg.storage.qdrant.as_mut()
		&& qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		qdrant.api_key = None;
	}
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
}
