pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}

/// A failed embedding batch. `start..end` is the range of inputs the batch covered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Embedding failed for inputs {start}..{end}: {message}")]
pub struct EmbeddingError {
	pub start: usize,
	pub end: usize,
	pub message: String,
}
