use rag_providers::EmbeddingError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("{capability} is unavailable: {message}")]
	CapabilityUnavailable { capability: String, message: String },
	#[error(transparent)]
	Embedding(#[from] EmbeddingError),
	#[error("Generation failed: {message}")]
	Generation { message: String },
	#[error("Malformed expansion output: {message}")]
	ExpansionParse { message: String },
	#[error("No handler for extension .{extension}.")]
	UnsupportedFormat { extension: String },
	#[error("Failed to extract text from {file}: {message}")]
	Extraction { file: String, message: String },
	#[error("Rerank failed: {message}")]
	Rerank { message: String },
	#[error("Request exceeded its {timeout_ms} ms deadline.")]
	Timeout { timeout_ms: u64 },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage error: {message}")]
	Store { message: String },
	#[error("Chunking failed: {message}")]
	Chunking { message: String },
}
impl From<rag_storage::Error> for Error {
	fn from(err: rag_storage::Error) -> Self {
		match err {
			rag_storage::Error::StoreConfig { message } => Self::Config { message },
			rag_storage::Error::Embedding(inner) => Self::Embedding(inner),
			rag_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			rag_storage::Error::CorruptPayload(message) => Self::Store { message },
			rag_storage::Error::Qdrant(inner) => Self::Store { message: inner.to_string() },
		}
	}
}
impl From<rag_chunking::Error> for Error {
	fn from(err: rag_chunking::Error) -> Self {
		match err {
			rag_chunking::Error::InvalidParams { message } => Self::Config { message },
			rag_chunking::Error::Tokenizer { message } => Self::Chunking { message },
		}
	}
}
impl From<rag_config::Error> for Error {
	fn from(err: rag_config::Error) -> Self {
		Self::Config { message: err.to_string() }
	}
}
impl From<rag_domain::Error> for Error {
	fn from(err: rag_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
