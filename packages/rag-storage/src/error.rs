use rag_providers::EmbeddingError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Store configuration error: {message}")]
	StoreConfig { message: String },
	#[error(transparent)]
	Embedding(#[from] EmbeddingError),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Corrupt payload: {0}")]
	CorruptPayload(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
