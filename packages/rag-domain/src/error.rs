pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Namespace must be non-empty.")]
	InvalidNamespace,
	#[error("Invalid ingest params: {message}")]
	InvalidIngestParams { message: String },
}
