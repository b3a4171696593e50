pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid chunking params: {message}")]
	InvalidParams { message: String },
	#[error("Tokenizer error: {message}")]
	Tokenizer { message: String },
}
impl From<rag_domain::Error> for Error {
	fn from(err: rag_domain::Error) -> Self {
		Self::InvalidParams { message: err.to_string() }
	}
}
