use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A token-bounded window of one source document.
///
/// `id` is a pure function of `source`, the window text and its occurrence within the batch, so
/// re-ingesting unchanged content always yields the same ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
	pub id: String,
	pub text: String,
	pub index: u32,
	pub source: String,
}

/// Chunks of a single source in window order. Consumed by one upsert call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentBatch {
	pub source: String,
	pub chunks: Vec<Chunk>,
}
impl DocumentBatch {
	pub fn new(source: impl Into<String>) -> Self {
		Self { source: source.into(), chunks: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.chunks.iter().map(|chunk| chunk.id.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestParams {
	/// Window size in tokens.
	pub chunk_size: u32,
	/// Tokens shared by consecutive windows.
	pub overlap: u32,
}
impl IngestParams {
	pub fn new(chunk_size: u32, overlap: u32) -> Result<Self> {
		let params = Self { chunk_size, overlap };

		params.validate()?;

		Ok(params)
	}

	pub fn validate(&self) -> Result<()> {
		if self.chunk_size == 0 {
			return Err(Error::InvalidIngestParams {
				message: "chunk_size must be greater than zero.".to_string(),
			});
		}
		if self.overlap >= self.chunk_size {
			return Err(Error::InvalidIngestParams {
				message: "overlap must be less than chunk_size.".to_string(),
			});
		}

		Ok(())
	}

	/// Tokens the window advances by. Zero only for params that fail validation.
	pub fn stride(&self) -> u32 {
		self.chunk_size.saturating_sub(self.overlap)
	}
}
impl Default for IngestParams {
	fn default() -> Self {
		Self { chunk_size: 500, overlap: 75 }
	}
}
