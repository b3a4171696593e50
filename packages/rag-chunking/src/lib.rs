mod error;

pub use error::{Error, Result};
pub use tokenizers::Tokenizer;

use std::{collections::HashMap, path::Path, sync::Arc};

use rag_domain::{Chunk, DocumentBatch, IngestParams};

const FALLBACK_STEM: &str = "doc";
const ID_DIGEST_HEX_LEN: usize = 16;

/// Fixed encode/decode pair used to measure and cut windows.
pub trait TokenCodec
where
	Self: Send + Sync,
{
	fn encode(&self, text: &str) -> Result<Vec<u32>>;

	fn decode(&self, ids: &[u32]) -> Result<String>;
}
impl TokenCodec for Tokenizer {
	fn encode(&self, text: &str) -> Result<Vec<u32>> {
		let encoding = (**self).encode(text, false)
			.map_err(|err| Error::Tokenizer { message: err.to_string() })?;

		Ok(encoding.get_ids().to_vec())
	}

	fn decode(&self, ids: &[u32]) -> Result<String> {
		(**self).decode(ids, false)
			.map_err(|err| Error::Tokenizer { message: err.to_string() })
	}
}

pub fn load_tokenizer(repo: &str) -> Result<Tokenizer> {
	Tokenizer::from_pretrained(repo, None)
		.map_err(|err| Error::Tokenizer { message: format!("Failed to load {repo}: {err}") })
}

pub fn load_tokenizer_file(path: &Path) -> Result<Tokenizer> {
	Tokenizer::from_file(path).map_err(|err| Error::Tokenizer {
		message: format!("Failed to load {}: {err}", path.display()),
	})
}

/// Splits text into overlapping token windows with content-derived ids.
#[derive(Clone)]
pub struct Chunker {
	params: IngestParams,
	codec: Arc<dyn TokenCodec>,
}
impl Chunker {
	pub fn new(params: IngestParams, codec: Arc<dyn TokenCodec>) -> Result<Self> {
		params.validate()?;

		Ok(Self { params, codec })
	}

	pub fn params(&self) -> IngestParams {
		self.params
	}

	pub fn chunk(&self, text: &str, source: &str) -> Result<DocumentBatch> {
		let mut batch = DocumentBatch::new(source);
		let tokens = self.codec.encode(text)?;

		if tokens.is_empty() {
			return Ok(batch);
		}

		let size = self.params.chunk_size as usize;
		let stride = self.params.stride() as usize;
		let stem = source_stem(source);
		let mut seen: HashMap<String, u32> = HashMap::new();
		let mut start = 0_usize;

		loop {
			let end = (start + size).min(tokens.len());
			let text = self.codec.decode(&tokens[start..end])?;
			let occurrence = seen.entry(text.clone()).or_insert(0);
			let id = format!("{stem}_{}", window_digest(&text, *occurrence));

			*occurrence += 1;

			batch.chunks.push(Chunk {
				id,
				text,
				index: batch.chunks.len() as u32,
				source: source.to_string(),
			});

			if end == tokens.len() {
				break;
			}

			start += stride;
		}

		tracing::debug!(source, tokens = tokens.len(), chunks = batch.len(), "Chunked document.");

		Ok(batch)
	}
}

fn source_stem(source: &str) -> &str {
	Path::new(source)
		.file_stem()
		.and_then(|stem| stem.to_str())
		.map(str::trim)
		.filter(|stem| !stem.is_empty())
		.unwrap_or(FALLBACK_STEM)
}

// Repeated window text within one batch gets its occurrence mixed in so ids stay unique.
fn window_digest(text: &str, occurrence: u32) -> String {
	let mut hasher = blake3::Hasher::new();

	hasher.update(text.as_bytes());

	if occurrence > 0 {
		hasher.update(&[0]);
		hasher.update(&occurrence.to_le_bytes());
	}

	let hex = hasher.finalize().to_hex();

	hex[..ID_DIGEST_HEX_LEN].to_string()
}
