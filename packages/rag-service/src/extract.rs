use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{Error, Result};

/// Turns the raw bytes of one file format into UTF-8 text.
pub trait TextExtractor
where
	Self: Send + Sync,
{
	fn extract(&self, data: &[u8], filename: &str) -> Result<String>;
}

/// Plain text and markdown. Bytes must already be valid UTF-8.
pub struct PlainTextExtractor;
impl TextExtractor for PlainTextExtractor {
	fn extract(&self, data: &[u8], filename: &str) -> Result<String> {
		let text = std::str::from_utf8(data).map_err(|err| Error::Extraction {
			file: filename.to_string(),
			message: err.to_string(),
		})?;

		Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
	}
}

/// Extractors keyed by lowercase file extension.
#[derive(Clone)]
pub struct ExtractorRegistry {
	handlers: HashMap<String, Arc<dyn TextExtractor>>,
}
impl ExtractorRegistry {
	pub fn empty() -> Self {
		Self { handlers: HashMap::new() }
	}

	pub fn register(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
		self.handlers.insert(normalize_extension(extension), extractor);
	}

	pub fn supports(&self, filename: &str) -> bool {
		self.handlers.contains_key(&extension_of(filename))
	}

	pub fn extract(&self, data: &[u8], filename: &str) -> Result<String> {
		let extension = extension_of(filename);
		let extractor = self
			.handlers
			.get(&extension)
			.ok_or_else(|| Error::UnsupportedFormat { extension: extension.clone() })?;

		extractor.extract(data, filename)
	}
}
impl Default for ExtractorRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();
		let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);

		for extension in ["txt", "md", "markdown"] {
			registry.register(extension, plain.clone());
		}

		registry
	}
}

fn extension_of(filename: &str) -> String {
	Path::new(filename)
		.extension()
		.and_then(|ext| ext.to_str())
		.map(normalize_extension)
		.unwrap_or_default()
}

fn normalize_extension(extension: &str) -> String {
	extension.trim().trim_start_matches('.').to_lowercase()
}
