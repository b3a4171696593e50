use std::{
	future,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::Value;

use rag_chunking::TokenCodec;
use rag_providers::{BoxFuture, ChatProvider, EmbeddingProvider, Error, RerankProvider, Result};

/// Deterministic bag-of-words vectors. Texts sharing words land close together.
pub struct HashEmbedding {
	dimensions: usize,
}
impl HashEmbedding {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions: dimensions as usize }
	}

	pub fn vector(&self, text: &str) -> Vec<f32> {
		let mut vector = vec![0.0_f32; self.dimensions];

		for word in text.split(|c: char| !c.is_alphanumeric()).filter(|word| !word.is_empty()) {
			let hash = blake3::hash(word.to_lowercase().as_bytes());
			let mut bucket = [0_u8; 8];

			bucket.copy_from_slice(&hash.as_bytes()[..8]);

			vector[(u64::from_le_bytes(bucket) % self.dimensions as u64) as usize] += 1.0;
		}

		let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

		if norm > 0.0 {
			vector.iter_mut().for_each(|x| *x /= norm);
		}

		vector
	}
}
impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|text| self.vector(text)).collect()) })
	}
}

/// Wraps a provider and counts calls and embedded texts.
pub struct CountingEmbedding {
	inner: Arc<dyn EmbeddingProvider>,
	calls: AtomicUsize,
	texts: AtomicUsize,
}
impl CountingEmbedding {
	pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
		Self { inner, calls: AtomicUsize::new(0), texts: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn texts(&self) -> usize {
		self.texts.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for CountingEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.texts.fetch_add(texts.len(), Ordering::SeqCst);

		self.inner.embed(texts)
	}
}

pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(&'a self, _: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			Err(Error::InvalidResponse { message: "Embedding provider is down.".to_string() })
		})
	}
}

/// Replies with a fixed string and records every message list it receives.
pub struct ScriptedChat {
	reply: String,
	seen: Mutex<Vec<Vec<Value>>>,
}
impl ScriptedChat {
	pub fn new(reply: impl Into<String>) -> Self {
		Self { reply: reply.into(), seen: Mutex::new(Vec::new()) }
	}

	pub fn calls(&self) -> usize {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn messages(&self) -> Vec<Vec<Value>> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Content of the last user message of the most recent call.
	pub fn last_user_content(&self) -> Option<String> {
		let seen = self.seen.lock().unwrap_or_else(|err| err.into_inner());

		seen.last()?
			.iter()
			.rev()
			.find(|message| message.get("role").and_then(Value::as_str) == Some("user"))
			.and_then(|message| message.get("content"))
			.and_then(Value::as_str)
			.map(ToString::to_string)
	}
}
impl ChatProvider for ScriptedChat {
	fn complete<'a>(&'a self, messages: &'a [Value], _: f32) -> BoxFuture<'a, Result<String>> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).push(messages.to_vec());

		let reply = self.reply.clone();

		Box::pin(async move { Ok(reply) })
	}
}

pub struct FailingChat;
impl ChatProvider for FailingChat {
	fn complete<'a>(&'a self, _: &'a [Value], _: f32) -> BoxFuture<'a, Result<String>> {
		Box::pin(async {
			Err(Error::InvalidResponse { message: "Chat provider is down.".to_string() })
		})
	}
}

/// Never answers. Useful for exercising deadlines.
pub struct HangingChat;
impl ChatProvider for HangingChat {
	fn complete<'a>(&'a self, _: &'a [Value], _: f32) -> BoxFuture<'a, Result<String>> {
		Box::pin(future::pending())
	}
}

/// Returns preset scores, padded with zeros to the document count.
pub struct StaticRerank {
	scores: Vec<f32>,
	calls: AtomicUsize,
}
impl StaticRerank {
	pub fn new(scores: Vec<f32>) -> Self {
		Self { scores, calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl RerankProvider for StaticRerank {
	fn rerank<'a>(&'a self, _: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let scores: Vec<f32> =
			(0..docs.len()).map(|i| self.scores.get(i).copied().unwrap_or(0.0)).collect();

		Box::pin(async move { Ok(scores) })
	}
}

pub struct FailingRerank;
impl RerankProvider for FailingRerank {
	fn rerank<'a>(&'a self, _: &'a str, _: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async {
			Err(Error::InvalidResponse { message: "Rerank provider is down.".to_string() })
		})
	}
}

/// One token per `char`, so chunk windows are easy to reason about.
pub struct CharCodec;
impl TokenCodec for CharCodec {
	fn encode(&self, text: &str) -> rag_chunking::Result<Vec<u32>> {
		Ok(text.chars().map(u32::from).collect())
	}

	fn decode(&self, ids: &[u32]) -> rag_chunking::Result<String> {
		ids.iter()
			.map(|id| {
				char::from_u32(*id).ok_or_else(|| rag_chunking::Error::Tokenizer {
					message: format!("Token {id} is not a scalar value."),
				})
			})
			.collect()
	}
}
