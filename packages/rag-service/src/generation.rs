use std::sync::Arc;

use serde_json::Value;

use crate::{Error, Result};
use rag_providers::{BoxFuture, ChatProvider};

const SYSTEM_PROMPT: &str = "You answer questions using only the provided context. \
If the context does not contain the answer, say that you do not know. \
Be concise and do not invent facts.";

/// Composes an answer to `query` from ordered context passages.
pub trait AnswerGenerator
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		query: &'a str,
		context: &'a [String],
	) -> BoxFuture<'a, Result<String>>;
}

pub struct ChatGenerator {
	chat: Arc<dyn ChatProvider>,
	max_context_chars: usize,
	temperature: f32,
}
impl ChatGenerator {
	pub fn new(chat: Arc<dyn ChatProvider>, max_context_chars: usize, temperature: f32) -> Self {
		Self { chat, max_context_chars, temperature }
	}

	async fn run(&self, query: &str, context: &[String]) -> Result<String> {
		let joined = build_context(context, self.max_context_chars);

		tracing::debug!(
			passages = context.len(),
			context_chars = joined.chars().count(),
			"Generating answer."
		);

		let messages = build_generation_messages(query, &joined);
		let answer = self
			.chat
			.complete(&messages, self.temperature)
			.await
			.map_err(|err| Error::Generation { message: err.to_string() })?;

		Ok(answer.trim().to_string())
	}
}
impl AnswerGenerator for ChatGenerator {
	fn generate<'a>(
		&'a self,
		query: &'a str,
		context: &'a [String],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.run(query, context))
	}
}

/// Joins passages with blank lines, then cuts the result to `max_chars` scalar values.
pub fn build_context(context: &[String], max_chars: usize) -> String {
	let mut joined = context.join("\n\n");

	if let Some((cut, _)) = joined.char_indices().nth(max_chars) {
		joined.truncate(cut);
	}

	joined
}

pub fn build_generation_messages(query: &str, context: &str) -> Vec<Value> {
	let user_prompt = format!("Context:\n{context}\n\nQuestion:\n{query}\n\nAnswer:");

	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn joins_with_blank_lines() {
		let context = vec!["one".to_string(), "two".to_string()];

		assert_eq!(build_context(&context, 100), "one\n\ntwo");
	}

	#[test]
	fn truncates_after_joining() {
		let context = vec!["abcdef".to_string(), "ghij".to_string()];
		let joined = build_context(&context, 8);

		assert_eq!(joined, "abcdef\n\n");
		assert_eq!(build_context(&context, 7), "abcdef\n");
	}

	#[test]
	fn counts_scalar_values_not_bytes() {
		let context = vec!["héllo wörld".to_string()];

		assert_eq!(build_context(&context, 4), "héll");
	}

	#[test]
	fn user_message_embeds_context_and_query() {
		let messages = build_generation_messages("Who?", "ctx");
		let user = messages[1]["content"].as_str().expect("Expected user content.");

		assert!(user.contains("ctx"));
		assert!(user.contains("Who?"));
	}
}
