use std::{collections::HashSet, sync::Arc};

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};
use rag_providers::{BoxFuture, ChatProvider};

/// Derives alternate phrasings of a query to widen recall.
pub trait QueryExpansion
where
	Self: Send + Sync,
{
	fn expand<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;
}

/// Expansion backed by a chat model that is asked for a JSON list.
pub struct ChatExpansion {
	chat: Arc<dyn ChatProvider>,
	n: u32,
	temperature: f32,
}
impl ChatExpansion {
	pub fn new(chat: Arc<dyn ChatProvider>, n: u32, temperature: f32) -> Self {
		Self { chat, n, temperature }
	}

	async fn run(&self, query: &str) -> Result<Vec<String>> {
		let messages = build_expansion_messages(query, self.n);
		let raw = self
			.chat
			.complete(&messages, self.temperature)
			.await
			.map_err(|err| Error::CapabilityUnavailable {
				capability: "query expansion".to_string(),
				message: err.to_string(),
			})?;
		let parsed = parse_expansion(&raw)?;

		Ok(normalize_expansions(parsed, query, self.n as usize))
	}
}
impl QueryExpansion for ChatExpansion {
	fn expand<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(self.run(query))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpansionPayload {
	List(Vec<String>),
	Object { queries: Vec<String> },
}

pub fn build_expansion_messages(query: &str, n: u32) -> Vec<Value> {
	let system_prompt = "You rewrite search queries for a document retrieval system. \
Output must be valid JSON only: a JSON array of strings. \
Each string is a short rephrasing that preserves the original intent. \
Do not add explanations or extra fields.";
	let user_prompt = format!(
		"Return a JSON array with at most {n} alternate phrasings of the query below.\n\
Query:\n{query}"
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

/// Accepts a bare array or `{"queries": [...]}`, optionally wrapped in a code fence.
pub fn parse_expansion(raw: &str) -> Result<Vec<String>> {
	let body = strip_code_fence(raw.trim());
	let payload: ExpansionPayload = serde_json::from_str(body)
		.map_err(|err| Error::ExpansionParse { message: err.to_string() })?;

	Ok(match payload {
		ExpansionPayload::List(queries) => queries,
		ExpansionPayload::Object { queries } => queries,
	})
}

/// Trims, drops the original query, dedups case-insensitively and caps at `max`.
pub fn normalize_expansions(queries: Vec<String>, original: &str, max: usize) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	seen.insert(original.trim().to_lowercase());

	for query in queries {
		if out.len() >= max {
			break;
		}

		push_query(&mut out, &mut seen, &query);
	}

	out
}

fn push_query(out: &mut Vec<String>, seen: &mut HashSet<String>, value: &str) {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return;
	}

	if seen.insert(trimmed.to_lowercase()) {
		out.push(trimmed.to_string());
	}
}

fn strip_code_fence(raw: &str) -> &str {
	let Some(rest) = raw.strip_prefix("```") else {
		return raw;
	};
	let rest = rest.strip_prefix("json").unwrap_or(rest);

	rest.strip_suffix("```").unwrap_or(rest).trim()
}
