use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{BoxFuture, ChatProvider, Error, Result};
use rag_config::LlmProviderConfig;

/// OpenAI-compatible `/chat/completions` client.
pub struct HttpChat {
	client: Client,
	url: String,
	headers: HeaderMap,
	model: String,
}
impl HttpChat {
	pub fn new(cfg: &LlmProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			url: crate::endpoint(&cfg.api_base, &cfg.path),
			headers: crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
			model: cfg.model.clone(),
		})
	}

	async fn request(&self, messages: &[Value], temperature: f32) -> Result<String> {
		let body = serde_json::json!({
			"model": self.model,
			"temperature": temperature,
			"messages": messages,
		});
		let res =
			self.client.post(&self.url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_chat_content(&json)
	}
}
impl ChatProvider for HttpChat {
	fn complete<'a>(
		&'a self,
		messages: &'a [Value],
		temperature: f32,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(self.request(messages, temperature))
	}
}

fn parse_chat_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(ToString::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})
}
