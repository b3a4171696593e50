use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use rag_config::LlmProviderConfig;
use rag_providers::{Error, HttpChat};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		rag_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn forwards_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-team".to_string(), Value::String("search".to_string()));

	let headers =
		rag_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-team").expect("Missing default header."), "search");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = rag_providers::auth_headers("secret", &defaults)
		.expect_err("Expected invalid header error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn chat_client_builds_from_config() {
	let cfg = LlmProviderConfig {
		provider_id: "p".to_string(),
		api_base: "http://localhost".to_string(),
		api_key: "key".to_string(),
		path: "/chat/completions".to_string(),
		model: "m".to_string(),
		temperature: 0.0,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	};

	assert!(HttpChat::new(&cfg).is_ok());
}
