use std::{sync::Arc, time::Duration};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::util::ServiceExt;

use rag_api::{routes, state::AppState};
use rag_domain::{Chunk, DocumentBatch, Namespace};
use rag_providers::{ChatProvider, Embedder};
use rag_service::{AnswerService, AnswerSettings, ChatGenerator, Reranker};
use rag_storage::{MemoryStore, VectorStore};
use rag_testkit::{FailingChat, HangingChat, HashEmbedding, ScriptedChat};

const DIM: u32 = 32;

async fn app_with(chat: Arc<dyn ChatProvider>, auth_token: Option<&str>) -> Router {
	let embedder = Arc::new(Embedder::new(Arc::new(HashEmbedding::new(DIM)), DIM));
	let store = VectorStore::Memory(
		MemoryStore::new(DIM, embedder).expect("Expected matching dimensions."),
	);
	let batch = DocumentBatch {
		source: "france.md".to_string(),
		chunks: vec![Chunk {
			id: "france_0".to_string(),
			text: "Paris is the capital of France.".to_string(),
			index: 0,
			source: "france.md".to_string(),
		}],
	};
	let namespace = Namespace::new("alice").expect("Expected valid namespace.");

	store.upsert(&batch, &namespace).await.expect("Seeding failed.");

	let service = AnswerService::new(
		Arc::new(store),
		Arc::new(Reranker::init(None, None).await),
		Arc::new(ChatGenerator::new(chat, 1_000, 0.0)),
		AnswerSettings { request_timeout: Duration::from_millis(200), ..Default::default() },
	);

	routes::router(AppState::from_parts(service, auth_token.map(ToString::to_string)))
}

fn ask_request(body: Value, token: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri("/v1/rag/ask")
		.header(header::CONTENT_TYPE, "application/json");

	if let Some(token) = token {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
	}

	builder.body(Body::from(body.to_string())).expect("Failed to build request.")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Expected a JSON body.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let app = app_with(Arc::new(ScriptedChat::new("unused")), None).await;
	let request =
		Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request.");
	let (status, _) = send(app, request).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ask_wraps_plain_answer() {
	let app = app_with(Arc::new(ScriptedChat::new("Paris.")), None).await;
	let body = serde_json::json!({ "query": "What is the capital of France?", "user_id": "alice" });
	let (status, json) = send(app, ask_request(body, None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json, serde_json::json!({ "answer": "Paris." }));
}

#[tokio::test]
async fn ask_with_trace_returns_chunks() {
	let app = app_with(Arc::new(ScriptedChat::new("Paris.")), None).await;
	let body = serde_json::json!({
		"query": "capital of France",
		"user_id": "alice",
		"k": 3,
		"trace": true,
	});
	let (status, json) = send(app, ask_request(body, None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["answer"], "Paris.");
	assert_eq!(json["chunks"][0]["id"], "france_0");
	assert_eq!(json["chunks"][0]["source"], "france.md");
}

#[tokio::test]
async fn bearer_token_is_enforced() {
	let body = serde_json::json!({ "query": "q", "user_id": "alice" });
	let cases = [(None, StatusCode::UNAUTHORIZED), (Some("wrong"), StatusCode::UNAUTHORIZED)];

	for (token, expected) in cases {
		let app = app_with(Arc::new(ScriptedChat::new("ok")), Some("secret")).await;
		let (status, json) = send(app, ask_request(body.clone(), token)).await;

		assert_eq!(status, expected);
		assert_eq!(json["error_code"], "unauthorized");
	}

	let app = app_with(Arc::new(ScriptedChat::new("ok")), Some("secret")).await;
	let (status, _) = send(app, ask_request(body, Some("secret"))).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_request_is_400() {
	let app = app_with(Arc::new(ScriptedChat::new("ok")), None).await;
	let body = serde_json::json!({ "query": "q", "user_id": "alice", "k": 0 });
	let (status, json) = send(app, ask_request(body, None)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
	assert!(json["message"].as_str().is_some_and(|message| message.contains("k must")));
}

#[tokio::test]
async fn generation_failure_is_502() {
	let app = app_with(Arc::new(FailingChat), None).await;
	let body = serde_json::json!({ "query": "q", "user_id": "alice" });
	let (status, json) = send(app, ask_request(body, None)).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "generation_failed");
}

#[tokio::test]
async fn deadline_is_504() {
	let app = app_with(Arc::new(HangingChat), None).await;
	let body = serde_json::json!({ "query": "q", "user_id": "alice" });
	let (status, json) = send(app, ask_request(body, None)).await;

	assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
	assert_eq!(json["error_code"], "timeout");
}
