use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

use rag_domain::{Chunk, DocumentBatch, Namespace};
use rag_providers::{BoxFuture, Embedder};
use rag_service::{
	AnswerGenerator, AnswerOutput, AnswerRequest, AnswerService, AnswerSettings, ChatExpansion,
	ChatGenerator, Error, QueryExpansion, Reranker, Result,
};
use rag_storage::{MemoryStore, VectorStore};
use rag_testkit::{CountingEmbedding, HangingChat, HashEmbedding, ScriptedChat, StaticRerank};

const DIM: u32 = 64;

/// Replies `answer:{query}:{first passage}` and remembers every context it saw.
#[derive(Default)]
struct EchoGenerator {
	contexts: Mutex<Vec<Vec<String>>>,
}
impl EchoGenerator {
	fn last_context(&self) -> Vec<String> {
		self.contexts.lock().expect("Lock poisoned.").last().cloned().unwrap_or_default()
	}
}
impl AnswerGenerator for EchoGenerator {
	fn generate<'a>(
		&'a self,
		query: &'a str,
		context: &'a [String],
	) -> BoxFuture<'a, Result<String>> {
		self.contexts.lock().expect("Lock poisoned.").push(context.to_vec());

		let first = context.first().cloned().unwrap_or_default();

		Box::pin(async move { Ok(format!("answer:{query}:{first}")) })
	}
}

struct FixedExpansion(Vec<String>);
impl QueryExpansion for FixedExpansion {
	fn expand<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		let queries = self.0.clone();

		Box::pin(async move { Ok(queries) })
	}
}

fn ns(raw: &str) -> Namespace {
	Namespace::new(raw).expect("Expected valid namespace.")
}

fn chunk(id: &str, text: &str) -> Chunk {
	Chunk { id: id.to_string(), text: text.to_string(), index: 0, source: "notes.md".to_string() }
}

fn request(query: &str, k: Option<u32>, trace: bool) -> AnswerRequest {
	AnswerRequest { query: query.to_string(), user_id: "u".to_string(), k, trace }
}

async fn seeded_store(
	provider: Arc<dyn rag_providers::EmbeddingProvider>,
	chunks: Vec<Chunk>,
) -> Arc<VectorStore> {
	let embedder = Arc::new(Embedder::new(provider, DIM));
	let memory = MemoryStore::new(DIM, embedder).expect("Expected matching dimensions.");
	let store = VectorStore::Memory(memory);
	let batch = DocumentBatch { source: "notes.md".to_string(), chunks };

	store.upsert(&batch, &ns("u")).await.expect("Seeding failed.");

	Arc::new(store)
}

async fn pass_through() -> Arc<Reranker> {
	Arc::new(Reranker::init(None, None).await)
}

fn settings() -> AnswerSettings {
	AnswerSettings { default_k: 8, max_queries: 4, request_timeout: Duration::from_secs(5) }
}

fn trace_ids(output: &AnswerOutput) -> Vec<String> {
	match output {
		AnswerOutput::Traced(trace) => trace.chunks.iter().map(|chunk| chunk.id.clone()).collect(),
		AnswerOutput::Plain(_) => panic!("Expected a traced answer."),
	}
}

#[tokio::test]
async fn answers_from_the_only_chunk() {
	let store = seeded_store(Arc::new(HashEmbedding::new(DIM)), vec![chunk("c", "ctx")]).await;
	let service = AnswerService::new(
		store,
		pass_through().await,
		Arc::new(EchoGenerator::default()),
		settings(),
	);
	let output = service.answer(request("q", Some(1), false)).await.expect("Answer failed.");

	assert_eq!(output, AnswerOutput::Plain("answer:q:ctx".to_string()));
}

#[tokio::test]
async fn chunk_hit_by_several_queries_is_kept_once() {
	let store = seeded_store(
		Arc::new(HashEmbedding::new(DIM)),
		vec![chunk("x", "rust ownership rules"), chunk("y", "bananas are yellow")],
	)
	.await;
	let expansion =
		FixedExpansion(vec!["rust ownership".to_string(), "ownership rules".to_string()]);
	let service = AnswerService::new(
		store,
		pass_through().await,
		Arc::new(EchoGenerator::default()),
		settings(),
	)
	.with_expansion(Arc::new(expansion));
	let output = service
		.answer(request("rules of ownership in rust", Some(10), true))
		.await
		.expect("Answer failed.");
	let ids = trace_ids(&output);

	assert_eq!(ids.len(), 2);
	assert_eq!(ids.iter().filter(|id| *id == "x").count(), 1);
	// Original query results come first.
	assert_eq!(ids[0], "x");
}

#[tokio::test]
async fn malformed_expansion_falls_back_to_original_query() {
	let provider = Arc::new(CountingEmbedding::new(Arc::new(HashEmbedding::new(DIM))));
	let store = seeded_store(provider.clone(), vec![chunk("c", "ctx")]).await;
	let chat = Arc::new(ScriptedChat::new("not json"));
	let service = AnswerService::new(
		store,
		pass_through().await,
		Arc::new(EchoGenerator::default()),
		settings(),
	)
	.with_expansion(Arc::new(ChatExpansion::new(chat.clone(), 3, 0.7)));
	let calls_before = provider.calls();
	let output = service.answer(request("q", Some(1), false)).await.expect("Answer failed.");

	assert_eq!(output.answer(), "answer:q:ctx");
	assert_eq!(chat.calls(), 1);
	assert_eq!(provider.calls() - calls_before, 1);
}

#[tokio::test]
async fn query_set_is_capped() {
	let provider = Arc::new(CountingEmbedding::new(Arc::new(HashEmbedding::new(DIM))));
	let store = seeded_store(provider.clone(), vec![chunk("c", "ctx")]).await;
	let expansion = FixedExpansion((0..10).map(|i| format!("variant {i}")).collect());
	let service = AnswerService::new(
		store,
		pass_through().await,
		Arc::new(EchoGenerator::default()),
		AnswerSettings { max_queries: 2, ..settings() },
	)
	.with_expansion(Arc::new(expansion));
	let calls_before = provider.calls();

	service.answer(request("q", None, false)).await.expect("Answer failed.");

	assert_eq!(provider.calls() - calls_before, 2);
}

#[tokio::test]
async fn context_follows_rerank_order_and_k() {
	let store = seeded_store(
		Arc::new(HashEmbedding::new(DIM)),
		vec![chunk("a", "alpha"), chunk("b", "beta"), chunk("c", "gamma")],
	)
	.await;
	let expansion = FixedExpansion(vec!["beta".to_string(), "gamma".to_string()]);
	let reranker = Reranker::init(Some(Arc::new(StaticRerank::new(vec![0.1, 0.9, 0.5]))), None)
		.await;
	let generator = Arc::new(EchoGenerator::default());
	let service =
		AnswerService::new(store, Arc::new(reranker), generator.clone(), settings())
			.with_expansion(Arc::new(expansion));
	let output = service.answer(request("alpha", Some(1), true)).await.expect("Answer failed.");
	let ids = trace_ids(&output);

	assert_eq!(ids.len(), 1);
	assert_eq!(generator.last_context().len(), 1);

	match output {
		AnswerOutput::Traced(trace) => {
			assert_eq!(generator.last_context()[0], trace.chunks[0].text);
			assert_eq!(trace.answer, format!("answer:alpha:{}", trace.chunks[0].text));
		},
		AnswerOutput::Plain(_) => panic!("Expected a traced answer."),
	}
}

#[tokio::test]
async fn empty_namespace_still_reaches_generation() {
	let store = seeded_store(Arc::new(HashEmbedding::new(DIM)), vec![chunk("c", "ctx")]).await;
	let generator = Arc::new(EchoGenerator::default());
	let service = AnswerService::new(store, pass_through().await, generator.clone(), settings());
	let output = service
		.answer(AnswerRequest {
			query: "q".to_string(),
			user_id: "someone-else".to_string(),
			k: None,
			trace: true,
		})
		.await
		.expect("Answer failed.");

	assert!(trace_ids(&output).is_empty());
	assert!(generator.last_context().is_empty());
}

#[tokio::test]
async fn context_is_truncated_before_generation() {
	let store = seeded_store(
		Arc::new(HashEmbedding::new(DIM)),
		vec![chunk("c", "abcdefghijklmnopqrstuvwxyz")],
	)
	.await;
	let chat = Arc::new(ScriptedChat::new("  done  "));
	let generator = Arc::new(ChatGenerator::new(chat.clone(), 10, 0.0));
	let service = AnswerService::new(store, pass_through().await, generator, settings());
	let output = service.answer(request("letters", None, false)).await.expect("Answer failed.");
	let user = chat.last_user_content().expect("Expected a user message.");

	assert_eq!(output.answer(), "done");
	assert!(user.contains("abcdefghij"));
	assert!(!user.contains("abcdefghijk"));
}

#[tokio::test]
async fn slow_generation_times_out() {
	let store = seeded_store(Arc::new(HashEmbedding::new(DIM)), vec![chunk("c", "ctx")]).await;
	let generator = Arc::new(ChatGenerator::new(Arc::new(HangingChat), 1_000, 0.0));
	let service = AnswerService::new(
		store,
		pass_through().await,
		generator,
		AnswerSettings { request_timeout: Duration::from_millis(50), ..settings() },
	);
	let err = service.answer(request("q", None, false)).await.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Timeout { timeout_ms: 50 }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
	let store = seeded_store(Arc::new(HashEmbedding::new(DIM)), vec![chunk("c", "ctx")]).await;
	let service = AnswerService::new(
		store,
		pass_through().await,
		Arc::new(EchoGenerator::default()),
		settings(),
	);
	let blank_namespace = AnswerRequest {
		query: "q".to_string(),
		user_id: "  ".to_string(),
		k: None,
		trace: false,
	};

	for request in [request("   ", None, false), request("q", Some(0), false), blank_namespace] {
		let err = service.answer(request).await.expect_err("Expected rejection.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
	}
}
