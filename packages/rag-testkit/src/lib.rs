pub mod doubles;

mod error;

pub use doubles::{
	CharCodec, CountingEmbedding, FailingChat, FailingEmbedding, FailingRerank, HangingChat,
	HashEmbedding, ScriptedChat, StaticRerank,
};
pub use error::{Error, Result};

use std::{env, time::Duration};

use qdrant_client::Qdrant;
use tokio::time;
use uuid::Uuid;

pub fn env_qdrant_url() -> Option<String> {
	env::var("RAG_QDRANT_URL").ok()
}

/// Uniquely named Qdrant collection for one test. Call `cleanup` once the test is done with it.
pub struct TestCollection {
	name: String,
	cleaned: bool,
}
impl TestCollection {
	pub fn new(prefix: &str) -> Self {
		Self { name: format!("{prefix}_{}", Uuid::new_v4().simple()), cleaned: false }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn cleanup(mut self) -> Result<()> {
		let Some(url) = env_qdrant_url() else {
			return Ok(());
		};
		let client = Qdrant::from_url(&url)
			.build()
			.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
		let timeout = Duration::from_secs(10);
		let exists = time::timeout(timeout, client.collection_exists(&self.name))
			.await
			.map_err(|_| Error::Message("Qdrant collection_exists timed out.".to_string()))??;

		if exists {
			time::timeout(timeout, client.delete_collection(self.name.clone())).await.map_err(|_| {
				Error::Message(format!("Timed out deleting Qdrant collection {:?}.", self.name))
			})??;
		}

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if !self.cleaned {
			eprintln!("Qdrant test collection {:?} was left behind.", self.name);
		}
	}
}
