use std::sync::Arc;

use rag_config::Config;
use rag_service::{AnswerService, Components};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AnswerService>,
	/// Bearer token every request must present. `None` disables the check.
	pub auth_token: Option<String>,
}
impl AppState {
	pub async fn new(config: &Config) -> color_eyre::Result<Self> {
		let components = Components::from_config(config).await?;

		Ok(Self::from_parts(components.answer_service(), config.security.api_auth_token.clone()))
	}

	pub fn from_parts(service: AnswerService, auth_token: Option<String>) -> Self {
		Self { service: Arc::new(service), auth_token }
	}
}
