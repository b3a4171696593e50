pub mod answer;
pub mod bootstrap;
pub mod expansion;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod rerank;

mod error;

pub use answer::{AnswerOutput, AnswerRequest, AnswerService, AnswerSettings, AnswerTrace};
pub use bootstrap::Components;
pub use error::{Error, Result};
pub use expansion::{ChatExpansion, QueryExpansion};
pub use extract::{ExtractorRegistry, PlainTextExtractor, TextExtractor};
pub use generation::{AnswerGenerator, ChatGenerator};
pub use ingest::{IngestItem, IngestReport, Ingestor};
pub use rerank::{RerankMode, Reranker};
