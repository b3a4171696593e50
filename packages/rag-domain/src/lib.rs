pub mod chunk;
pub mod namespace;

mod error;

pub use chunk::{Chunk, DocumentBatch, IngestParams};
pub use error::{Error, Result};
pub use namespace::Namespace;
