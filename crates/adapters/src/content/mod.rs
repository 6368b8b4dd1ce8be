//! Content sources: file-backed pool, LLM generators, and fallback chaining

mod fallback;
pub mod llm;
mod pool;

pub use fallback::FallbackContent;
pub use pool::{ContentPool, PoolEntry, PoolError};
