//! social-daemon adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `platforms`: One HTTP sender per social platform
//! - `content`: Content pool, LLM generators, fallback chaining
//! - `halt`: Sentinel-file halt signal
//! - `outbox`: JSONL sender used for dry runs
//! - `stub`: Scripted sender for offline runs and tests

pub mod content;
pub mod halt;
mod http;
pub mod outbox;
pub mod platforms;
pub mod stub;

pub use http::DEFAULT_TIMEOUT;
