//! The API query engine: compiles dotted extension-API names into lexical
//! patterns and matches them against script source text, synchronously or
//! via a worker pool.

pub mod async_matcher;
pub mod cache;
pub mod compiler;
pub mod error;
mod fragments;
pub mod matcher;
pub mod worker_pool;

pub use async_matcher::AsyncMatcher;
pub use compiler::{CompiledQuery, Compiler, Condition};
pub use error::EngineError;
pub use matcher::Matcher;
