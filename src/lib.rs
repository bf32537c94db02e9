//! Bulk static analysis of browser extension corpora for extension-platform
//! API usage. The [`engine`] module is the reusable core: compile a list of
//! dotted API names and match them against script source text, either
//! synchronously or through a worker pool. [`driver`] wires that core up to
//! a CLI.

pub mod driver;
pub mod engine;
