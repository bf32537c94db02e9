//! The CLI binary's glue: argument parsing and the stdin-to-stdout pipeline
//! that exercises the query engine against a corpus of extension roots.

pub mod cli;
pub mod pipeline;
pub mod stub_filters;
