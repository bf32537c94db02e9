use thiserror::Error;

/// Errors raised by the query engine itself, as opposed to driver-level I/O
/// or configuration problems (those stay `anyhow::Error` at the CLI layer).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller used the engine API in a way its contract forbids, e.g.
    /// adding a query to a compiler that has already vended an async matcher.
    #[error("misuse: {0}")]
    Misuse(String),

    /// A worker's matcher thread panicked while evaluating a batch of
    /// sources. The worker that crashed is retired; this error only affects
    /// the task it was processing.
    #[error("worker crashed while evaluating a batch of sources")]
    WorkerCrashed,

    /// `matched_results` was called on an async matcher before its
    /// `find_matches` future resolved.
    #[error("matched results requested before find_matches resolved")]
    ResultsNotReady,
}
