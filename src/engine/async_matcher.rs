use std::collections::HashSet;
use std::sync::Arc;

use super::error::EngineError;
use super::worker_pool::PoolInner;

enum ResultSlot {
    Pending,
    Ready(HashSet<String>),
    Errored(EngineError),
}

/// Mirrors [`crate::engine::matcher::Matcher`]'s surface, but `find_matches`
/// hands the accumulated sources to a worker and returns a future. Does not
/// strip comments itself — that happens inside the worker's synchronous
/// `Matcher`, so the two flavors share identical matching semantics.
pub struct AsyncMatcher {
    pool: Arc<PoolInner>,
    pending_sources: Vec<String>,
    result: ResultSlot,
}

impl AsyncMatcher {
    pub(crate) fn new(pool: Arc<PoolInner>) -> Self {
        Self {
            pool,
            pending_sources: Vec::new(),
            result: ResultSlot::Pending,
        }
    }

    pub fn add_source(&mut self, text: impl Into<String>) {
        self.pending_sources.push(text.into());
    }

    /// Submits the accumulated sources to the worker pool and awaits the
    /// result. Safe to call only once per batch of sources; calling it again
    /// submits whatever has been added since (mirroring the sync matcher's
    /// repeat-call contract).
    pub async fn find_matches(&mut self) -> Result<(), EngineError> {
        let sources = std::mem::take(&mut self.pending_sources);
        let receiver = self.pool.submit(sources);

        match receiver.await {
            Ok(Ok(matched)) => {
                self.result = ResultSlot::Ready(matched);
                Ok(())
            }
            Ok(Err(e)) => {
                self.result = ResultSlot::Errored(EngineError::WorkerCrashed);
                Err(e)
            }
            Err(_) => {
                let err = EngineError::WorkerCrashed;
                self.result = ResultSlot::Errored(EngineError::WorkerCrashed);
                Err(err)
            }
        }
    }

    /// The matched-query set from the most recent resolved `find_matches`
    /// call. Fails with [`EngineError::ResultsNotReady`] if no call has
    /// resolved yet.
    pub fn matched_results(&self) -> Result<&HashSet<String>, EngineError> {
        match &self.result {
            ResultSlot::Ready(set) => Ok(set),
            ResultSlot::Errored(_) => Err(EngineError::ResultsNotReady),
            ResultSlot::Pending => Err(EngineError::ResultsNotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compiler::Compiler;

    #[tokio::test]
    async fn async_matcher_matches_like_the_sync_one() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();

        let mut matcher = compiler.new_async_matcher();
        matcher.add_source("browser.tabs.create({});");
        matcher.find_matches().await.unwrap();

        assert!(matcher.matched_results().unwrap().contains("tabs.create"));
        compiler.shutdown();
    }

    #[tokio::test]
    async fn results_not_ready_before_resolution() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();
        let matcher = compiler.new_async_matcher();

        assert!(matches!(
            matcher.matched_results(),
            Err(EngineError::ResultsNotReady)
        ));
        compiler.shutdown();
    }

    #[tokio::test]
    async fn adding_a_query_after_vending_an_async_matcher_is_rejected() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();
        let _matcher = compiler.new_async_matcher();

        let result = compiler.add_query("storage.local.get");
        assert!(matches!(result, Err(EngineError::Misuse(_))));
        compiler.shutdown();
    }
}
