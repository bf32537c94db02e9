use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;

/// A single compiled pattern plus the source it was built from. Cheap to
/// clone (it's always held behind an `Arc`); identity is what matters for
/// the matcher's per-call memoization, not equality of source strings.
pub struct CompiledPattern {
    pub source: String,
    pub regex: Regex,
}

impl CompiledPattern {
    /// A stable identity usable as a hash key for the duration of a single
    /// `find_matches` call. Valid as long as the `Arc` it came from is kept
    /// alive by the caller.
    pub fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

/// Interns pattern source strings to a single compiled instance, mirroring
/// the regex-build cache the text search strategy keeps, but keyed on the
/// pattern body rather than a user query plus search options.
#[derive(Default)]
pub struct PatternCache {
    patterns: HashMap<String, Arc<CompiledPattern>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    /// Returns the cached pattern for `source`, compiling and inserting it
    /// if this is the first time it's been requested.
    pub fn intern(&mut self, source: &str) -> Arc<CompiledPattern> {
        if let Some(existing) = self.patterns.get(source) {
            return Arc::clone(existing);
        }

        let regex = Regex::new(source)
            .unwrap_or_else(|e| panic!("generated pattern source failed to compile: {source}: {e}"));
        let compiled = Arc::new(CompiledPattern {
            source: source.to_string(),
            regex,
        });
        self.patterns.insert(source.to_string(), Arc::clone(&compiled));
        compiled
    }
}
