use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::async_matcher::AsyncMatcher;
use super::cache::{CompiledPattern, PatternCache};
use super::error::EngineError;
use super::fragments;
use super::matcher::Matcher;
use super::worker_pool::PoolInner;

/// A conjunction of patterns. A condition matches a set of source texts iff
/// every one of its patterns matches at least one of them.
#[derive(Clone)]
pub struct Condition {
    pub patterns: Vec<Arc<CompiledPattern>>,
}

/// The compiled form of one API query: an ordered list of conditions, any
/// one of which is sufficient for the query to be considered matched.
#[derive(Clone)]
pub struct CompiledQuery {
    pub conditions: Vec<Condition>,
}

pub type QueryMap = Arc<HashMap<String, CompiledQuery>>;

struct CompilerState {
    queries: QueryMap,
    cache: PatternCache,
    frozen: bool,
    pool: Option<Arc<PoolInner>>,
}

/// Translates dotted API names into [`CompiledQuery`] values and interns
/// their patterns. Queries can be added freely until the first async matcher
/// is vended, at which point the compiler freezes (workers hold a snapshot
/// of the query map and must not see it drift underneath them).
pub struct Compiler {
    state: Mutex<CompilerState>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CompilerState {
                queries: Arc::new(HashMap::new()),
                cache: PatternCache::new(),
                frozen: false,
                pool: None,
            }),
        }
    }

    /// Adds a query to the compiler. Duplicate queries are ignored with a
    /// logged warning, not an error. Fails if an async matcher has already
    /// been vended.
    pub fn add_query(&self, query: impl Into<String>) -> Result<(), EngineError> {
        let query = query.into();
        let mut state = self.state.lock().expect("compiler mutex poisoned");

        if state.frozen {
            return Err(EngineError::Misuse(format!(
                "cannot add query {query:?}: compiler is frozen after vending an async matcher"
            )));
        }

        if state.queries.contains_key(&query) {
            log::warn!("ignoring duplicate query: {query}");
            return Ok(());
        }

        let compiled = compile_query(&query, &mut state.cache);
        let mut queries = (*state.queries).clone();
        queries.insert(query, compiled);
        state.queries = Arc::new(queries);
        Ok(())
    }

    /// Vends a synchronous matcher sharing the compiler's current query
    /// snapshot. Safe to call any number of times, before or after freezing.
    pub fn new_matcher(&self) -> Matcher {
        let state = self.state.lock().expect("compiler mutex poisoned");
        Matcher::new(Arc::clone(&state.queries))
    }

    /// Vends an async matcher. Lazily spins up the worker pool on first
    /// call and freezes the compiler against further `add_query` calls.
    pub fn new_async_matcher(&self) -> AsyncMatcher {
        let mut state = self.state.lock().expect("compiler mutex poisoned");
        state.frozen = true;
        let queries = Arc::clone(&state.queries);
        let pool = match &state.pool {
            Some(pool) => Arc::clone(pool),
            None => {
                let pool = PoolInner::new(queries);
                state.pool = Some(Arc::clone(&pool));
                pool
            }
        };
        AsyncMatcher::new(pool)
    }

    /// Tears down the worker pool, if one was ever created. A no-op for
    /// compilers that only ever vended synchronous matchers.
    pub fn shutdown(&self) {
        let pool = {
            let state = self.state.lock().expect("compiler mutex poisoned");
            state.pool.clone()
        };
        if let Some(pool) = pool {
            pool.shutdown();
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_query(query: &str, cache: &mut PatternCache) -> CompiledQuery {
    let parts: Vec<String> = query.split('.').map(str::to_string).collect();
    let n = parts.len();
    let has_root = n >= 1 && (parts[0] == "browser" || parts[0] == "chrome");

    let mut conditions = Vec::with_capacity(4);

    // Condition 1: literal, always emitted.
    conditions.push(single_pattern_condition(
        cache,
        &fragments::any(&fragments::body(&parts, 0, n)),
    ));

    // Condition 2: first part aliased, only when n >= 2 and the query does
    // not already start at the platform root.
    if n >= 2 && !has_root {
        let assignment = fragments::rhs(&format!("{}{}", fragments::host_dot(), fragments::escape_literal(&parts[0])));
        let dereference = fragments::dot(&fragments::body(&parts, 1, n));
        conditions.push(two_pattern_condition(cache, &assignment, &dereference));
    }

    // Condition 3: first two parts aliased, only when n >= 3.
    if n >= 3 {
        let assignment = fragments::rhs(&fragments::body(&parts, 0, 2));
        let dereference = fragments::dot(&fragments::body(&parts, 2, n));
        conditions.push(two_pattern_condition(cache, &assignment, &dereference));
    }

    // Condition 4: first three parts aliased, only when n >= 4.
    if n >= 4 {
        let assignment = fragments::rhs(&fragments::body(&parts, 0, 3));
        let dereference = fragments::dot(&fragments::body(&parts, 3, n));
        conditions.push(two_pattern_condition(cache, &assignment, &dereference));
    }

    CompiledQuery { conditions }
}

fn single_pattern_condition(cache: &mut PatternCache, source: &str) -> Condition {
    Condition {
        patterns: vec![cache.intern(source)],
    }
}

fn two_pattern_condition(cache: &mut PatternCache, a: &str, b: &str) -> Condition {
    Condition {
        patterns: vec![cache.intern(a), cache.intern(b)],
    }
}
