use std::collections::{HashMap, HashSet};

use super::cache::CompiledPattern;
use super::compiler::{Condition, QueryMap};

/// Accumulates source texts and evaluates the compiler's queries against
/// them. Single-threaded, deterministic, and safe to drive across several
/// `find_matches` calls as more sources arrive: the matched set only grows.
pub struct Matcher {
    queries: QueryMap,
    sources: HashSet<String>,
    matched: HashSet<String>,
}

impl Matcher {
    pub fn new(queries: QueryMap) -> Self {
        Self {
            queries,
            sources: HashSet::new(),
            matched: HashSet::new(),
        }
    }

    /// Adds a source text. Both the raw text and a comment-stripped copy are
    /// stored (deduplicated against whatever is already present), since
    /// either copy may be the one a pattern actually matches against.
    pub fn add_source(&mut self, text: impl Into<String>) {
        let text = text.into();
        let stripped = strip_comments(&text);
        self.sources.insert(text);
        self.sources.insert(stripped);
    }

    /// Evaluates every query not yet matched. A query matches as soon as any
    /// one of its conditions has every pattern match some stored source.
    /// Each pattern is evaluated against the source set at most once per
    /// call, regardless of how many conditions/queries reference it.
    pub fn find_matches(&mut self) {
        let mut pattern_cache: HashMap<usize, bool> = HashMap::new();

        for (name, compiled) in self.queries.iter() {
            if self.matched.contains(name) {
                continue;
            }
            if compiled
                .conditions
                .iter()
                .any(|condition| condition_matches(condition, &self.sources, &mut pattern_cache))
            {
                self.matched.insert(name.clone());
            }
        }
    }

    /// The current matched-query set. Grows monotonically across calls to
    /// `find_matches`; never shrinks.
    pub fn matched_results(&self) -> &HashSet<String> {
        &self.matched
    }
}

fn condition_matches(
    condition: &Condition,
    sources: &HashSet<String>,
    pattern_cache: &mut HashMap<usize, bool>,
) -> bool {
    condition
        .patterns
        .iter()
        .all(|pattern| pattern_matches_any_source(pattern, sources, pattern_cache))
}

fn pattern_matches_any_source(
    pattern: &std::sync::Arc<CompiledPattern>,
    sources: &HashSet<String>,
    pattern_cache: &mut HashMap<usize, bool>,
) -> bool {
    let key = pattern.identity();
    if let Some(&matched) = pattern_cache.get(&key) {
        return matched;
    }

    let matched = sources.iter().any(|source| match pattern.regex.is_match(source) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("pattern {:?} failed to evaluate: {e}", pattern.source);
            false
        }
    });

    pattern_cache.insert(key, matched);
    matched
}

/// Strips `//` line comments and `/* */` block comments from script source.
/// Intentionally lexical, not a real tokenizer: it can be fooled by `//`
/// inside a string or regex literal. A `//` immediately preceded by `:` is
/// left alone so URLs like `http://example.com` survive. The raw source is
/// always kept alongside the stripped copy so a wrong strip never loses a
/// match outright.
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            let preceded_by_colon = i > 0 && chars[i - 1] == ':';
            if preceded_by_colon {
                out.push(c);
                i += 1;
                continue;
            }
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && i + 1 < chars.len() && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compiler::Compiler;

    #[test]
    fn strip_comments_removes_line_comments() {
        assert_eq!(strip_comments("a // b\nc"), "a \nc");
    }

    #[test]
    fn strip_comments_preserves_urls() {
        assert_eq!(strip_comments("http://example.com"), "http://example.com");
    }

    #[test]
    fn strip_comments_removes_block_comments() {
        assert_eq!(strip_comments("a/*b\nc*/d"), "ad");
    }

    #[test]
    fn matcher_matches_literal_api_call() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();
        compiler.add_query("storage.local.get").unwrap();
        compiler
            .add_query("storage.sync.onChanged.addListener")
            .unwrap();

        let mut matcher = compiler.new_matcher();
        matcher.add_source("function run() { browser.tabs.create({}); }");
        matcher.find_matches();

        let matched = matcher.matched_results();
        assert!(matched.contains("tabs.create"));
        assert!(!matched.contains("storage.local.get"));
    }

    #[test]
    fn matcher_accumulates_matches_across_calls() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();
        compiler.add_query("storage.local.get").unwrap();

        let mut matcher = compiler.new_matcher();
        matcher.add_source("browser.tabs.create({});");
        matcher.find_matches();
        assert_eq!(matcher.matched_results().len(), 1);

        matcher.add_source("chrome.storage.local.get({});");
        matcher.find_matches();
        assert_eq!(matcher.matched_results().len(), 2);
    }

    #[test]
    fn matcher_results_never_shrink() {
        let compiler = Compiler::new();
        compiler.add_query("tabs.create").unwrap();

        let mut matcher = compiler.new_matcher();
        matcher.add_source("browser.tabs.create({});");
        matcher.find_matches();
        let before = matcher.matched_results().clone();
        matcher.add_source("unrelated text with no apis");
        matcher.find_matches();
        let after = matcher.matched_results();
        assert!(before.is_subset(after));
    }

    #[test]
    fn first_part_aliased_condition_requires_host_root() {
        let compiler = Compiler::new();
        compiler.add_query("ns.api").unwrap();

        let matched_with_root = {
            let mut m = compiler.new_matcher();
            m.add_source("alias=chrome.ns; alias.api");
            m.find_matches();
            m.matched_results().contains("ns.api")
        };
        assert!(matched_with_root);

        let matched_without_root = {
            let mut m = compiler.new_matcher();
            m.add_source("alias=ns; alias.api");
            m.find_matches();
            m.matched_results().contains("ns.api")
        };
        assert!(!matched_without_root);
    }

    #[test]
    fn three_part_alias_chain_is_not_followed() {
        let compiler = Compiler::new();
        compiler.add_query("ns.api.third").unwrap();

        let mut m = compiler.new_matcher();
        m.add_source("x=chrome.ns; y=x.api; y.third");
        m.find_matches();
        assert!(!m.matched_results().contains("ns.api.third"));
    }

    #[test]
    fn comment_split_dot_still_matches_after_stripping() {
        let compiler = Compiler::new();
        compiler.add_query("ns.api").unwrap();

        let mut m = compiler.new_matcher();
        m.add_source("ns/**/./*x*/api");
        m.find_matches();
        assert!(m.matched_results().contains("ns.api"));
    }

    #[test]
    fn nullish_coalescing_is_not_a_property_access() {
        let compiler = Compiler::new();
        compiler.add_query("ns.api").unwrap();

        let mut m = compiler.new_matcher();
        m.add_source("ns ?? .api");
        m.find_matches();
        assert!(!m.matched_results().contains("ns.api"));
    }

    #[test]
    fn optional_chaining_is_a_valid_property_access() {
        let compiler = Compiler::new();
        compiler.add_query("ns.api").unwrap();

        let mut m = compiler.new_matcher();
        m.add_source("ns?.api");
        m.find_matches();
        assert!(m.matched_results().contains("ns.api"));
    }
}
