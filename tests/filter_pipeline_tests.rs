//! Black-box coverage of the engine's two matcher flavors against realistic
//! script fixtures, mirroring how the CLI driver would actually exercise
//! them (read files, build one matcher per extension, check the result).

use std::fs;

use webext_api_finder::engine::Compiler;

fn write_fixture(dir: &std::path::Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn sync_matcher_finds_literal_and_aliased_calls_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        &dir.path(),
        "background.js",
        "browser.tabs.create({ url: 'https://example.com' });",
    );
    write_fixture(
        &dir.path(),
        "content.js",
        "let s = chrome.storage; s.local.get(['key'], cb);",
    );

    let compiler = Compiler::new();
    compiler.add_query("tabs.create").unwrap();
    compiler.add_query("storage.local.get").unwrap();
    compiler
        .add_query("storage.sync.onChanged.addListener")
        .unwrap();

    let mut matcher = compiler.new_matcher();
    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        matcher.add_source(fs::read_to_string(path).unwrap());
    }
    matcher.find_matches();

    let matched = matcher.matched_results();
    assert!(matched.contains("tabs.create"));
    assert!(matched.contains("storage.local.get"));
    assert!(!matched.contains("storage.sync.onChanged.addListener"));
}

#[tokio::test]
async fn async_matcher_agrees_with_sync_matcher_on_the_same_sources() {
    let source = "const t = browser.tabs; t.create({});";

    let compiler = Compiler::new();
    compiler.add_query("tabs.create").unwrap();

    let sync_matched = {
        let mut matcher = compiler.new_matcher();
        matcher.add_source(source);
        matcher.find_matches();
        matcher.matched_results().clone()
    };

    let async_matched = {
        let mut matcher = compiler.new_async_matcher();
        matcher.add_source(source);
        matcher.find_matches().await.unwrap();
        matcher.matched_results().unwrap().clone()
    };

    assert_eq!(sync_matched, async_matched);
    compiler.shutdown();
}

#[tokio::test]
async fn worker_pool_grows_lazily_and_settles_back_to_idle() {
    let compiler = Compiler::new();
    compiler.add_query("tabs.create").unwrap();

    std::env::set_var("WE_API_FINDER_NUM_THREADS", "3");

    let mut matchers = Vec::new();
    for _ in 0..6 {
        let mut matcher = compiler.new_async_matcher();
        matcher.add_source("browser.tabs.create({});");
        matchers.push(matcher);
    }

    for matcher in matchers.iter_mut() {
        matcher.find_matches().await.unwrap();
    }

    for matcher in &matchers {
        assert!(matcher.matched_results().unwrap().contains("tabs.create"));
    }

    std::env::remove_var("WE_API_FINDER_NUM_THREADS");
    compiler.shutdown();
}

#[test]
fn compiler_rejects_new_queries_after_freezing() {
    let compiler = Compiler::new();
    compiler.add_query("tabs.create").unwrap();
    let _async_matcher = compiler.new_async_matcher();

    assert!(compiler.add_query("storage.local.get").is_err());
    compiler.shutdown();
}

#[test]
fn matchers_from_the_same_compiler_are_isolated() {
    let compiler = Compiler::new();
    compiler.add_query("tabs.create").unwrap();

    let mut a = compiler.new_matcher();
    a.add_source("browser.tabs.create({});");
    a.find_matches();

    let mut b = compiler.new_matcher();
    b.find_matches();

    assert!(a.matched_results().contains("tabs.create"));
    assert!(b.matched_results().is_empty());
}
