//! Integration tests for the crawler
//!
//! These tests drive an in-memory application through full crawls into a
//! temporary destination and check the resulting file tree.

use site_freezer::app::{Application, Body, ChunkSource, Request, Response};
use site_freezer::crawler::{BoundedWait, Coordinator, CrawlReport, HtmlLinkExtractor, LinkExtractor};
use site_freezer::ledger::{RunStatus, SeenLedger, SqliteLedger};
use site_freezer::materializer::{Materializer, Visit};
use site_freezer::output::StatsObserver;
use site_freezer::url::CrawlTarget;
use site_freezer::{freeze, Config, FreezeError, VisitOutcome};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// How a test page responds
#[derive(Clone)]
enum Page {
    Html(&'static str),
    Text(&'static str),
    Redirect(&'static str),
    Fail,
    Panic,
    /// Streams one chunk, then the source panics
    BrokenStream,
}

struct BrokenChunks {
    sent: bool,
}

impl ChunkSource for BrokenChunks {
    fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.sent {
            panic!("stream source bug");
        }
        self.sent = true;
        Ok(Some(b"<html>first half".to_vec()))
    }
}

/// An in-memory site that counts how often each path is requested
struct TestSite {
    pages: HashMap<&'static str, Page>,
    calls: Mutex<BTreeMap<String, usize>>,
    order: Mutex<Vec<String>>,
}

impl TestSite {
    fn new(pages: Vec<(&'static str, Page)>) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.into_iter().collect(),
            calls: Mutex::new(BTreeMap::new()),
            order: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> BTreeMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }

    fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

impl Application for TestSite {
    fn call(&self, request: &Request) -> anyhow::Result<Response> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.path.clone())
            .or_insert(0) += 1;
        self.order.lock().unwrap().push(request.path.clone());

        match self.pages.get(request.path.as_str()) {
            Some(Page::Html(body)) => {
                Ok(Response::ok(*body).with_header("Content-Type", "text/html; charset=utf-8"))
            }
            Some(Page::Text(body)) => {
                Ok(Response::ok(*body).with_header("Content-Type", "text/plain"))
            }
            Some(Page::Redirect(location)) => Ok(Response::moved_permanently(*location)),
            Some(Page::Fail) => anyhow::bail!("database unavailable"),
            Some(Page::Panic) => panic!("handler bug"),
            Some(Page::BrokenStream) => Ok(Response::ok(Body::from_chunks(BrokenChunks { sent: false }))
                .with_header("Content-Type", "text/html")),
            None => Ok(Response::new(404).with_body("not found")),
        }
    }
}

fn create_test_config(dir: &TempDir, workers: usize) -> Config {
    let mut config = Config::new(dir.path().join("site"));
    config.parallel.workers = workers;
    config.parallel.poll_interval_ms = 5;
    config.parallel.join_timeout_secs = Some(60);
    config
}

fn crawl(site: &Arc<TestSite>, config: Config) -> CrawlReport {
    Coordinator::from_shared(site.clone(), config).run().unwrap()
}

/// Relative path and content of every file under `root`
fn tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().to_string();
                files.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn blog_site() -> Arc<TestSite> {
    TestSite::new(vec![
        (
            "/",
            Page::Html(
                r#"<html><head><link rel="stylesheet" href="/static/site.css"></head>
                <body>
                    <a href="/posts/">Posts</a>
                    <a href="/about">About</a>
                    <a href="/about#team">Team</a>
                    <a href="mailto:hello@example.com">Mail</a>
                </body></html>"#,
            ),
        ),
        (
            "/posts/",
            Page::Html(
                r#"<a href="first">First</a><a href="second">Second</a><a href="/">Home</a>"#,
            ),
        ),
        (
            "/posts/first",
            Page::Html(r#"<a href="second">Next</a><img src="/static/cat.png">"#),
        ),
        ("/posts/second", Page::Html(r#"<a href="first">Previous</a><a href="../about">About</a>"#)),
        ("/about", Page::Html(r#"<a href="/">Home</a><a href="/about">Self</a>"#)),
        ("/static/site.css", Page::Text("body { color: black; }")),
        ("/static/cat.png", Page::Text("not really a png")),
    ])
}

#[test]
fn test_full_crawl_writes_every_page_once() {
    let dir = TempDir::new().unwrap();
    let site = blog_site();

    let report = crawl(&site, create_test_config(&dir, 1));

    let calls = site.calls();
    assert_eq!(calls.len(), 7);
    assert!(calls.values().all(|count| *count == 1), "calls: {:?}", calls);
    assert_eq!(report.visits, 7);
    assert_eq!(report.distinct_paths, 7);
    assert_eq!(report.outcome_count(VisitOutcome::Written), 7);

    let files = tree(&dir.path().join("site"));
    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "about",
            "index.html",
            "posts/first",
            "posts/index.html",
            "posts/second",
            "static/cat.png",
            "static/site.css",
        ]
    );
    assert_eq!(files["static/site.css"], b"body { color: black; }");
}

#[test]
fn test_custom_index_name() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        ("/", Page::Html(r#"<a href="/docs/">Docs</a>"#)),
        ("/docs/", Page::Text("docs")),
    ]);
    let mut config = create_test_config(&dir, 1);
    config.output.index_name = "default.htm".to_string();

    crawl(&site, config);

    assert!(dir.path().join("site/default.htm").is_file());
    assert_eq!(
        fs::read_to_string(dir.path().join("site/docs/default.htm")).unwrap(),
        "docs"
    );
}

#[test]
fn test_round_trip_for_every_body_shape() {
    struct Chunks(Vec<Vec<u8>>);

    impl ChunkSource for Chunks {
        fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.0.remove(0)))
            }
        }
    }

    let payload: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 251) as u8).collect();
    let expected = payload.clone();

    let app = move |request: &Request| -> anyhow::Result<Response> {
        let body = match request.path.as_str() {
            "/" => Body::from(
                r#"<a href="/bytes.bin">b</a><a href="/chunks.bin">c</a><a href="/reader.bin">r</a>"#,
            ),
            "/bytes.bin" => Body::from(payload.clone()),
            "/chunks.bin" => Body::from_chunks(Chunks(
                payload.chunks(4096).map(|chunk| chunk.to_vec()).collect(),
            )),
            "/reader.bin" => Body::from_reader(io::Cursor::new(payload.clone())),
            _ => return Ok(Response::new(404)),
        };
        let content_type = if request.path == "/" { "text/html" } else { "application/octet-stream" };
        Ok(Response::ok(body).with_header("Content-Type", content_type))
    };

    let dir = TempDir::new().unwrap();
    let report = freeze(app, create_test_config(&dir, 1)).unwrap();

    assert_eq!(report.files.len(), 4);
    for name in ["bytes.bin", "chunks.bin", "reader.bin"] {
        assert_eq!(fs::read(dir.path().join("site").join(name)).unwrap(), expected, "{}", name);
    }
}

#[test]
fn test_conditional_get_keeps_prior_file() {
    let dir = TempDir::new().unwrap();
    let seen_tokens = Arc::new(Mutex::new(Vec::new()));
    let tokens = Arc::clone(&seen_tokens);
    let app = move |request: &Request| -> anyhow::Result<Response> {
        let token = request.header("If-Modified-Since").map(str::to_string);
        tokens.lock().unwrap().push(token.clone());
        match token {
            Some(_) => Ok(Response::new(304).with_body("ignored body")),
            None => Ok(Response::ok("fresh").with_header("Last-Modified", "Tue, 01 Sep 2026 10:00:00 GMT")),
        }
    };
    let mut materializer = Materializer::new(dir.path(), "index.html");
    let target = CrawlTarget::parse("/feed.xml").unwrap();

    let first = materializer.materialize(&app, &target);
    let second = materializer.materialize(&app, &target);

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 304);
    assert_eq!(second.file, first.file);
    assert_eq!(second.outcome(), VisitOutcome::NotModified);
    assert_eq!(fs::read_to_string(dir.path().join("feed.xml")).unwrap(), "fresh");
    assert_eq!(
        *seen_tokens.lock().unwrap(),
        vec![None, Some("Tue, 01 Sep 2026 10:00:00 GMT".to_string())]
    );
}

#[test]
fn test_conflict_file_then_directory() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        ("/a", Page::Text("file a")),
        ("/a/b", Page::Text("file b")),
    ]);
    let mut config = create_test_config(&dir, 1);
    config.crawl.seeds = vec!["/a".to_string(), "/a/b".to_string()];

    let report = crawl(&site, config);

    assert_eq!(report.status_count(200), 1);
    assert_eq!(report.status_count(999), 1);
    assert_eq!(report.outcome_count(VisitOutcome::Conflict), 1);
    assert_eq!(fs::read_to_string(dir.path().join("site/a")).unwrap(), "file a");
}

#[test]
fn test_conflict_directory_then_file() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        ("/a", Page::Text("file a")),
        ("/a/b", Page::Text("file b")),
    ]);
    let mut config = create_test_config(&dir, 1);
    config.crawl.seeds = vec!["/a/b".to_string(), "/a".to_string()];

    let report = crawl(&site, config);

    assert_eq!(report.status_count(200), 1);
    assert_eq!(report.status_count(999), 1);
    assert!(dir.path().join("site/a").is_dir());
    assert_eq!(fs::read_to_string(dir.path().join("site/a/b")).unwrap(), "file b");
}

#[test]
fn test_host_filter_limits_crawl() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        (
            "/",
            Page::Html(
                r#"<a href="https://www.example.com/team">Team</a>
                   <a href="https://tracker.ads.net/pixel">Ads</a>
                   <a href="http://example.com/plain">Plain</a>
                   <a href="/local">Local</a>"#,
            ),
        ),
        ("/team", Page::Text("team")),
        ("/pixel", Page::Text("pixel")),
        ("/plain", Page::Text("plain")),
        ("/local", Page::Text("local")),
    ]);
    let mut config = create_test_config(&dir, 1);
    config.crawl.allowed_hosts = vec!["*.example.com".to_string()];
    let stats = Arc::new(StatsObserver::new());

    let report = Coordinator::from_shared(site.clone(), config)
        .with_observer(stats.clone())
        .run()
        .unwrap();

    let calls = site.calls();
    assert!(calls.contains_key("/team"));
    assert!(calls.contains_key("/local"));
    assert!(!calls.contains_key("/pixel"));
    // The anchored pattern does not match the bare domain
    assert!(!calls.contains_key("/plain"));
    assert_eq!(report.rejected, 2);
    assert_eq!(stats.rejected(), 2);
}

#[test]
fn test_mixed_case_allow_list_matches_links() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        ("/", Page::Html(r#"<a href="https://Docs.Example.com/guide">Guide</a>"#)),
        ("/guide", Page::Text("guide")),
    ]);
    let mut config = create_test_config(&dir, 1);
    config.crawl.allowed_hosts = vec!["Docs.Example.com".to_string()];

    let report = crawl(&site, config);

    assert_eq!(site.order(), vec!["/", "/guide"]);
    assert_eq!(report.rejected, 0);
}

#[test]
fn test_rejected_hosts_never_reach_the_ledger() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        (
            "/",
            Page::Html(
                r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a><a href="/d">D</a>
                   <a href="https://tracker.ads.net/pixel">Ads</a>"#,
            ),
        ),
        ("/a", Page::Html(r#"<a href="https://cdn.other.org/lib.js">Lib</a>"#)),
        ("/b", Page::Html(r#"<a href="https://www.example.com/team">Team</a>"#)),
        ("/c", Page::Html(r#"<a href="https://tracker.ads.net/pixel">Ads</a>"#)),
        ("/d", Page::Text("d")),
        ("/team", Page::Text("team")),
    ]);
    let mut config = create_test_config(&dir, 3);
    config.crawl.allowed_hosts = vec!["*.example.com".to_string()];

    let report = crawl(&site, config.clone());

    // The tracker link may be rejected once or twice depending on how the
    // worklist was split
    assert!(report.rejected >= 2, "rejected: {}", report.rejected);
    assert!(!site.calls().contains_key("/pixel"));
    assert!(!site.calls().contains_key("/lib.js"));

    let ledger = SqliteLedger::open_for_inspection(&config.ledger_path()).unwrap();
    let mut claimed: Vec<String> = ledger.entries().unwrap().into_iter().map(|e| e.path).collect();
    claimed.sort();
    assert_eq!(claimed, vec!["/", "/a", "/b", "/c", "/d", "/team"]);
}

#[test]
fn test_empty_allow_list_rejects_absolute_links() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        ("/", Page::Html(r#"<a href="https://example.com/x">X</a><a href="/y">Y</a>"#)),
        ("/x", Page::Text("x")),
        ("/y", Page::Text("y")),
    ]);

    crawl(&site, create_test_config(&dir, 1));

    assert_eq!(site.order(), vec!["/", "/y"]);
}

#[test]
fn test_redirect_is_visited_before_queued_links() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        (
            "/",
            Page::Html(r#"<a href="/old">Old</a><a href="/b">B</a><a href="/c">C</a>"#),
        ),
        ("/old", Page::Redirect("/new")),
        ("/new", Page::Text("new")),
        ("/b", Page::Text("b")),
        ("/c", Page::Text("c")),
    ]);

    let report = crawl(&site, create_test_config(&dir, 1));

    assert_eq!(site.order(), vec!["/", "/old", "/new", "/b", "/c"]);
    assert_eq!(report.outcome_count(VisitOutcome::Redirected), 1);
    assert!(!dir.path().join("site/old").exists());
    assert!(dir.path().join("site/new").is_file());
}

#[test]
fn test_application_failures_do_not_abort() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new(vec![
        (
            "/",
            Page::Html(r#"<a href="/error">E</a><a href="/panic">P</a><a href="/gone">G</a><a href="/ok">OK</a>"#),
        ),
        ("/error", Page::Fail),
        ("/panic", Page::Panic),
        ("/ok", Page::Text("ok")),
    ]);

    let report = crawl(&site, create_test_config(&dir, 1));

    assert_eq!(report.visits, 5);
    assert_eq!(report.status_count(500), 2);
    assert_eq!(report.status_count(404), 1);
    assert_eq!(report.failures(), 3);
    assert!(dir.path().join("site/ok").is_file());
    assert!(!dir.path().join("site/error").exists());
    assert!(!dir.path().join("site/gone").exists());
}

fn broken_stream_site() -> Arc<TestSite> {
    TestSite::new(vec![
        (
            "/",
            Page::Html(r#"<a href="/stream">S</a><a href="/ok">OK</a><a href="/more">M</a>"#),
        ),
        ("/stream", Page::BrokenStream),
        ("/ok", Page::Text("ok")),
        ("/more", Page::Text("more")),
    ])
}

#[test]
fn test_panicking_body_does_not_abort() {
    let dir = TempDir::new().unwrap();
    let site = broken_stream_site();

    let report = crawl(&site, create_test_config(&dir, 1));

    assert_eq!(report.visits, 4);
    assert_eq!(report.status_count(500), 1);
    assert!(!dir.path().join("site/stream").exists());
    assert!(dir.path().join("site/ok").is_file());
    assert!(dir.path().join("site/more").is_file());
}

#[test]
fn test_panicking_body_in_parallel_crawl() {
    let dir = TempDir::new().unwrap();
    let site = broken_stream_site();
    let config = create_test_config(&dir, 2);

    let report = crawl(&site, config.clone());

    assert_eq!(report.visits, 4);
    assert_eq!(report.status_count(500), 1);
    assert!(!dir.path().join("site/stream").exists());
    assert!(dir.path().join("site/more").is_file());

    let ledger = SqliteLedger::open_for_inspection(&config.ledger_path()).unwrap();
    let run = ledger.get_run(ledger.run_id()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[test]
fn test_follow_links_disabled() {
    let dir = TempDir::new().unwrap();
    let site = blog_site();
    let mut config = create_test_config(&dir, 1);
    config.crawl.follow_links = false;
    config.crawl.seeds = vec!["/".to_string(), "/about".to_string()];

    let report = crawl(&site, config);

    assert_eq!(site.order(), vec!["/", "/about"]);
    assert_eq!(report.files.len(), 2);
}

#[test]
fn test_seed_file() {
    let dir = TempDir::new().unwrap();
    let seed_file = dir.path().join("seeds.txt");
    fs::write(&seed_file, "# hidden pages\n/hidden\n\n/static/site.css\n").unwrap();
    let site = blog_site();
    let mut config = create_test_config(&dir, 1);
    config.crawl.follow_links = false;
    config.crawl.seed_file = Some(seed_file);

    crawl(&site, config);

    assert_eq!(site.order(), vec!["/hidden", "/static/site.css"]);
}

/// A site big enough that the first worker splits its worklist
fn wide_site() -> Arc<TestSite> {
    let mut pages = vec![(
        "/",
        Page::Html(
            r#"<a href="/section/1/">1</a><a href="/section/2/">2</a><a href="/section/3/">3</a>
               <a href="/section/4/">4</a><a href="/section/5/">5</a><a href="/section/6/">6</a>"#,
        ),
    )];
    let sections: [(&'static str, &'static str); 6] = [
        ("/section/1/", r#"<a href="a">a</a><a href="b">b</a><a href="/section/2/">next</a>"#),
        ("/section/2/", r#"<a href="a">a</a><a href="b">b</a><a href="/section/3/">next</a>"#),
        ("/section/3/", r#"<a href="a">a</a><a href="b">b</a><a href="/section/1/a">x</a>"#),
        ("/section/4/", r#"<a href="a">a</a><a href="/section/5/b">x</a><a href="/">home</a>"#),
        ("/section/5/", r#"<a href="a">a</a><a href="b">b</a><a href="/section/6/a">x</a>"#),
        ("/section/6/", r#"<a href="a">a</a><a href="b">b</a><a href="/section/4/a">x</a>"#),
    ];
    for (path, html) in sections {
        pages.push((path, Page::Html(html)));
    }
    let leaves: [&'static str; 11] = [
        "/section/1/a",
        "/section/1/b",
        "/section/2/a",
        "/section/2/b",
        "/section/3/a",
        "/section/3/b",
        "/section/4/a",
        "/section/5/a",
        "/section/5/b",
        "/section/6/a",
        "/section/6/b",
    ];
    for leaf in leaves {
        pages.push((leaf, Page::Html(r#"<a href="/">home</a><a href="./">up</a>"#)));
    }
    TestSite::new(pages)
}

#[test]
fn test_parallel_crawl_matches_serial_crawl() {
    let serial_dir = TempDir::new().unwrap();
    let serial_site = wide_site();
    let serial = crawl(&serial_site, create_test_config(&serial_dir, 1));

    let parallel_dir = TempDir::new().unwrap();
    let parallel_site = wide_site();
    let parallel_config = create_test_config(&parallel_dir, 3);
    let parallel = crawl(&parallel_site, parallel_config.clone());

    assert_eq!(
        tree(&serial_dir.path().join("site")),
        tree(&parallel_dir.path().join("site"))
    );
    assert_eq!(serial.distinct_paths, 18);
    assert_eq!(parallel.distinct_paths, 18);
    assert_eq!(parallel.visits, 18);
    assert!(parallel.workers > 1);

    // No path was handed to the application twice, even across workers
    let calls = parallel_site.calls();
    assert_eq!(calls.len(), 18);
    assert!(calls.values().all(|count| *count == 1), "calls: {:?}", calls);

    let ledger = SqliteLedger::open_for_inspection(&parallel_config.ledger_path()).unwrap();
    let mut claimed: Vec<String> = ledger.entries().unwrap().into_iter().map(|e| e.path).collect();
    claimed.sort();
    let mut expected: Vec<String> = calls.keys().cloned().collect();
    expected.sort();
    assert_eq!(claimed, expected);
    assert_eq!(ledger.count().unwrap(), 18);
}

#[test]
fn test_parallel_runs_share_one_ledger_file() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2);

    let first = crawl(&wide_site(), config.clone());
    fs::remove_dir_all(dir.path().join("site")).unwrap();
    let second = crawl(&wide_site(), config.clone());

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.distinct_paths, 18);

    let ledger = SqliteLedger::open_for_inspection(&config.ledger_path()).unwrap();
    let runs = ledger.runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.status == RunStatus::Completed));
}

#[test]
fn test_bounded_wait_reports_crashed_worker() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 2);
    let crashing_extractor = |visit: &Visit| -> Vec<String> {
        if std::thread::current().name() == Some("freeze-worker-1") {
            panic!("extractor crashed in {}", visit.target);
        }
        HtmlLinkExtractor.extract(visit)
    };

    let result = Coordinator::from_shared(wide_site(), config.clone())
        .with_extractor(crashing_extractor)
        .with_join_strategy(BoundedWait::new(Duration::from_millis(5), Duration::from_secs(60)))
        .run();

    assert!(
        matches!(result, Err(FreezeError::WorkerFailed { worker: 1, .. })),
        "unexpected result: {:?}",
        result.map(|report| report.visits)
    );

    let ledger = SqliteLedger::open_for_inspection(&config.ledger_path()).unwrap();
    let run = ledger.get_run(ledger.run_id()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}
