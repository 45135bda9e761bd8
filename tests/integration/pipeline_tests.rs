//! Integration tests for a complete backup run
//!
//! These tests use wiremock to stand in for the OAuth endpoint, the API and
//! the sites' short links, and drive the whole coordinator end-to-end.

use async_trait::async_trait;
use serde_json::{json, Value};
use stackexchange_backup::archive::{ObjectStore, StoreError, StoreResult, UploadStatus};
use stackexchange_backup::auth::{ACCESS_TOKEN_CACHE_KEY, CODE_CACHE_KEY, SESSION_TTL};
use stackexchange_backup::cache::{self, KeyValueStore, MemoryCache, SharedCache};
use stackexchange_backup::config::Config;
use stackexchange_backup::output::Console;
use stackexchange_backup::pipeline::{CodePrompt, Coordinator, NoPrompt, RunOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const RUN: &str = "2024-05-01_120000";

/// Remote store that rejects every write and records what was attempted
#[derive(Default)]
struct FailingStore {
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for FailingStore {
    fn describe(&self) -> String {
        "failing store".to_string()
    }

    async fn put(&self, path: &str, _bytes: &[u8], _content_type: &str) -> StoreResult<()> {
        self.attempts.lock().unwrap().push(path.to_string());
        Err(StoreError::Remote("connection reset".to_string()))
    }
}

/// Answers the code prompt with a fixed string and counts the questions
struct ScriptedPrompt {
    answer: String,
    asked: usize,
}

impl ScriptedPrompt {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            asked: 0,
        }
    }
}

impl CodePrompt for ScriptedPrompt {
    fn ask(&mut self, authorization_url: &str) -> io::Result<String> {
        assert!(authorization_url.contains("client_id=1234"), "{}", authorization_url);
        self.asked += 1;
        Ok(self.answer.clone())
    }
}

/// Console sink shared with the test
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Redirects `/questions/{id}` to `/questions/{id}/slug`
struct SlugRedirect;

impl Respond for SlugRedirect {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let location = format!("{}/slug", request.url.path());
        ResponseTemplate::new(301).insert_header("Location", location.as_str())
    }
}

fn create_test_config(server: &MockServer, local_root: &Path) -> Config {
    let mut config = Config::default();
    config.api.client_id = "1234".to_string();
    config.api.client_secret = "secret".to_string();
    config.api.key = "appkey".to_string();
    config.api.api_base = server.uri();
    config.api.oauth_base = format!("{}/oauth", server.uri());
    config.fetch.page_size = 2;
    config.fetch.retry_delay_ms = 0;
    config.fetch.resolve_delay_ms = 0;
    config.output.local_root = local_root.to_string_lossy().into_owned();
    config.exclude_sites = vec!["Meta Stack Exchange".to_string()];
    config
}

fn run_options() -> RunOptions {
    RunOptions {
        code: Some("abc".to_string()),
        run_timestamp: Some(RUN.to_string()),
        ..Default::default()
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/access_token/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok", "expires": 3600 })),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_sites(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2.3/me/associated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "site_name": "Stack Overflow",
                    "site_url": server.uri(),
                    "api_site_parameter": "stackoverflow"
                },
                {
                    "site_name": "Meta Stack Exchange",
                    "site_url": server.uri(),
                    "api_site_parameter": "meta"
                }
            ],
            "has_more": false
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, endpoint: &str, page: u32, items: Vec<Value>, has_more: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/2.3/me/{}", endpoint)))
        .and(query_param("site", "stackoverflow"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "items": items, "has_more": has_more })),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn answers(ids: std::ops::Range<u64>) -> Vec<Value> {
    ids.map(|id| json!({ "answer_id": id + 5000, "question_id": id })).collect()
}

/// Five answers over three pages of two, plus one page for every other
/// endpoint
async fn mount_activity(server: &MockServer) {
    mount_page(server, "answers", 1, answers(1000..1002), true).await;
    mount_page(server, "answers", 2, answers(1002..1004), true).await;
    mount_page(server, "answers", 3, answers(1004..1005), false).await;
    mount_page(server, "questions", 1, vec![json!({ "question_id": 42 })], false).await;
    mount_page(server, "comments", 1, vec![json!({ "comment_id": 1, "post_id": 7 })], false).await;
    mount_page(server, "mentioned", 1, vec![json!({ "comment_id": 2, "question_id": 9 })], false).await;
    mount_page(server, "favorites", 1, vec![], false).await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/questions/\d+$"))
        .respond_with(SlugRedirect)
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/a/7"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn coordinator(config: Config, cache: SharedCache, remote: Arc<FailingStore>) -> Coordinator {
    Coordinator::new(config, cache, Some(remote), run_options())
        .expect("Failed to create coordinator")
        .with_console(Console::silent())
}

#[tokio::test]
async fn test_full_backup_run() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_sites(&server).await;
    mount_activity(&server).await;

    let dir = TempDir::new().unwrap();
    let cache = cache::shared(MemoryCache::new());
    let remote = Arc::new(FailingStore::default());

    let mut first = coordinator(create_test_config(&server, dir.path()), cache.clone(), remote.clone());
    let stats = first.run(&mut NoPrompt).await.expect("Run failed");

    assert!(stats.export_failure.is_none(), "{:?}", stats.export_failure);
    assert_eq!(stats.sites_total, 2);
    assert_eq!(stats.sites_excluded, 1);
    assert_eq!(stats.sites_exported, 1);
    assert_eq!(stats.pages_saved, 7);
    assert_eq!(stats.items_saved, 8);
    // Five answers, one question and the mention's question resolve; the
    // comment link falls back
    assert_eq!(stats.urls_resolved, 7);
    assert_eq!(stats.urls_fallen_back, 1);
    // my_sites.json, seven pages and urls.html all fail remotely
    assert_eq!(stats.mirror_failures, 9);
    assert!(matches!(stats.upload, Some(UploadStatus::Failed(_))));

    // Local layout
    let run_dir = dir.path().join(RUN);
    assert!(run_dir.join("my_sites.json").is_file());
    for page in ["page_0001.json", "page_0002.json", "page_0003.json"] {
        assert!(run_dir.join("Stack_Overflow/answers").join(page).is_file(), "{}", page);
    }
    assert!(!run_dir.join("Stack_Overflow/answers/page_0004.json").exists());
    for endpoint in ["questions", "comments", "mentioned", "favorites"] {
        assert!(run_dir.join("Stack_Overflow").join(endpoint).join("page_0001.json").is_file());
    }
    assert!(!run_dir.join("Meta").exists());

    let saved: Value =
        serde_json::from_slice(&std::fs::read(run_dir.join("Stack_Overflow/answers/page_0003.json")).unwrap())
            .unwrap();
    assert_eq!(saved["has_more"], json!(false));
    assert_eq!(saved["items"][0]["question_id"], json!(1004));

    // URL log
    let urls = std::fs::read_to_string(run_dir.join("urls.html")).unwrap();
    let lines: Vec<&str> = urls.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(
        lines[0],
        format!(
            "<a href=\"{0}/questions/1000/slug\">{0}/questions/1000</a>",
            server.uri()
        )
    );
    assert!(lines.contains(&format!("<a href=\"{0}/a/7\">{0}/a/7</a>", server.uri()).as_str()));
    assert!(lines.contains(
        &format!("<a href=\"{0}/questions/9/slug\">{0}/questions/9</a>", server.uri()).as_str()
    ));

    // Remote writes were attempted after each local write
    {
        let attempts = remote.attempts.lock().unwrap();
        assert_eq!(attempts[0], format!("{}/my_sites.json", RUN));
        assert!(attempts.contains(&format!("{}/Stack_Overflow/answers/page_0002.json", RUN)));
        assert_eq!(attempts.last().unwrap(), &format!("{}.zip", RUN));
    }

    // Archive contents
    let zip_path = dir.path().join(format!("{}.zip", RUN));
    assert_eq!(stats.archive_path.as_deref(), Some(zip_path.as_path()));
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    let mut zipped = String::new();
    archive
        .by_name(&format!("{}/Stack_Overflow/answers/page_0003.json", RUN))
        .unwrap()
        .read_to_string(&mut zipped)
        .unwrap();
    assert_eq!(
        zipped.as_bytes(),
        std::fs::read(run_dir.join("Stack_Overflow/answers/page_0003.json")).unwrap()
    );
    assert!(archive.by_name(&format!("{}/urls.html", RUN)).is_ok());

    // A rerun with the same timestamp rewrites identical files; cached
    // responses mean no further API or token requests are made
    let files = [
        "my_sites.json",
        "urls.html",
        "Stack_Overflow/answers/page_0001.json",
        "Stack_Overflow/answers/page_0003.json",
        "Stack_Overflow/comments/page_0001.json",
    ];
    let snapshot: Vec<Vec<u8>> = files
        .iter()
        .map(|p| std::fs::read(run_dir.join(p)).unwrap())
        .collect();
    let zip_bytes = std::fs::read(&zip_path).unwrap();

    let mut second = coordinator(create_test_config(&server, dir.path()), cache, remote);
    let rerun = second.run(&mut NoPrompt).await.expect("Rerun failed");
    assert_eq!(rerun.pages_saved, 7);

    for (relative, bytes) in files.iter().zip(snapshot) {
        assert_eq!(std::fs::read(run_dir.join(relative)).unwrap(), bytes, "{}", relative);
    }
    assert_eq!(std::fs::read(&zip_path).unwrap(), zip_bytes);
    assert!(!run_dir.join("Stack_Overflow/answers/page_0004.json").exists());
}

#[tokio::test]
async fn test_export_failure_still_archives() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/2.3/me/associated"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_id": 400,
            "error_name": "bad_parameter",
            "error_message": "pagesize"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let remote = Arc::new(FailingStore::default());
    let mut run = coordinator(
        create_test_config(&server, dir.path()),
        cache::shared(MemoryCache::new()),
        remote,
    );

    let stats = run.run(&mut NoPrompt).await.expect("Run should reach the end");

    let failure = stats.export_failure.expect("failure should be recorded");
    assert!(failure.contains("bad_parameter"), "{}", failure);
    assert_eq!(stats.pages_saved, 0);
    assert!(dir.path().join(format!("{}.zip", RUN)).is_file());
}

#[tokio::test]
async fn test_missing_has_more_stops_the_export() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_sites(&server).await;
    mount_page(&server, "answers", 1, answers(1000..1002), true).await;
    Mock::given(method("GET"))
        .and(path("/2.3/me/answers"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2.3/me/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [], "has_more": false })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(SlugRedirect)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut run = coordinator(
        create_test_config(&server, dir.path()),
        cache::shared(MemoryCache::new()),
        Arc::new(FailingStore::default()),
    );

    let stats = run.run(&mut NoPrompt).await.expect("Run should reach the end");

    assert!(stats.export_failure.is_some());
    assert_eq!(stats.pages_saved, 1);
    let answers_dir = dir.path().join(RUN).join("Stack_Overflow/answers");
    assert!(answers_dir.join("page_0001.json").is_file());
    assert!(!answers_dir.join("page_0002.json").exists());
}

#[tokio::test]
async fn test_transient_page_failure_is_retried() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_sites(&server).await;
    Mock::given(method("GET"))
        .and(path("/2.3/me/answers"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_activity(&server).await;

    let dir = TempDir::new().unwrap();
    let mut run = coordinator(
        create_test_config(&server, dir.path()),
        cache::shared(MemoryCache::new()),
        Arc::new(FailingStore::default()),
    );

    let stats = run.run(&mut NoPrompt).await.expect("Run failed");
    assert!(stats.export_failure.is_none(), "{:?}", stats.export_failure);
    assert_eq!(stats.pages_saved, 7);
}

#[tokio::test]
async fn test_mirror_failures_are_reported_on_the_console() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_sites(&server).await;
    mount_activity(&server).await;

    let dir = TempDir::new().unwrap();
    let errors = SharedBuffer::default();
    let console = Console::with_writers(Box::new(io::sink()), Box::new(errors.clone()), false);
    let mut run = Coordinator::new(
        create_test_config(&server, dir.path()),
        cache::shared(MemoryCache::new()),
        Some(Arc::new(FailingStore::default())),
        run_options(),
    )
    .expect("Failed to create coordinator")
    .with_console(console);

    let stats = run.run(&mut NoPrompt).await.expect("Run failed");

    let output = errors.contents();
    let reported: Vec<&str> = output.lines().filter(|l| l.contains("Check the logs")).collect();
    assert_eq!(reported.len(), 9, "{}", output);
    assert_eq!(stats.mirror_failures, 9);
    assert!(reported[0].contains("my_sites.json"));
    assert!(output.contains("Stack_Overflow/answers/page_0002.json"));
    assert!(reported.last().unwrap().contains("urls.html"));
}

// Authorization code handling. The sites request is rejected so each run
// ends right after the token step; only the token exchanges matter here.

async fn mount_token_for(server: &MockServer, code: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/access_token/json"))
        .and(body_string_contains(format!("code={}", code)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok", "expires": 3600 })),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_rejected_sites(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2.3/me/associated"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_id": 403,
            "error_name": "access_denied",
            "error_message": "not today"
        })))
        .mount(server)
        .await;
}

fn without_code() -> RunOptions {
    RunOptions {
        run_timestamp: Some(RUN.to_string()),
        skip_upload: true,
        ..Default::default()
    }
}

async fn run_with(
    server: &MockServer,
    dir: &Path,
    cache: SharedCache,
    options: RunOptions,
    prompt: &mut dyn CodePrompt,
) {
    let mut coordinator = Coordinator::new(create_test_config(server, dir), cache, None, options)
        .expect("Failed to create coordinator")
        .with_console(Console::silent());
    let stats = coordinator.run(prompt).await.expect("Run should reach the end");
    assert!(stats.export_failure.is_some());
}

fn seed(cache: &SharedCache, key: &str, value: &str) {
    cache::lock(cache).unwrap().put(key, value, SESSION_TTL).unwrap();
}

fn cached(cache: &SharedCache, key: &str) -> Option<String> {
    cache::lock(cache).unwrap().get(key).unwrap()
}

#[tokio::test]
async fn test_prompted_code_is_cached_for_the_next_run() {
    let server = MockServer::start().await;
    mount_token_for(&server, "zzz", 1).await;
    mount_rejected_sites(&server).await;

    let dir = TempDir::new().unwrap();
    let cache = cache::shared(MemoryCache::new());

    let mut prompt = ScriptedPrompt::new("https://stackexchange.com/oauth/login_success?code=zzz");
    run_with(&server, dir.path(), cache.clone(), without_code(), &mut prompt).await;
    assert_eq!(prompt.asked, 1);
    assert_eq!(cached(&cache, CODE_CACHE_KEY).as_deref(), Some("zzz"));
    assert_eq!(cached(&cache, ACCESS_TOKEN_CACHE_KEY).as_deref(), Some("tok"));

    let mut second = ScriptedPrompt::new("never-used");
    run_with(&server, dir.path(), cache, without_code(), &mut second).await;
    assert_eq!(second.asked, 0);
}

#[tokio::test]
async fn test_cached_code_skips_the_prompt() {
    let server = MockServer::start().await;
    mount_token_for(&server, "cached", 1).await;
    mount_rejected_sites(&server).await;

    let dir = TempDir::new().unwrap();
    let cache = cache::shared(MemoryCache::new());
    seed(&cache, CODE_CACHE_KEY, "cached");

    let mut prompt = ScriptedPrompt::new("never-used");
    run_with(&server, dir.path(), cache, without_code(), &mut prompt).await;
    assert_eq!(prompt.asked, 0);
}

#[tokio::test]
async fn test_flush_forgets_code_and_token() {
    let server = MockServer::start().await;
    mount_token_for(&server, "fresh", 1).await;
    mount_rejected_sites(&server).await;

    let dir = TempDir::new().unwrap();
    let cache = cache::shared(MemoryCache::new());
    seed(&cache, CODE_CACHE_KEY, "stale");
    seed(&cache, ACCESS_TOKEN_CACHE_KEY, "stale-token");

    let options = RunOptions {
        flush_cache: true,
        ..without_code()
    };
    let mut prompt = ScriptedPrompt::new("fresh");
    run_with(&server, dir.path(), cache.clone(), options, &mut prompt).await;

    assert_eq!(prompt.asked, 1);
    assert_eq!(cached(&cache, CODE_CACHE_KEY).as_deref(), Some("fresh"));
    assert_eq!(cached(&cache, ACCESS_TOKEN_CACHE_KEY).as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_new_explicit_code_replaces_cached_token() {
    let server = MockServer::start().await;
    mount_token_for(&server, "new", 1).await;
    mount_rejected_sites(&server).await;

    let dir = TempDir::new().unwrap();
    let cache = cache::shared(MemoryCache::new());
    seed(&cache, CODE_CACHE_KEY, "old");
    seed(&cache, ACCESS_TOKEN_CACHE_KEY, "old-token");

    let options = RunOptions {
        code: Some("new".to_string()),
        ..without_code()
    };
    let mut prompt = ScriptedPrompt::new("never-used");
    run_with(&server, dir.path(), cache.clone(), options, &mut prompt).await;

    assert_eq!(prompt.asked, 0);
    assert_eq!(cached(&cache, CODE_CACHE_KEY).as_deref(), Some("new"));
    assert_eq!(cached(&cache, ACCESS_TOKEN_CACHE_KEY).as_deref(), Some("tok"));
}
