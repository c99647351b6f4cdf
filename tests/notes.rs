//! Integration tests for edgequake-notes against a fake OpenAI-compatible
//! endpoint served by `wiremock`.
//!
//! Run with:
//!   cargo test --test notes

use edgequake_notes::{
    generate_notes, ErrorStrategy, NotesConfig, NotesError, NotesOptions, NotesProgressCallback,
    PageError, RunStatistics, StatsFile,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const ANSWER: &str = "### 概念解释\n概念内容\n\n### 技术挑战\n挑战内容\n\n### 解决方案\n方案内容\n\n### 方案优势\n优势内容\n\n### 最佳实践\n实践内容\n";

fn chat_response(content: &str, prompt_tokens: u64, completion_tokens: u64) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt_tokens,
            "completion_tokens": completion_tokens,
            "total_tokens": prompt_tokens + completion_tokens
        }
    })
}

/// Every page succeeds with 900 + 100 tokens.
async fn mount_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(ANSWER, 900, 100)))
        .mount(server)
        .await;
}

/// Requests whose prompt contains `marker` get an HTTP 500.
async fn mount_failure_for(server: &MockServer, marker: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .with_priority(1)
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> NotesConfig {
    NotesConfig::builder(server.uri(), "sk-test", "test-model")
        .price_per_1m_tokens(2.0)
        .api_timeout_secs(5)
        .build()
        .expect("valid config")
}

fn write_three_pages(dir: &Path) -> PathBuf {
    let input = dir.join("paper.txt");
    std::fs::write(
        &input,
        "### Page 1\n\nalpha-page-text about caching\n\n\
         ### Page 2\n\nbeta-page-text about consensus\n\n\
         ### Page 3\n\ngamma-page-text about sharding\n",
    )
    .unwrap();
    input
}

fn page_headers(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|l| l.starts_with("# Page"))
        .map(str::to_string)
        .collect()
}

fn read_stats(path: &Path) -> StatsFile {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ── Skip strategy ────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_pages_succeed_under_skip() {
    let server = MockServer::start().await;
    mount_success(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());
    let stats_path = dir.path().join("stats.json");

    let options = NotesOptions {
        stats_path: Some(stats_path.clone()),
        ..NotesOptions::default()
    };
    let out = generate_notes(&input, &config_for(&server), &options)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let report = std::fs::read_to_string(dir.path().join("paper_notes.md")).unwrap();
    assert_eq!(page_headers(&report), vec!["# Page 1", "# Page 2", "# Page 3"]);
    assert_eq!(report.matches("## 原文").count(), 3);
    assert_eq!(report.matches("## 内容解读").count(), 3);
    assert_eq!(report.matches("### 最佳实践").count(), 3);
    assert!(report.contains("beta-page-text about consensus"));
    assert!(report.contains("方案内容"));

    let stats = read_stats(&stats_path);
    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.processed_pages, 3);
    assert_eq!(stats.skipped_pages, 0);
    assert_eq!(stats.api_calls, 3);
    assert_eq!(stats.prompt_tokens, 2_700);
    assert_eq!(stats.completion_tokens, 300);
    assert_eq!(stats.total_tokens, 3_000);
    assert!((stats.total_cost - 0.006).abs() < 1e-12);
    assert_eq!(stats.aborted_at_page, None);
    assert_eq!(out.output.stats.total_tokens, 3_000);
}

#[tokio::test]
async fn failed_page_is_skipped_and_run_continues() {
    let server = MockServer::start().await;
    mount_failure_for(&server, "beta-page-text").await;
    mount_success(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());
    let stats_path = dir.path().join("stats.json");

    let options = NotesOptions {
        stats_path: Some(stats_path.clone()),
        ..NotesOptions::default()
    };
    let out = generate_notes(&input, &config_for(&server), &options)
        .await
        .unwrap();
    assert!(!out.output.is_aborted());

    let report = std::fs::read_to_string(&out.report_path).unwrap();
    assert_eq!(page_headers(&report), vec!["# Page 1", "# Page 3"]);
    assert!(!report.contains("beta-page-text"));

    assert!(matches!(
        out.output.skipped[0].error,
        PageError::LlmFailed { page: 2, .. }
    ));

    let stats = read_stats(&stats_path);
    assert_eq!(stats.processed_pages, 2);
    assert_eq!(stats.skipped_pages, 1);
    assert_eq!(stats.skipped_page_indices, vec![2]);
    assert_eq!(stats.api_calls, 2);
    assert_eq!(stats.total_tokens, 2_000);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn unparseable_answer_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("gamma-page-text"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("I cannot help with that.", 900, 8)),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    mount_success(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());

    let out = generate_notes(&input, &config_for(&server), &NotesOptions::default())
        .await
        .unwrap();

    assert_eq!(out.output.results.len(), 2);
    assert!(matches!(
        out.output.skipped[0].error,
        PageError::ParseFailed { page: 3, .. }
    ));
}

// ── Abort strategy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn abort_keeps_pages_before_the_failure() {
    let server = MockServer::start().await;
    mount_failure_for(&server, "beta-page-text").await;
    mount_success(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());
    let stats_path = dir.path().join("stats.json");

    let options = NotesOptions {
        error_strategy: ErrorStrategy::Abort,
        stats_path: Some(stats_path.clone()),
        ..NotesOptions::default()
    };
    let out = generate_notes(&input, &config_for(&server), &options)
        .await
        .unwrap();

    let report = std::fs::read_to_string(&out.report_path).unwrap();
    assert_eq!(page_headers(&report), vec!["# Page 1"]);

    // Page 3 never reached the endpoint.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests
        .iter()
        .any(|r| String::from_utf8_lossy(&r.body).contains("gamma-page-text")));

    let stats = read_stats(&stats_path);
    assert_eq!(stats.processed_pages, 1);
    assert_eq!(stats.aborted_at_page, Some(2));

    match out.into_result() {
        Err(NotesError::Aborted { page, source }) => {
            assert_eq!(page, 2);
            assert!(matches!(source, PageError::LlmFailed { page: 2, .. }));
        }
        other => panic!("expected an aborted run, got {other:?}"),
    }
}

// ── HTTP client behaviour ────────────────────────────────────────────────────

#[tokio::test]
async fn request_carries_model_key_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("\"model\":\"test-model\""))
        .and(body_string_contains("分布式系统"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(ANSWER, 10, 10)))
        .expect(3)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());

    let options = NotesOptions {
        topic: "分布式系统".into(),
        ..NotesOptions::default()
    };
    let out = generate_notes(&input, &config_for(&server), &options)
        .await
        .unwrap();
    assert_eq!(out.output.results.len(), 3);
    server.verify().await;
}

#[tokio::test]
async fn auth_and_rate_limit_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("alpha-page-text"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("beta-page-text"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("gamma-page-text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());

    let out = generate_notes(&input, &config_for(&server), &NotesOptions::default())
        .await
        .unwrap();

    let errors: Vec<_> = out.output.skipped.iter().map(|s| s.error.clone()).collect();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], PageError::AuthFailed { page: 1, .. }));
    assert_eq!(
        errors[1],
        PageError::RateLimited {
            page: 2,
            retry_after_secs: Some(7)
        }
    );
    assert!(matches!(errors[2], PageError::LlmFailed { page: 3, .. }));

    // Everything skipped: the run still completes with an empty report.
    let report = std::fs::read_to_string(&out.report_path).unwrap();
    assert!(report.is_empty());
    assert!(out.into_result().is_ok());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    completed: AtomicUsize,
    skipped: AtomicUsize,
    last_calls: AtomicUsize,
}

impl NotesProgressCallback for Recorder {
    fn on_page_complete(&self, _page: usize, _total: usize, stats: &RunStatistics) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.last_calls.store(stats.api_calls, Ordering::SeqCst);
    }

    fn on_page_skipped(
        &self,
        _page: usize,
        _total: usize,
        _error: &PageError,
        _stats: &RunStatistics,
    ) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_callback_sees_every_page() {
    let server = MockServer::start().await;
    mount_failure_for(&server, "alpha-page-text").await;
    mount_success(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_three_pages(dir.path());

    let recorder = Arc::new(Recorder::default());
    let options = NotesOptions {
        progress: Some(recorder.clone()),
        ..NotesOptions::default()
    };
    generate_notes(&input, &config_for(&server), &options)
        .await
        .unwrap();

    assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.skipped.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.last_calls.load(Ordering::SeqCst), 2);
}

// ── Setup failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn input_without_text_is_rejected() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.txt");
    std::fs::write(&input, "### Page 1\n\n   \n\n### Page 2\n\n").unwrap();

    let err = generate_notes(&input, &config_for(&server), &NotesOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NotesError::NoPages { .. }));
    assert!(!dir.path().join("blank_notes.md").exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn text_file_claiming_to_be_pdf_is_rejected() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fake.pdf");
    std::fs::write(&input, "this is not a pdf").unwrap();

    let err = generate_notes(&input, &config_for(&server), &NotesOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NotesError::NotAPdf { .. }));
}
