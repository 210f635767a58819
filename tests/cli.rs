//! End-to-end tests for the `psp` binary.
//!
//! A fake answer service runs in-process on an ephemeral port; the binary
//! is pointed at it through a temporary config file.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn psp_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_psp"))
}

type Captured = Arc<Mutex<Vec<Value>>>;

/// Answers every query by echoing it, except `fail` which returns a
/// service error with a detail message.
async fn handle_query(
    State(captured): State<Captured>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    captured.lock().unwrap().push(body.clone());
    let text = body["text"].as_str().unwrap_or_default().to_string();

    if text == "fail" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "rate limited" })),
        )
            .into_response();
    }

    Json(json!({
        "answer": format!("Answer to: {}", text),
        "search_results": [
            { "title": "First Source", "link": "http://a", "snippet": "alpha snippet" },
            { "title": "Second Source", "link": "http://b", "snippet": "beta snippet" }
        ]
    }))
    .into_response()
}

async fn spawn_service() -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/query", post(handle_query))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), captured)
}

fn write_config(tmp: &TempDir, base_url: &str) -> PathBuf {
    let config_path = tmp.path().join("psp.toml");
    fs::write(
        &config_path,
        format!(
            r#"[service]
base_url = "{}"
query_path = "/api/query"

[query]
context_results = 5
"#,
            base_url
        ),
    )
    .unwrap();
    config_path
}

struct Run {
    stdout: String,
    stderr: String,
    success: bool,
}

/// Run `psp` off the async runtime so the fake service keeps serving.
async fn run_psp(config_path: &Path, args: &[&str], stdin: Option<&str>) -> Run {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let stdin = stdin.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let binary = psp_binary();
        let mut child = Command::new(&binary)
            .arg("--config")
            .arg(&config_path)
            .args(&args)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap_or_else(|e| panic!("Failed to run psp binary at {:?}: {}", binary, e));

        {
            let mut pipe = child.stdin.take().unwrap();
            if let Some(input) = stdin {
                pipe.write_all(input.as_bytes()).unwrap();
            }
        }

        let output = child.wait_with_output().unwrap();
        Run {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_prints_answer_and_sources_in_order() {
    let (base, _) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["ask", "What", "is", "X?"], None).await;

    assert!(run.success, "ask failed: stdout={}, stderr={}", run.stdout, run.stderr);
    assert!(run.stdout.starts_with("Answer to: What is X?"));
    assert!(run.stdout.contains("Sources"));
    let first = run.stdout.find("[1] First Source").unwrap();
    let second = run.stdout.find("[2] Second Source").unwrap();
    assert!(first < second);
    assert!(run.stdout.contains("    http://a\n    alpha snippet"));
    assert!(run.stderr.contains("Searching: What is X?"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_sends_configured_request_body() {
    let (base, captured) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(
        &config_path,
        &["--context-results", "2", "ask", "  padded question  "],
        None,
    )
    .await;

    assert!(run.success, "stderr={}", run.stderr);
    let bodies = captured.lock().unwrap();
    assert_eq!(
        *bodies,
        vec![json!({ "text": "padded question", "context_results": 2 })]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_service_error_shows_detail() {
    let (base, _) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["ask", "fail"], None).await;

    assert!(!run.success, "ask should fail: stdout={}", run.stdout);
    assert!(run.stderr.contains("Error: rate limited"), "stderr={}", run.stderr);
    assert!(run.stdout.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_unreachable_service_shows_fallback() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &format!("http://{}", addr));

    let run = run_psp(&config_path, &["ask", "test"], None).await;

    assert!(!run.success);
    assert!(
        run.stderr
            .contains("Error: An error occurred while processing your request"),
        "stderr={}",
        run.stderr
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_blank_query_sends_nothing() {
    let (base, captured) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["ask", "   "], None).await;

    assert!(run.success, "stderr={}", run.stderr);
    assert!(run.stdout.is_empty());
    assert!(!run.stderr.contains("Searching"));
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_json_success() {
    let (base, _) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["ask", "--json", "What is X?"], None).await;

    assert!(run.success, "stderr={}", run.stderr);
    let parsed: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(parsed["answer"], "Answer to: What is X?");
    assert_eq!(parsed["search_results"][0]["title"], "First Source");
    assert_eq!(parsed["search_results"][1]["link"], "http://b");
    assert!(!run.stderr.contains("Searching"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_json_failure() {
    let (base, _) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["ask", "--json", "fail"], None).await;

    assert!(!run.success);
    let parsed: Value = serde_json::from_str(&run.stdout).unwrap();
    assert_eq!(parsed, json!({ "error": { "message": "rate limited" } }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repl_answers_each_line() {
    let (base, captured) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["repl"], Some("first\n\n   \nsecond\n:q\n")).await;

    assert!(run.success, "stderr={}", run.stderr);
    assert!(run.stdout.contains("Answer to: second"));
    let texts: Vec<String> = captured
        .lock()
        .unwrap()
        .iter()
        .map(|b| b["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.contains(&"first".to_string()));
    assert!(texts.contains(&"second".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repl_reports_errors_and_continues() {
    let (base, _) = spawn_service().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, &base);

    let run = run_psp(&config_path, &["repl"], Some("fail\n")).await;

    assert!(run.success, "repl should exit cleanly after a failed query");
    assert!(run.stderr.contains("Error: rate limited"), "stderr={}", run.stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_command_prints_effective_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(&tmp, "http://127.0.0.1:9");

    let run = run_psp(
        &config_path,
        &["--base-url", "http://answers.example.com", "config"],
        None,
    )
    .await;

    assert!(run.success, "stderr={}", run.stderr);
    let parsed: toml::Value = toml::from_str(&run.stdout).unwrap();
    assert_eq!(
        parsed["service"]["base_url"].as_str(),
        Some("http://answers.example.com")
    );
    assert_eq!(parsed["query"]["context_results"].as_integer(), Some(5));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("psp.toml");
    fs::write(&config_path, "[query]\ncontext_results = 0\n").unwrap();

    let run = run_psp(&config_path, &["ask", "anything"], None).await;

    assert!(!run.success);
    assert!(run.stderr.contains("context_results"), "stderr={}", run.stderr);
}
