mod common;

use std::time::Duration;

use common::TempRoot;
use lbhttpd::cgi::{CgiEnvironment, CgiExecutor};
use lbhttpd::http::error::HttpError;
use lbhttpd::http::line::LineReader;
use lbhttpd::http::request::{Method, Request};

const ENV_SCRIPT: &str = r#"printf 'Content-Type: text/plain\r\n\r\n'
printf 'REQUEST_METHOD=%s\n' "$REQUEST_METHOD"
printf 'QUERY_STRING=%s\n' "${QUERY_STRING-unset}"
printf 'CONTENT_LENGTH=%s\n' "${CONTENT_LENGTH-unset}"
"#;

fn get(path: &str, query: Option<&str>) -> Request {
    Request {
        method: Method::GET,
        raw_target: path.into(),
        path: path.into(),
        query_string: query.map(str::to_string),
        content_length: None,
    }
}

fn post(path: &str) -> Request {
    Request {
        method: Method::POST,
        raw_target: path.into(),
        path: path.into(),
        query_string: None,
        content_length: None,
    }
}

#[test]
fn test_env_for_get() {
    let env = CgiEnvironment::new(Method::GET, Some("color=red"), None);

    assert_eq!(
        env.vars(),
        vec![("REQUEST_METHOD", "GET"), ("QUERY_STRING", "color=red")]
    );
}

#[test]
fn test_env_for_get_without_query_is_empty_string() {
    let env = CgiEnvironment::new(Method::GET, None, None);

    assert_eq!(env.query_string.as_deref(), Some(""));
    assert_eq!(env.content_length, None);
}

#[test]
fn test_env_for_post() {
    let env = CgiEnvironment::new(Method::POST, None, Some(10));

    assert_eq!(
        env.vars(),
        vec![("REQUEST_METHOD", "POST"), ("CONTENT_LENGTH", "10")]
    );
}

#[tokio::test]
async fn test_execute_get_passes_query_string() {
    let root = TempRoot::new("cgi-get");
    let script = root.script("color.cgi", ENV_SCRIPT);
    let mut reader = LineReader::new(&b"Host: localhost\r\n\r\n"[..]);
    let mut out = Vec::new();

    let outcome = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut get("/color.cgi", Some("color=red")), 1024)
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n"));
    assert!(text.contains("REQUEST_METHOD=GET\n"));
    assert!(text.contains("QUERY_STRING=color=red\n"));
    assert!(text.contains("CONTENT_LENGTH=unset\n"));
    assert!(outcome.exit.unwrap().success());
    assert_eq!(outcome.bytes_in, 0);
}

#[tokio::test]
async fn test_execute_post_delivers_exact_body() {
    let root = TempRoot::new("cgi-post");
    let script = root.script(
        "echo.cgi",
        "printf 'Content-Type: text/plain\\r\\n\\r\\n'\nprintf 'len=%s;' \"$CONTENT_LENGTH\"\ncat\n",
    );
    let mut reader =
        LineReader::new(&b"Content-Length: 10\r\n\r\ncolor=blueTRAILING"[..]);
    let mut out = Vec::new();
    let mut req = post("/echo.cgi");

    let outcome = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut req, 1024)
        .await
        .unwrap();

    assert!(out.ends_with(b"len=10;color=blue"));
    assert_eq!(req.content_length, Some(10));
    assert_eq!(outcome.bytes_in, 10);
    assert_eq!(reader.buffered(), b"TRAILING");
}

#[tokio::test]
async fn test_execute_post_binary_body_order_preserved() {
    let root = TempRoot::new("cgi-binary");
    let script = root.script("cat.cgi", "cat\n");
    let body: Vec<u8> = (0..=255u8).rev().collect();
    let mut request_bytes = b"Content-Length: 256\r\n\r\n".to_vec();
    request_bytes.extend_from_slice(&body);
    let mut reader = LineReader::new(&request_bytes[..]);
    let mut out = Vec::new();

    CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut post("/cat.cgi"), 1024)
        .await
        .unwrap();

    assert_eq!(&out[..17], b"HTTP/1.0 200 OK\r\n");
    assert_eq!(&out[17..], &body[..]);
}

#[tokio::test]
async fn test_execute_post_without_content_length() {
    let root = TempRoot::new("cgi-no-length");
    let marker = root.path().join("ran");
    let script = root.script("touch.cgi", &format!("touch '{}'\n", marker.display()));
    let mut reader = LineReader::new(&b"Host: x\r\n\r\ncolor=blue"[..]);
    let mut out = Vec::new();

    let result = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut post("/touch.cgi"), 1024)
        .await;

    assert!(matches!(result, Err(HttpError::MissingContentLength)));
    assert!(out.is_empty());
    assert_eq!(reader.buffered(), b"color=blue");
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_execute_missing_program_is_process_creation_error() {
    let root = TempRoot::new("cgi-missing");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let result = CgiExecutor::new(None)
        .execute(
            &mut reader,
            &mut out,
            &root.path().join("gone.cgi"),
            &mut get("/gone.cgi", Some("")),
            1024,
        )
        .await;

    assert!(matches!(result, Err(HttpError::ProcessCreation(_))));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_execute_non_executable_file_fails_to_spawn() {
    let root = TempRoot::new("cgi-not-exec");
    let file = root.file("plain.html", b"<p>static</p>");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let result = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &file, &mut get("/plain.html", Some("a=b")), 1024)
        .await;

    assert!(matches!(result, Err(HttpError::ProcessCreation(_))));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_execute_silent_failure_is_child_failed() {
    let root = TempRoot::new("cgi-exit");
    let script = root.script("fail.cgi", "exit 3\n");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let result = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut get("/fail.cgi", None), 1024)
        .await;

    assert!(matches!(result, Err(HttpError::ChildFailed(_))));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_execute_failure_after_output_keeps_200() {
    let root = TempRoot::new("cgi-late-fail");
    let script = root.script("late.cgi", "printf 'partial'\nexit 1\n");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let outcome = CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut get("/late.cgi", None), 1024)
        .await
        .unwrap();

    assert_eq!(out, b"HTTP/1.0 200 OK\r\npartial");
    assert!(!outcome.exit.unwrap().success());
    assert_eq!(outcome.bytes_out, 7);
}

#[tokio::test]
async fn test_execute_empty_successful_output_still_commits() {
    let root = TempRoot::new("cgi-empty");
    let script = root.script("quiet.cgi", "exit 0\n");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut get("/quiet.cgi", None), 1024)
        .await
        .unwrap();

    assert_eq!(out, b"HTTP/1.0 200 OK\r\n");
}

#[tokio::test]
async fn test_execute_output_before_input_does_not_deadlock() {
    let root = TempRoot::new("cgi-deadlock");
    // Fills the stdout pipe well past its buffer before touching stdin.
    let script = root.script(
        "chatty.cgi",
        "head -c 300000 /dev/zero\ncat > /dev/null\n",
    );
    let body_len = 300_000;
    let mut request_bytes = format!("Content-Length: {}\r\n\r\n", body_len).into_bytes();
    request_bytes.extend(std::iter::repeat_n(b'x', body_len));
    let mut reader = LineReader::new(&request_bytes[..]);
    let mut out = Vec::new();

    let outcome = tokio::time::timeout(
        Duration::from_secs(20),
        CgiExecutor::new(None).execute(&mut reader, &mut out, &script, &mut post("/chatty.cgi"), 1024),
    )
    .await
    .expect("CGI exchange stalled")
    .unwrap();

    assert_eq!(outcome.bytes_in, body_len as u64);
    assert_eq!(outcome.bytes_out, 300_000);
}

#[tokio::test]
async fn test_execute_timeout_before_output() {
    let root = TempRoot::new("cgi-timeout");
    let script = root.script("slow.cgi", "exec sleep 5\n");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let started = std::time::Instant::now();
    let result = CgiExecutor::new(Some(Duration::from_millis(300)))
        .execute(&mut reader, &mut out, &script, &mut get("/slow.cgi", None), 1024)
        .await;

    assert!(matches!(result, Err(HttpError::ChildFailed(_))));
    assert!(out.is_empty());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_execute_timeout_after_output_keeps_200() {
    let root = TempRoot::new("cgi-late-timeout");
    let script = root.script("stuck.cgi", "printf x\nexec sleep 5\n");
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    let outcome = CgiExecutor::new(Some(Duration::from_millis(300)))
        .execute(&mut reader, &mut out, &script, &mut get("/stuck.cgi", None), 1024)
        .await
        .unwrap();

    assert_eq!(out, b"HTTP/1.0 200 OK\r\nx");
    assert!(outcome.exit.is_none());
    assert_eq!(outcome.bytes_out, 1);
}

#[tokio::test]
async fn test_execute_timeout_reports_body_bytes_fed() {
    let root = TempRoot::new("cgi-timeout-post");
    let script = root.script(
        "stuck.cgi",
        "head -c 5 > /dev/null\nprintf x\nexec sleep 5\n",
    );
    let mut reader = LineReader::new(&b"Content-Length: 5\r\n\r\nhello"[..]);
    let mut out = Vec::new();
    let mut req = post("/stuck.cgi");

    let outcome = CgiExecutor::new(Some(Duration::from_millis(300)))
        .execute(&mut reader, &mut out, &script, &mut req, 1024)
        .await
        .unwrap();

    assert_eq!(out, b"HTTP/1.0 200 OK\r\nx");
    assert!(outcome.exit.is_none());
    assert_eq!(outcome.bytes_in, 5);
    assert_eq!(req.content_length, Some(5));
}

#[tokio::test]
async fn test_execute_env_is_isolated() {
    let root = TempRoot::new("cgi-env");
    let script = root.script(
        "env.cgi",
        "printf 'SECRET=%s' \"${LBHTTPD_TEST_SECRET-unset}\"\n",
    );
    let mut reader = LineReader::new(&b"\r\n"[..]);
    let mut out = Vec::new();

    // Only this test reads or writes this variable.
    unsafe {
        std::env::set_var("LBHTTPD_TEST_SECRET", "leaked");
    }
    CgiExecutor::new(None)
        .execute(&mut reader, &mut out, &script, &mut get("/env.cgi", None), 1024)
        .await
        .unwrap();
    unsafe {
        std::env::remove_var("LBHTTPD_TEST_SECRET");
    }

    assert!(out.ends_with(b"SECRET=unset"));
    assert!(std::env::var_os("REQUEST_METHOD").is_none());
}
