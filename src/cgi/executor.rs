//! Runs a CGI program for one request.
//!
//! The request body is fed to the child's stdin while its stdout is
//! forwarded to the client, both at once, so a program that writes before
//! it has read all of its input cannot stall on a full pipe. The `200 OK`
//! status line is held back until the child writes its first byte or exits
//! cleanly; a child that fails before that gets the client a 500 instead.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::cgi::env::CgiEnvironment;
use crate::http::error::HttpError;
use crate::http::line::LineReader;
use crate::http::parser::read_headers;
use crate::http::request::Request;
use crate::http::response::StatusCode;
use crate::http::writer::{status_line, write_fully};

const BUFFER_SIZE: usize = 8192;

/// What happened to a CGI run that got as far as spawning the child.
#[derive(Debug)]
pub struct CgiOutcome {
    /// `None` if the child was killed on timeout.
    pub exit: Option<ExitStatus>,
    /// Request body bytes delivered to the child's stdin, including on
    /// timeout.
    pub bytes_in: u64,
    /// Child output bytes forwarded to the client.
    pub bytes_out: u64,
}

/// How far the exchange with the child got. Kept outside the relay
/// futures so it survives them being dropped on timeout.
#[derive(Debug, Default)]
struct Progress {
    committed: AtomicBool,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

/// Why forwarding stopped before the child's stdout hit end-of-file.
#[derive(Debug, Default)]
struct Forwarded {
    pipe_error: Option<io::Error>,
    client_error: Option<io::Error>,
}

pub struct CgiExecutor {
    timeout: Option<Duration>,
}

impl CgiExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Finishes reading the request, runs `script` and relays its output.
    ///
    /// For GET the remaining headers are dropped. For POST they are scanned
    /// for Content-Length, which is stored in `request`, and exactly that
    /// many body bytes go to the child; without one the request fails with
    /// `MissingContentLength` and no body byte is read.
    pub async fn execute<R, W>(
        &self,
        reader: &mut LineReader<R>,
        writer: &mut W,
        script: &Path,
        request: &mut Request,
        max_line: usize,
    ) -> Result<CgiOutcome, HttpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        read_headers(reader, request, max_line).await?;
        let content_length = request.content_length;

        let env = CgiEnvironment::new(
            request.method,
            request.query_string.as_deref(),
            content_length,
        );

        let mut cmd = Command::new(script);
        cmd.env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        cmd.envs(env.vars());
        cmd.stdin(match content_length {
            Some(_) => Stdio::piped(),
            None => Stdio::null(),
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            tracing::warn!(script = %script.display(), error = %e, "cannot spawn CGI program");
            HttpError::ProcessCreation(e)
        })?;

        tracing::debug!(
            script = %script.display(),
            pid = ?child.id(),
            env = ?env.vars(),
            "spawned CGI program"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let body_len = content_length.unwrap_or(0);
        let progress = Progress::default();

        let run = async {
            let ((), forwarded, errors) = tokio::join!(
                feed_stdin(&mut *reader, stdin, body_len, &progress.bytes_in),
                forward_stdout(stdout, &mut *writer, &progress),
                collect_stderr(stderr),
            );
            let exit = child.wait().await;
            (forwarded, errors, exit)
        };

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.ok(),
            None => Some(run.await),
        };

        let Some((forwarded, errors, exit)) = finished else {
            tracing::warn!(script = %script.display(), "CGI program timed out");
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "cannot kill CGI program");
            }
            if !progress.committed.load(Ordering::Acquire) {
                return Err(HttpError::ChildFailed("timed out".to_string()));
            }
            return Ok(CgiOutcome {
                exit: None,
                bytes_in: progress.bytes_in.load(Ordering::Acquire),
                bytes_out: progress.bytes_out.load(Ordering::Acquire),
            });
        };

        if !errors.is_empty() {
            tracing::debug!(
                script = %script.display(),
                stderr = %String::from_utf8_lossy(&errors),
                "CGI program wrote to stderr"
            );
        }
        if let Some(e) = &forwarded.pipe_error {
            tracing::warn!(error = %e, "reading CGI output failed");
        }

        let exit = exit.map_err(|e| HttpError::ChildFailed(e.to_string()))?;

        if let Some(e) = forwarded.client_error {
            return Err(HttpError::ConnectionReset(e));
        }

        if !progress.committed.load(Ordering::Acquire) {
            if !exit.success() {
                return Err(HttpError::ChildFailed(format!(
                    "exited with {} before writing output",
                    exit
                )));
            }
            commit(writer).await.map_err(HttpError::ConnectionReset)?;
        } else if !exit.success() {
            tracing::warn!(
                script = %script.display(),
                status = %exit,
                "CGI program failed after output was sent"
            );
        }

        writer.flush().await.map_err(HttpError::ConnectionReset)?;

        Ok(CgiOutcome {
            exit: Some(exit),
            bytes_in: progress.bytes_in.load(Ordering::Acquire),
            bytes_out: progress.bytes_out.load(Ordering::Acquire),
        })
    }
}

/// Copies the request body into the child, then closes its stdin. Bytes
/// are counted into `fed` as they are written.
async fn feed_stdin<R, I>(reader: &mut LineReader<R>, stdin: Option<I>, len: u64, fed: &AtomicU64)
where
    R: AsyncRead + Unpin,
    I: AsyncWrite + Unpin,
{
    let Some(stdin) = stdin else {
        return;
    };
    let mut stdin = Counted { inner: stdin, count: fed };

    match reader.copy_body(len, &mut stdin).await {
        Ok(copied) if copied < len => {
            tracing::warn!(expected = len, copied, "client closed before sending the full body");
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("CGI program closed its stdin early");
        }
        Err(e) => {
            tracing::warn!(error = %e, "forwarding request body failed");
        }
    }
}

/// Writer that adds every accepted byte to `count`.
struct Counted<'a, W> {
    inner: W,
    count: &'a AtomicU64,
}

impl<W> AsyncWrite for Counted<'_, W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            this.count.fetch_add(*n as u64, Ordering::AcqRel);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

async fn forward_stdout<O, W>(stdout: Option<O>, writer: &mut W, progress: &Progress) -> Forwarded
where
    O: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = Forwarded::default();
    let Some(mut stdout) = stdout else {
        return state;
    };

    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                state.pipe_error = Some(e);
                break;
            }
        };

        if !progress.committed.load(Ordering::Acquire) {
            if let Err(e) = commit(writer).await {
                state.client_error = Some(e);
                break;
            }
            progress.committed.store(true, Ordering::Release);
        }

        if let Err(e) = write_fully(writer, &buf[..n]).await {
            state.client_error = Some(e);
            break;
        }
        progress.bytes_out.fetch_add(n as u64, Ordering::AcqRel);
    }

    state
}

async fn collect_stderr<E>(stderr: Option<E>) -> Vec<u8>
where
    E: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    if let Some(mut stderr) = stderr {
        if let Err(e) = stderr.read_to_end(&mut out).await {
            tracing::debug!(error = %e, "reading CGI stderr failed");
        }
    }
    out
}

/// Sends the bare status line; the CGI program writes its own headers.
async fn commit<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_fully(writer, status_line(StatusCode::Ok).as_bytes()).await
}
