use std::os::unix::ffi::OsStrExt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::cgi::executor::CgiExecutor;
use crate::config::Config;
use crate::http::error::HttpError;
use crate::http::line::LineReader;
use crate::http::parser::{discard_headers, parse_request_line};
use crate::http::request::Request;
use crate::http::resolver::{ResolvedTarget, TargetKind, resolve};
use crate::http::static_files::serve_file;
use crate::http::writer::ResponseWriter;

/// One client connection, carrying exactly one request.
pub struct Connection<S> {
    reader: LineReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    cfg: Arc<Config>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Dispatching(Request),
    Responding(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, cfg: Arc<Config>) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: LineReader::new(read_half),
            writer: write_half,
            cfg,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(Some(req)) => ConnectionState::Dispatching(req),
                        Ok(None) => ConnectionState::Closed,
                        Err(e) => Self::fail(e)?,
                    };
                }

                ConnectionState::Dispatching(mut req) => {
                    self.state = match self.dispatch(&mut req).await {
                        Ok(()) => ConnectionState::Closed,
                        Err(e) => {
                            tracing::info!(
                                method = ?req.method,
                                path = ?req.path,
                                error = %e,
                                "request failed"
                            );
                            Self::fail(e)?
                        }
                    };
                }

                ConnectionState::Responding(writer) => {
                    writer.write_to_stream(&mut self.writer).await?;
                }

                ConnectionState::Closed => {
                    // The peer may already be gone; the request is over either way.
                    if let Err(e) = self.writer.shutdown().await {
                        tracing::debug!(error = %e, "shutdown failed");
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads and parses the request line. `None` if the client sent nothing.
    pub async fn read_request(&mut self) -> Result<Option<Request>, HttpError> {
        let Some(line) = self.reader.read_raw_line(self.cfg.limits.max_line_len).await? else {
            tracing::debug!("client closed before sending a request");
            return Ok(None);
        };

        tracing::debug!(request_line = %String::from_utf8_lossy(&line), "received request");
        parse_request_line(&line, &self.cfg.limits).map(Some)
    }

    async fn dispatch(&mut self, req: &mut Request) -> Result<(), HttpError> {
        let max_line = self.cfg.limits.max_line_len;
        let target = resolve(
            &self.cfg.static_files.root,
            &self.cfg.static_files.index,
            &req.path,
        )
        .await;

        tracing::debug!(
            path = ?req.path,
            target = %target.path.display(),
            kind = ?target.kind,
            "resolved target"
        );

        if target.kind == TargetKind::NotFound {
            discard_headers(&mut self.reader, max_line).await?;
            return Err(HttpError::ResourceNotFound);
        }

        if self.runs_as_cgi(req, &target) {
            let executor = CgiExecutor::new(self.cfg.cgi.timeout());
            let outcome = executor
                .execute(&mut self.reader, &mut self.writer, &target.path, req, max_line)
                .await?;

            tracing::info!(
                method = ?req.method,
                path = ?req.path,
                content_length = ?req.content_length,
                exit = ?outcome.exit,
                bytes_in = outcome.bytes_in,
                bytes_out = outcome.bytes_out,
                "CGI request served"
            );
        } else {
            let sent = serve_file(&mut self.reader, &mut self.writer, &target.path, max_line).await?;

            tracing::info!(
                method = ?req.method,
                path = ?req.path,
                bytes = sent,
                "file served"
            );
        }

        Ok(())
    }

    /// A target runs as CGI when it is executable or the request carries
    /// CGI input (a POST body or a query string). With a CGI path prefix
    /// configured, nothing outside that prefix does.
    fn runs_as_cgi(&self, req: &Request, target: &ResolvedTarget) -> bool {
        if let Some(prefix) = &self.cfg.cgi.path_prefix {
            if !req.path.as_bytes().starts_with(prefix.as_bytes()) {
                return false;
            }
        }
        target.kind == TargetKind::Executable || req.wants_cgi()
    }

    /// Turns a request error into the canned page for it. An error the
    /// client cannot be told about ends the connection.
    fn fail(e: HttpError) -> anyhow::Result<ConnectionState> {
        match e.to_response() {
            Some(resp) => Ok(ConnectionState::Responding(ResponseWriter::new(&resp))),
            None => Err(e.into()),
        }
    }
}
