//! Line-at-a-time reading off the client connection.
//!
//! The reader keeps whatever it over-reads in a `BytesMut`, so the bytes
//! after the blank header line are still available for a POST body.

use std::io;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;

const READ_CHUNK: usize = 4096;

pub struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads one line as text, without its terminator. Bytes that are not
    /// UTF-8 are replaced; use `read_raw_line` where they matter.
    pub async fn read_line(&mut self, max_len: usize) -> Result<Option<String>, HttpError> {
        let line = self.read_raw_line(max_len).await?;
        Ok(line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Reads one line, without its terminator.
    ///
    /// `\n`, `\r\n` and a lone `\r` all end a line. Returns `Ok(None)` when
    /// the stream is at end-of-file before any byte of the line was read; a
    /// partial final line is returned as-is. A line longer than `max_len`
    /// bytes is rejected rather than truncated.
    pub async fn read_raw_line(&mut self, max_len: usize) -> Result<Option<Vec<u8>>, HttpError> {
        let mut line: Vec<u8> = Vec::new();

        loop {
            if self.buffer.is_empty() && self.fill().await? == 0 {
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            let Some(end) = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r') else {
                if line.len() + self.buffer.len() > max_len {
                    return Err(HttpError::LineTooLong);
                }
                line.extend_from_slice(&self.buffer);
                self.buffer.clear();
                continue;
            };

            if line.len() + end > max_len {
                return Err(HttpError::LineTooLong);
            }
            line.extend_from_slice(&self.buffer[..end]);
            let terminator = self.buffer[end];
            self.buffer.advance(end + 1);

            if terminator == b'\r' {
                if self.buffer.is_empty() {
                    self.fill().await?;
                }
                if self.buffer.first() == Some(&b'\n') {
                    self.buffer.advance(1);
                }
            }

            return Ok(Some(line));
        }
    }

    /// Copies exactly `len` bytes of request body into `dst`, starting with
    /// anything already buffered. Stops early only if the client hangs up.
    ///
    /// Returns the number of bytes copied.
    pub async fn copy_body<W>(&mut self, len: u64, dst: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let buffered = len.min(self.buffer.len() as u64) as usize;
        if buffered > 0 {
            let chunk = self.buffer.split_to(buffered);
            dst.write_all(&chunk).await?;
        }

        let remaining = len - buffered as u64;
        let mut rest = (&mut self.inner).take(remaining);
        let copied = tokio::io::copy(&mut rest, dst).await?;
        dst.flush().await?;

        Ok(buffered as u64 + copied)
    }

    /// Bytes read off the stream but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    async fn fill(&mut self) -> Result<usize, HttpError> {
        self.buffer.reserve(READ_CHUNK);
        self.inner
            .read_buf(&mut self.buffer)
            .await
            .map_err(HttpError::ConnectionReset)
    }
}
