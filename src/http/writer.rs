use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Response, SERVER_NAME, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.0";

/// Status line plus headers plus the blank separator line.
///
/// Headers are written in name order so output is stable.
pub fn serialize_head(status: StatusCode, headers: &HashMap<String, String>) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(status_line(status).as_bytes());

    let mut sorted: Vec<_> = headers.iter().collect();
    sorted.sort();
    for (k, v) in sorted {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = serialize_head(resp.status, &resp.headers);
    buf.extend_from_slice(&resp.body);
    buf
}

pub fn status_line(status: StatusCode) -> String {
    format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    )
}

/// Head sent before a static file body. There is no Content-Length: the
/// body ends when the connection closes.
pub fn static_file_head() -> Vec<u8> {
    let mut headers = HashMap::new();
    headers.insert("Server".to_string(), SERVER_NAME.to_string());
    headers.insert("Content-Type".to_string(), "text/html".to_string());
    serialize_head(StatusCode::Ok, &headers)
}

/// Writes all of `buf`, retrying short writes.
///
/// A write that accepts zero bytes means the peer is gone and is reported
/// as `WriteZero`.
pub async fn write_fully<W>(stream: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < buf.len() {
        let n = stream.write(&buf[written..]).await?;

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "connection closed while writing",
            ));
        }

        written += n;
    }
    Ok(())
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&self, stream: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_fully(stream, &self.buffer).await?;
        stream.flush().await
    }
}
