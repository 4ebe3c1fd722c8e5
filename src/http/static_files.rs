use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::line::LineReader;
use crate::http::parser::discard_headers;
use crate::http::writer::{static_file_head, write_fully};

/// Sends `path` as a 200 response.
///
/// The remaining request headers are read and dropped first. The body has
/// no Content-Length; the caller closes the connection to end it. Fails
/// with `ResourceNotFound` if the file cannot be opened, before anything
/// is written.
pub async fn serve_file<R, W>(
    reader: &mut LineReader<R>,
    writer: &mut W,
    path: &Path,
    max_line: usize,
) -> Result<u64, HttpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    discard_headers(reader, max_line).await?;

    let mut file = File::open(path).await.map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "cannot open file");
        HttpError::ResourceNotFound
    })?;

    write_fully(writer, &static_file_head())
        .await
        .map_err(HttpError::ConnectionReset)?;

    let sent = tokio::io::copy(&mut file, writer)
        .await
        .map_err(HttpError::ConnectionReset)?;
    writer.flush().await.map_err(HttpError::ConnectionReset)?;

    tracing::debug!(path = %path.display(), bytes = sent, "served file");
    Ok(sent)
}
