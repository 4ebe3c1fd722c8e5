use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

use tokio::io::AsyncRead;

use crate::config::Limits;
use crate::http::error::HttpError;
use crate::http::line::LineReader;
use crate::http::request::{Method, Request};

const CONTENT_LENGTH_PREFIX: &str = "Content-Length:";

/// Parses the first line of a request: `METHOD SP TARGET [SP VERSION]`.
///
/// The method is the bytes before the first whitespace, so a line that
/// starts with whitespace has an empty method. It is checked before
/// anything else, so an unsupported method fails with `UnsupportedMethod`
/// even when the rest of the line is junk. The protocol version is never
/// looked at.
pub fn parse_request_line(line: impl AsRef<[u8]>, limits: &Limits) -> Result<Request, HttpError> {
    let line = line.as_ref();

    let method_end = line
        .iter()
        .position(u8::is_ascii_whitespace)
        .unwrap_or(line.len());
    let method_bytes = &line[..method_end];
    let method = std::str::from_utf8(method_bytes)
        .ok()
        .and_then(Method::from_str)
        .ok_or_else(|| {
            HttpError::UnsupportedMethod(String::from_utf8_lossy(method_bytes).into_owned())
        })?;

    let rest = &line[method_end..];
    let target_start = rest
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or(HttpError::MalformedRequestLine)?;
    let rest = &rest[target_start..];
    let target_end = rest
        .iter()
        .position(u8::is_ascii_whitespace)
        .unwrap_or(rest.len());
    let target = &rest[..target_end];

    if target.len() > limits.max_target_len {
        return Err(HttpError::TargetTooLong);
    }

    let (path, query_string) = match method {
        Method::GET => match target.iter().position(|&b| b == b'?') {
            Some(q) => (
                &target[..q],
                Some(String::from_utf8_lossy(&target[q + 1..]).into_owned()),
            ),
            None => (target, None),
        },
        Method::POST => (target, None),
    };

    Ok(Request {
        method,
        raw_target: OsString::from_vec(target.to_vec()),
        path: OsString::from_vec(path.to_vec()),
        query_string,
        content_length: None,
    })
}

/// Reads the rest of the header block for `request`.
///
/// GET headers are dropped. For POST they are scanned and the announced
/// length is stored in `request.content_length`; see `scan_content_length`
/// for how a missing or bad value fails.
pub async fn read_headers<R>(
    reader: &mut LineReader<R>,
    request: &mut Request,
    max_line: usize,
) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
{
    match request.method {
        Method::GET => discard_headers(reader, max_line).await,
        Method::POST => {
            request.content_length = Some(scan_content_length(reader, max_line).await?);
            Ok(())
        }
    }
}

/// Reads and drops header lines up to the blank line or end of stream.
pub async fn discard_headers<R>(reader: &mut LineReader<R>, max_line: usize) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
{
    while let Some(line) = reader.read_line(max_line).await? {
        if line.is_empty() {
            break;
        }
    }
    Ok(())
}

/// Reads the rest of the header block and returns the Content-Length.
///
/// All other headers are dropped. The last Content-Length line wins.
/// Nothing past the blank line is read, so the body stays in `reader`.
pub async fn scan_content_length<R>(
    reader: &mut LineReader<R>,
    max_line: usize,
) -> Result<u64, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut found = None;

    while let Some(line) = reader.read_line(max_line).await? {
        if line.is_empty() {
            break;
        }
        if let Some(value) = content_length_value(&line) {
            found = Some(value);
        }
    }

    match found {
        Some(Ok(len)) => Ok(len),
        Some(Err(raw)) => Err(HttpError::InvalidContentLength(raw)),
        None => Err(HttpError::MissingContentLength),
    }
}

/// If `line` is a Content-Length header, its value: the parsed length, or
/// the raw text when it is not a decimal number.
pub fn content_length_value(line: &str) -> Option<Result<u64, String>> {
    let name = line.get(..CONTENT_LENGTH_PREFIX.len())?;
    if !name.eq_ignore_ascii_case(CONTENT_LENGTH_PREFIX) {
        return None;
    }

    let raw = line[CONTENT_LENGTH_PREFIX.len()..].trim();
    Some(raw.parse::<u64>().map_err(|_| raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = parse_request_line("GET /index.html HTTP/1.0", &Limits::default()).unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/index.html");
        assert_eq!(req.query_string, None);
    }

    #[test]
    fn leading_whitespace_leaves_method_empty() {
        let result = parse_request_line(" GET /index.html HTTP/1.0", &Limits::default());
        assert!(matches!(result, Err(HttpError::UnsupportedMethod(m)) if m.is_empty()));
    }

    #[test]
    fn content_length_ignores_other_headers() {
        assert_eq!(content_length_value("Host: example.com"), None);
        assert_eq!(content_length_value("Content-Type: text/plain"), None);
        assert_eq!(content_length_value("content-length: 42"), Some(Ok(42)));
    }
}
