use std::collections::HashMap;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = "lbhttpd/0.1.0";

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): static file or CGI output follows
/// - `BadRequest` (400): POST without a usable Content-Length, oversized or
///   malformed request line
/// - `NotFound` (404): nothing at the requested path
/// - `InternalServerError` (500): the CGI program could not be run
/// - `NotImplemented` (501): method other than GET or POST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Method Not Implemented
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lbhttpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    /// Returns the reason phrase written on the status line.
    ///
    /// These keep the historical spelling of the pages they head
    /// (`NOT FOUND`, `BAD REQUEST`, `Method Not Implemented`).
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "BAD REQUEST",
            StatusCode::NotFound => "NOT FOUND",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Method Not Implemented",
        }
    }
}

/// A complete HTTP response with an in-memory body.
///
/// Static files and CGI output are streamed instead; they only ever use
/// the head produced by `writer::serialize_head`.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::NotFound)
///     .header("Content-Type", "text/html")
///     .body(b"<HTML>...</HTML>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds the Content-Length header from the body size if not already present.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Content-Length".to_string())
            .or_insert_with(|| self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Headers shared by every page the server composes itself.
    fn html(status: StatusCode, body: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Server", SERVER_NAME)
            .header("Content-Type", "text/html")
            .body(body.as_bytes().to_vec())
            .build()
    }

    /// 400: a POST arrived without a Content-Length we could use.
    pub fn bad_request() -> Self {
        Self::html(
            StatusCode::BadRequest,
            "<P>Your browser sent a bad request, \
             such as a POST without a Content-Length.\r\n",
        )
    }

    /// 404: nothing is served at the requested path.
    pub fn not_found() -> Self {
        Self::html(
            StatusCode::NotFound,
            "<HTML><TITLE>Not Found</TITLE>\r\n\
             <BODY><P>The server could not fulfill\r\n\
             your request because the resource specified\r\n\
             is unavailable or nonexistent.\r\n\
             </BODY></HTML>\r\n",
        )
    }

    /// 500: the CGI program could not be started or failed before output.
    pub fn internal_error() -> Self {
        Self::html(
            StatusCode::InternalServerError,
            "<P>Error prohibited CGI execution.\r\n",
        )
    }

    /// 501: method other than GET or POST.
    pub fn not_implemented() -> Self {
        Self::html(
            StatusCode::NotImplemented,
            "<HTML><HEAD><TITLE>Method Not Implemented\r\n\
             </TITLE></HEAD>\r\n\
             <BODY><P>HTTP request method not supported.\r\n\
             </BODY></HTML>\r\n",
        )
    }
}
