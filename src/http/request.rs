use std::ffi::OsString;

/// HTTP request methods the server implements. Anything else is answered
/// with 501 before the rest of the request is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource, or run a CGI program with a query string
    GET,
    /// POST - Run a CGI program with the request body on its stdin
    POST,
}

/// A parsed request.
///
/// Built from the request line. For POST, `content_length` is filled in by
/// `parser::read_headers` before the CGI program is started.
///
/// The target is kept as raw bytes so that file names which are not UTF-8
/// still resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// The URL token exactly as it appeared on the request line.
    pub raw_target: OsString,
    /// The URL with any query string removed.
    pub path: OsString,
    /// Everything after the first `?` of a GET target.
    pub query_string: Option<String>,
    /// Body length announced by a POST.
    pub content_length: Option<u64>,
}

impl Method {
    /// Parses a method token, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// # use lbhttpd::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("post"), Some(Method::POST));
    /// assert_eq!(Method::from_str("PUT"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("GET") {
            Some(Method::GET)
        } else if s.eq_ignore_ascii_case("POST") {
            Some(Method::POST)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

impl Request {
    /// True when the request carries input meant for a CGI program: any
    /// POST, or a GET with a query string.
    pub fn wants_cgi(&self) -> bool {
        self.method == Method::POST || self.query_string.is_some()
    }
}
