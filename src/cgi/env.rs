use crate::http::request::Method;

/// The variables handed to one CGI child.
///
/// Built per request and passed to that child's spawn only; the server's
/// own environment is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiEnvironment {
    pub request_method: String,
    /// Set for GET, possibly empty.
    pub query_string: Option<String>,
    /// Set for POST, as a decimal string.
    pub content_length: Option<String>,
}

impl CgiEnvironment {
    pub fn new(method: Method, query_string: Option<&str>, content_length: Option<u64>) -> Self {
        let (query_string, content_length) = match method {
            Method::GET => (Some(query_string.unwrap_or("").to_string()), None),
            Method::POST => (None, Some(content_length.unwrap_or(0).to_string())),
        };

        Self {
            request_method: method.as_str().to_string(),
            query_string,
            content_length,
        }
    }

    /// Name/value pairs in a fixed order.
    pub fn vars(&self) -> Vec<(&'static str, &str)> {
        let mut vars = vec![("REQUEST_METHOD", self.request_method.as_str())];
        if let Some(query) = &self.query_string {
            vars.push(("QUERY_STRING", query));
        }
        if let Some(len) = &self.content_length {
            vars.push(("CONTENT_LENGTH", len));
        }
        vars
    }
}
