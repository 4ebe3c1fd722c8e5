use std::fmt;
use std::io;

use crate::http::response::{Response, StatusCode};

/// Everything that can end a request early.
///
/// Each variant maps to the status the client sees, except
/// `ConnectionReset`, after which nothing more can be written.
#[derive(Debug)]
pub enum HttpError {
    /// Method token other than GET or POST.
    UnsupportedMethod(String),
    /// Request line without a target.
    MalformedRequestLine,
    /// A line ran past the configured maximum without a terminator.
    LineTooLong,
    /// The URL token is longer than the configured maximum.
    TargetTooLong,
    /// POST whose headers carry no Content-Length.
    MissingContentLength,
    /// Content-Length whose value is not a decimal number.
    InvalidContentLength(String),
    /// Nothing at the resolved path, or it could not be opened.
    ResourceNotFound,
    /// The CGI child could not be started.
    ProcessCreation(io::Error),
    /// The CGI child failed before writing any output.
    ChildFailed(String),
    /// Reading from or writing to the client failed.
    ConnectionReset(io::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::UnsupportedMethod(_) => Some(StatusCode::NotImplemented),
            HttpError::MalformedRequestLine
            | HttpError::LineTooLong
            | HttpError::TargetTooLong
            | HttpError::MissingContentLength
            | HttpError::InvalidContentLength(_) => Some(StatusCode::BadRequest),
            HttpError::ResourceNotFound => Some(StatusCode::NotFound),
            HttpError::ProcessCreation(_) | HttpError::ChildFailed(_) => {
                Some(StatusCode::InternalServerError)
            }
            HttpError::ConnectionReset(_) => None,
        }
    }

    /// The canned page for this error, if the client can still receive one.
    pub fn to_response(&self) -> Option<Response> {
        let response = match self {
            HttpError::UnsupportedMethod(_) => Response::not_implemented(),
            HttpError::MalformedRequestLine
            | HttpError::LineTooLong
            | HttpError::TargetTooLong
            | HttpError::MissingContentLength
            | HttpError::InvalidContentLength(_) => Response::bad_request(),
            HttpError::ResourceNotFound => Response::not_found(),
            HttpError::ProcessCreation(_) | HttpError::ChildFailed(_) => Response::internal_error(),
            HttpError::ConnectionReset(_) => return None,
        };
        Some(response)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::UnsupportedMethod(m) => write!(f, "unsupported method {:?}", m),
            HttpError::MalformedRequestLine => write!(f, "malformed request line"),
            HttpError::LineTooLong => write!(f, "request line or header too long"),
            HttpError::TargetTooLong => write!(f, "request target too long"),
            HttpError::MissingContentLength => write!(f, "POST without Content-Length"),
            HttpError::InvalidContentLength(v) => write!(f, "invalid Content-Length {:?}", v),
            HttpError::ResourceNotFound => write!(f, "resource not found"),
            HttpError::ProcessCreation(e) => write!(f, "cannot start CGI program: {}", e),
            HttpError::ChildFailed(why) => write!(f, "CGI program failed: {}", why),
            HttpError::ConnectionReset(e) => write!(f, "connection reset: {}", e),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::ProcessCreation(e) | HttpError::ConnectionReset(e) => Some(e),
            _ => None,
        }
    }
}
