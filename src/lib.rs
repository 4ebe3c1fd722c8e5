//! lbhttpd - a small HTTP/1.0 server for static files and CGI programs
//!
//! Core library for request parsing, dispatch and CGI execution.

pub mod cgi;
pub mod config;
pub mod http;
pub mod server;
