//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.0 server: one request per connection, GET
//! and POST only, static files or CGI output as the response body.
//!
//! # Architecture
//!
//! - **`line`**: reads CRLF/LF-terminated lines off the client stream
//! - **`parser`**: request line parsing and the header scan for Content-Length
//! - **`request`**: the parsed request and the `Method` enum
//! - **`resolver`**: maps URL paths onto the document root and classifies them
//! - **`static_files`**: sends a file as the response body
//! - **`response`**: status codes and the canned error pages
//! - **`writer`**: serializes heads and writes them out completely
//! - **`error`**: the per-request error taxonomy and its status mapping
//! - **`connection`**: the per-connection state machine tying these together
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Read and parse the request line
//!        └──────┬──────┘
//!               │ GET or POST
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Resolve, then serve the file or run CGI
//!        └──────┬───────────┘
//!               ├─ Served → Closed
//!               │ Error with a status (400/404/500/501)
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Send the canned error page
//!        └──────┬───────────┘
//!               └─ Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lbhttpd::config::Config;
//! use lbhttpd::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Arc::new(Config::default());
//!     let listener = TcpListener::bind("127.0.0.1:8888").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let cfg = cfg.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, cfg);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod error;
pub mod line;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod response;
pub mod static_files;
pub mod writer;
