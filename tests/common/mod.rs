//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lbhttpd::config::Config;
use lbhttpd::http::connection::Connection;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A throwaway document root, removed on drop.
pub struct TempRoot {
    path: PathBuf,
}

impl TempRoot {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "lbhttpd-{}-{}-{}",
            name,
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Writes an executable shell script.
    pub fn script(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.file(rel, format!("#!/bin/sh\n{}", body).as_bytes());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn config(&self) -> Config {
        let mut cfg = Config::default();
        cfg.static_files.root = self.path.clone();
        cfg
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Runs one connection over an in-memory pipe and returns everything the
/// server wrote. Sending and receiving run side by side so large bodies
/// cannot wedge the pipe.
pub async fn exchange(cfg: Config, request: &[u8]) -> Vec<u8> {
    let (client, server) = tokio::io::duplex(64 * 1024);

    let handle = tokio::spawn(async move {
        let mut conn = Connection::new(server, Arc::new(cfg));
        conn.run().await
    });

    let (mut rd, mut wr) = tokio::io::split(client);
    let send = async {
        // The server may close before reading everything (e.g. on 501).
        let _ = wr.write_all(request).await;
        let _ = wr.shutdown().await;
    };
    let recv = async {
        let mut out = Vec::new();
        rd.read_to_end(&mut out).await.unwrap();
        out
    };
    let ((), response) = tokio::join!(send, recv);

    handle.await.unwrap().unwrap();
    response
}

pub fn status_line(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    text.lines().next().unwrap_or("").to_string()
}

/// Everything after the first blank line.
pub fn body(response: &[u8]) -> &[u8] {
    match response.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(i) => &response[i + 4..],
        None => &[],
    }
}
