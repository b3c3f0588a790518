//! Shared helpers for srctool integration tests.
//!
//! The binary under test talks plain HTTP, so the tests stand up one-shot
//! responders on a loopback listener: each accepts a single connection,
//! captures the request head, writes a canned response, and hands the
//! captured request back for assertions (e.g. on `If-Modified-Since`).

// Not every integration test file uses every helper here
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// A one-shot HTTP responder bound to an ephemeral loopback port.
pub struct OneShotServer {
    /// Base URL of the listener, e.g. `http://127.0.0.1:34567`
    pub base_url: String,
    handle: JoinHandle<String>,
}

impl OneShotServer {
    /// Serve exactly one request with the given status line and body.
    pub fn spawn(status_line: &str, body: &[u8]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let response = format!(
            "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let body = body.to_vec();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");

            // Read until the end of the request head; the tests only send
            // bodyless GETs.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).expect("read request");
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            stream.write_all(response.as_bytes()).expect("write response head");
            stream.write_all(&body).expect("write response body");
            stream.flush().ok();

            String::from_utf8_lossy(&request).to_string()
        });

        Self {
            base_url,
            handle,
        }
    }

    /// Wait for the request and return its raw head.
    pub fn into_request(self) -> String {
        self.handle.join().expect("server thread panicked")
    }
}

/// Lowercase hex SHA-256 of a byte slice, matching recipe checksum form.
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
