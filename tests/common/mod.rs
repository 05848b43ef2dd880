//! Shared harness: binds a real `statik::Dispatcher` to an ephemeral
//! loopback port and drives it with raw HTTP/1.1 requests, the same way
//! the teacher's integration tests poke a socket directly rather than
//! going through a client library.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use statik::{Config, Dispatcher};

pub struct TestServer {
    pub addr: std::net::SocketAddr,
}

impl TestServer {
    pub async fn start(config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dispatcher = Dispatcher::new(config);

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let dispatcher = dispatcher.clone();
                tokio::spawn(statik::server::serve_connection(stream, dispatcher, String::new()));
            }
        });

        Self { addr }
    }

    pub async fn send(&self, raw_request: &str) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw_request.as_bytes()).await.unwrap();
        read_available(&mut stream).await
    }
}

/// Reads until the peer goes quiet for a short window, since keep-alive
/// connections never signal EOF on their own.
async fn read_available(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tokio::time::timeout(Duration::from_millis(300), stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => out.extend_from_slice(&buf[..n]),
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }
    out
}

pub fn status_line(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    text.lines().next().unwrap_or("").to_string()
}

pub fn header(response: &[u8], name: &str) -> Option<String> {
    let text = String::from_utf8_lossy(response);
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim().to_string());
            }
        }
        if line.is_empty() {
            break;
        }
    }
    None
}

pub fn body(response: &[u8]) -> Vec<u8> {
    let marker = b"\r\n\r\n";
    if let Some(pos) = response
        .windows(marker.len())
        .position(|window| window == marker)
    {
        response[pos + marker.len()..].to_vec()
    } else {
        Vec::new()
    }
}
