//! Minimal embedding HTTP server (ambient, out of THE CORE's scope per
//! spec §1 — "the underlying non-blocking HTTP server" is named as an
//! external collaborator there). Grounded on the teacher's
//! `handle_connection_inner`: a fresh `BufReader` per request-line read,
//! manual header-line scanning via `read_until(b'\n', ..)`, no external
//! HTTP framework — extended to capture `Accept`, `Accept-Encoding`, and
//! `Range`, the headers `RequestState` needs (spec §3).

use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::dispatcher::Dispatcher;
use crate::request::RequestState;
use crate::writer::TcpWriter;

const MAX_REQUEST_LINE: usize = 8 * 1024;
const MAX_HEADER_LINE: usize = 8 * 1024;
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split(' ').filter(|p| !p.is_empty());
    let method = parts.next()?;
    let target = parts.next()?;
    parts.next()?; // HTTP version, unused beyond presence
    Some((method, target))
}

/// `name: value`, case-insensitive on `name`. Returns the trimmed value.
fn match_header<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    if key.trim().eq_ignore_ascii_case(name) {
        Some(value.trim())
    } else {
        None
    }
}

/// Decodes and strips `base` from a raw request-target path, dropping any
/// query string (spec §3's `url` is path-only).
fn decode_url(target: &str, base: &str) -> Option<String> {
    let path = target.split('?').next().unwrap_or(target);
    let decoded = percent_decode_str(path).decode_utf8().ok()?.into_owned();
    if base.is_empty() {
        Some(decoded)
    } else {
        decoded.strip_prefix(base).map(|s| s.to_string())
    }
}

/// Serves one connection: reads pipelined HTTP/1.1 requests off `stream`
/// and dispatches each through `dispatcher` until the client closes the
/// connection, sends `Connection: close`, or the idle timeout fires.
pub async fn serve_connection(mut stream: TcpStream, dispatcher: Dispatcher, base: String) {
    if timeout(CONNECTION_TIMEOUT, serve_connection_inner(&mut stream, &dispatcher, &base))
        .await
        .is_err()
    {
        log::debug!("connection timed out");
    }
}

async fn serve_connection_inner(stream: &mut TcpStream, dispatcher: &Dispatcher, base: &str) {
    loop {
        // One `BufReader` per request, reused for the request line and every
        // header line that follows it — the request line and its headers
        // routinely arrive in a single TCP segment, so a second `BufReader`
        // constructed after the first would only ever see bytes the first
        // one already pulled off the socket and buffered internally.
        let mut reader = BufReader::new(&mut *stream);

        let mut request_line = String::with_capacity(128);
        match timeout(KEEPALIVE_TIMEOUT, reader.read_line(&mut request_line)).await {
            Ok(Ok(0)) | Err(_) => return, // closed, or idle timeout between requests
            Ok(Err(_)) => return,
            Ok(Ok(n)) if n > MAX_REQUEST_LINE => return,
            Ok(Ok(_)) => {}
        }

        let request_line = trim_line(request_line.trim());
        if request_line.is_empty() {
            continue;
        }
        let Some((method, target)) = parse_request_line(request_line) else {
            return;
        };
        if method != "GET" && method != "HEAD" {
            return;
        }

        let mut accept = String::new();
        let mut accept_encoding = String::new();
        let mut range = String::new();
        let mut keep_alive = true;

        loop {
            let mut header_line = String::with_capacity(128);
            match reader.read_line(&mut header_line).await {
                Ok(0) => return,
                Ok(n) if n > MAX_HEADER_LINE => return,
                Ok(_) => {}
                Err(_) => return,
            };
            let trimmed = trim_line(&header_line);
            if trimmed.is_empty() {
                break;
            }
            if let Some(v) = match_header(trimmed, "accept") {
                accept = v.to_string();
            } else if let Some(v) = match_header(trimmed, "accept-encoding") {
                accept_encoding = v.to_string();
            } else if let Some(v) = match_header(trimmed, "range") {
                range = v.to_string();
            } else if let Some(v) = match_header(trimmed, "connection") {
                keep_alive = !v.eq_ignore_ascii_case("close");
            }
        }
        drop(reader);

        let Some(url) = decode_url(target, base) else {
            return;
        };
        let request = RequestState::new(url, accept, accept_encoding, range);

        let mut writer = TcpWriter::new(stream);
        dispatcher.handle(&mut writer, request).await;

        if !keep_alive {
            return;
        }
    }
}
