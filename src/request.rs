//! Per-request mutable state (spec §3). Passed by value/reference through
//! the pipeline instead of being stashed as fields on a writer object, per
//! Design Notes §9; `aborted` is a shared atomic so a spawned pump task can
//! observe a disconnect signalled from the connection's read side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct RequestState {
    /// Decoded URL path, percent-decoded, with `base` stripped.
    pub url: String,
    /// Lowercased extension without the dot; empty when the URL has none.
    pub ext: String,
    /// Raw `Accept` header.
    pub accept: String,
    /// Raw `Accept-Encoding` header.
    pub accept_encoding: String,
    /// Raw `Range` header; empty when absent.
    pub range: String,
    aborted: Arc<AtomicBool>,
}

impl RequestState {
    pub fn new(url: String, accept: String, accept_encoding: String, range: String) -> Self {
        let ext = extension_of(&url);
        Self {
            url,
            ext,
            accept,
            accept_encoding,
            range,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.aborted.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn mark_aborted(&self) {
        self.aborted.store(true, Ordering::Release);
    }
}

fn extension_of(url: &str) -> String {
    let file_name = url.rsplit('/').next().unwrap_or("");
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() => file_name[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
