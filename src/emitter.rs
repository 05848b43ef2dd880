//! Response emitter (spec §4.5): whole-file responses under a single cork.
//! `ETag`/`Last-Modified` formatting is shared with the range pump (§4.6),
//! which emits the same headers on a `206`.

use std::time::SystemTime;

use crate::cache::Artifact;
use crate::config::Config;
use crate::error::ServeError;
use crate::negotiation::Encoding;
use crate::writer::HttpWriter;

/// `[W/]"<hex mtime-seconds>-<hex size>"` (spec §6's wire surface). Weak
/// iff the body is compressed — compression changes byte length, so
/// byte-equality across encodings can't be promised.
pub fn format_etag(mtime: SystemTime, size: u64, weak: bool) -> String {
    let mtime_secs = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let tag = format!("\"{mtime_secs:x}-{size:x}\"");
    if weak {
        format!("W/{tag}")
    } else {
        tag
    }
}

pub fn format_last_modified(mtime: SystemTime) -> String {
    httpdate::fmt_http_date(mtime)
}

/// Writes status + headers (under cork) + body for a fully materialized
/// response. Returns once the body has been fully accepted by the writer.
pub async fn emit_whole(
    writer: &mut dyn HttpWriter,
    config: &Config,
    artifact: &Artifact,
) -> Result<(), ServeError> {
    writer.write_status(200, "OK");
    writer.write_header("Connection", "keep-alive");

    if config.last_modified {
        writer.write_header("Last-Modified", &format_last_modified(artifact.mtime));
    }
    if config.etag {
        let weak = artifact.encoding != Encoding::Identity;
        writer.write_header(
            "ETag",
            &format_etag(artifact.mtime, artifact.bytes.len() as u64, weak),
        );
    }
    if let Some(media_type) = artifact.media_type {
        writer.write_header("Content-Type", media_type);
    }
    if artifact.encoding != Encoding::Identity {
        writer.write_header("Content-Encoding", artifact.encoding.name());
    }
    writer.write_header("Content-Length", &artifact.bytes.len().to_string());

    writer.cork_flush().await.map_err(ServeError::Internal)?;

    let total = artifact.bytes.len() as u64;
    let mut offset = 0usize;
    loop {
        let (ok, done) = writer
            .try_end(&artifact.bytes[offset..], total)
            .map_err(ServeError::Internal)?;
        if done {
            break;
        }
        if ok {
            offset = writer.get_write_offset() as usize;
            continue;
        }
        writer.writable().await.map_err(ServeError::Internal)?;
        offset = writer.get_write_offset() as usize;
    }
    writer.end().await.map_err(ServeError::Internal)
}

/// Writes a minimal error response: status line, `Content-Type: text/plain`,
/// and the given body, under cork (spec §7).
pub async fn emit_error(
    writer: &mut dyn HttpWriter,
    status: u16,
    reason: &str,
    body: &str,
) -> Result<(), ServeError> {
    writer.write_status(status, reason);
    writer.write_header("Connection", "keep-alive");
    writer.write_header("Content-Type", "text/plain; charset=utf-8");
    writer.write_header("Content-Length", &body.len().to_string());
    writer.cork_flush().await.map_err(ServeError::Internal)?;
    let total = body.len() as u64;
    let bytes = body.as_bytes();
    let mut offset = 0usize;
    loop {
        let (ok, done) = writer
            .try_end(&bytes[offset..], total)
            .map_err(ServeError::Internal)?;
        if done {
            break;
        }
        if ok {
            offset = writer.get_write_offset() as usize;
            continue;
        }
        writer.writable().await.map_err(ServeError::Internal)?;
        offset = writer.get_write_offset() as usize;
    }
    writer.end().await.map_err(ServeError::Internal)
}
