//! Range/Stream pump (spec §4.6): the backpressure-critical path. Used for
//! both explicit `Range` requests and the size-gated large-file case (spec
//! §4.4 step 3 hands the reader's open handle here instead of buffering).
//!
//! Two data strategies, kept split per Design Notes §9:
//! - **A. known-total** — no compressor; `HttpWriter::try_end` drives a
//!   counted transfer, retried against `writable()` on partial writes.
//! - **B. unknown-total** — a streaming compressor is interposed; the
//!   compressed length isn't known until flush, so `write_chunk` is used
//!   instead and the pump never claims "done" itself (the final `end()`
//!   call does).

use std::path::Path;
use std::time::SystemTime;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::compress::StreamCompressor;
use crate::emitter::{format_etag, format_last_modified};
use crate::error::ServeError;
use crate::negotiation::Encoding;
use crate::range::{parse_range, ByteRange};
use crate::request::RequestState;
use crate::writer::HttpWriter;

const CHUNK_SIZE: usize = 64 * 1024;

pub struct StreamRequest<'a> {
    pub path: &'a Path,
    pub size: u64,
    pub mtime: SystemTime,
    pub media_type: Option<&'static str>,
    pub encoding: Encoding,
}

/// Retries `try_end` against `writable()` until the chunk is fully
/// accepted or `total` bytes have been delivered overall (spec §4.6.A,
/// steps 1–5). Returns `true` once `total` has been satisfied.
async fn pump_known_total(
    writer: &mut dyn HttpWriter,
    mut chunk: &[u8],
    total: u64,
) -> Result<bool, ServeError> {
    let mut last_offset = writer.get_write_offset();
    loop {
        let (ok, done) = writer.try_end(chunk, total).map_err(ServeError::Internal)?;
        if done {
            return Ok(true);
        }
        if ok {
            return Ok(false);
        }
        writer.writable().await.map_err(ServeError::Internal)?;
        let offset = writer.get_write_offset();
        let consumed = (offset - last_offset) as usize;
        chunk = &chunk[consumed.min(chunk.len())..];
        last_offset = offset;
    }
}

/// Unknown-total counterpart (spec §4.6.B): writes until the chunk is
/// fully accepted, pausing on `writable()` between partial writes.
async fn pump_unknown_total(writer: &mut dyn HttpWriter, mut chunk: &[u8]) -> Result<(), ServeError> {
    let mut last_offset = writer.get_write_offset();
    while !chunk.is_empty() {
        let ok = writer.write_chunk(chunk).map_err(ServeError::Internal)?;
        let offset = writer.get_write_offset();
        let consumed = (offset - last_offset) as usize;
        chunk = &chunk[consumed.min(chunk.len())..];
        last_offset = offset;
        if ok {
            break;
        }
        writer.writable().await.map_err(ServeError::Internal)?;
    }
    Ok(())
}

fn write_common_headers(
    writer: &mut dyn HttpWriter,
    last_modified: bool,
    etag: bool,
    mtime: SystemTime,
    size: u64,
    encoding: Encoding,
    media_type: Option<&'static str>,
) {
    writer.write_header("Connection", "keep-alive");
    if last_modified {
        writer.write_header("Last-Modified", &format_last_modified(mtime));
    }
    if etag {
        let weak = encoding != Encoding::Identity;
        writer.write_header("ETag", &format_etag(mtime, size, weak));
    }
    if let Some(mt) = media_type {
        writer.write_header("Content-Type", mt);
    }
    if encoding != Encoding::Identity {
        writer.write_header("Content-Encoding", encoding.name());
    }
}

/// Drives the whole range/stream response. `file` must already be
/// positioned at 0; `range_header` is the raw `Range` request header
/// (empty when absent). `last_modified`/`etag` mirror `Config`'s flags.
pub async fn stream(
    writer: &mut dyn HttpWriter,
    request: &RequestState,
    mut file: tokio::fs::File,
    req: StreamRequest<'_>,
    last_modified: bool,
    etag: bool,
) -> Result<(), ServeError> {
    let parsed = parse_range(&request.range, req.size);

    let (range_driven, range): (bool, ByteRange) = match parsed {
        None => (
            false,
            ByteRange {
                start: 0,
                end: req.size.saturating_sub(1),
            },
        ),
        Some(Ok(r)) => (true, r),
        Some(Err(size)) => return Err(ServeError::NotSatisfiable { size }),
    };

    if request.is_aborted() {
        return Ok(());
    }

    log::trace!(
        "streaming {:?} bytes {}-{} encoding={:?}",
        req.path,
        range.start,
        range.end,
        req.encoding
    );

    file.seek(std::io::SeekFrom::Start(range.start))
        .await
        .map_err(ServeError::Internal)?;

    if range_driven {
        writer.write_status(206, "Partial Content");
    } else {
        writer.write_status(200, "OK");
    }
    write_common_headers(
        writer,
        last_modified,
        etag,
        req.mtime,
        req.size,
        req.encoding,
        req.media_type,
    );
    if range_driven {
        writer.write_header(
            "Content-Range",
            &format!("bytes {}-{}/{}", range.start, range.end, req.size),
        );
    } else {
        writer.write_header("Accept-Ranges", "bytes");
    }

    let compressed = req.encoding != Encoding::Identity;
    if !compressed {
        writer.write_header("Content-Length", &range.total().to_string());
    }
    writer.cork_flush().await.map_err(ServeError::Internal)?;

    // Past this point the status line and headers are already on the wire:
    // a failure here can no longer produce a second response (spec §7). Log
    // and end the stream silently instead of propagating `Err` to a caller
    // that would otherwise try to emit a fresh error response.
    macro_rules! post_cork {
        ($expr:expr) => {
            match $expr {
                Ok(v) => v,
                Err(e) => {
                    log::error!("stream error for {:?} after headers committed: {}", req.path, e);
                    return Ok(());
                }
            }
        };
    }

    let mut remaining = range.total();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut compressor = compressed.then(|| StreamCompressor::new(req.encoding));

    while remaining > 0 {
        if request.is_aborted() {
            return Ok(());
        }
        if writer.poll_aborted() {
            request.mark_aborted();
            return Ok(());
        }
        let want = (remaining as usize).min(buf.len());
        let n = post_cork!(file.read(&mut buf[..want]).await);
        if n == 0 {
            break; // file shrank under us; nothing left to deliver
        }
        remaining -= n as u64;

        if request.is_aborted() {
            return Ok(());
        }

        match &mut compressor {
            None => {
                if post_cork!(pump_known_total(writer, &buf[..n], range.total()).await) {
                    post_cork!(writer.end().await);
                    return Ok(());
                }
            }
            Some(c) => {
                let out = post_cork!(c.feed(&buf[..n]));
                if !out.is_empty() {
                    post_cork!(pump_unknown_total(writer, &out).await);
                }
            }
        }
    }

    if let Some(c) = compressor {
        let tail = post_cork!(c.finish());
        if !tail.is_empty() {
            post_cork!(pump_unknown_total(writer, &tail).await);
        }
    }

    if request.is_aborted() {
        return Ok(());
    }
    post_cork!(writer.end().await);
    Ok(())
}
