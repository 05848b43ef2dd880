//! File reader (spec §4.4): opens, stats, and either serves from/into the
//! artifact cache or hands the open handle to the Range/Stream pump for
//! large files and range requests.

use std::io;
use std::path::Path;

use bytes::Bytes;

use crate::cache::{Artifact, ArtifactCache};
use crate::compress::compress_whole;
use crate::config::Config;
use crate::emitter::emit_whole;
use crate::error::ServeError;
use crate::mime::get_mime_type_enum;
use crate::negotiation::get_encoding;
use crate::pump::{self, StreamRequest};
use crate::request::RequestState;
use crate::writer::HttpWriter;

fn not_found_or_internal(e: io::Error) -> ServeError {
    if e.kind() == io::ErrorKind::NotFound {
        ServeError::NotFound
    } else {
        ServeError::Internal(e)
    }
}

/// Drives the full reader flow against an already containment-checked
/// absolute `path` (spec §4.4, steps 1–8).
pub async fn handle_file(
    writer: &mut dyn HttpWriter,
    config: &Config,
    cache: &ArtifactCache,
    request: &RequestState,
    path: &Path,
) -> Result<(), ServeError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(not_found_or_internal)?;

    if request.is_aborted() {
        return Ok(());
    }

    let metadata = file.metadata().await.map_err(not_found_or_internal)?;
    if metadata.is_dir() {
        return Err(ServeError::NotFound);
    }

    if request.is_aborted() {
        return Ok(());
    }

    let size = metadata.len();
    let mtime = metadata.modified().map_err(ServeError::Internal)?;
    let media_type = get_mime_type_enum(path);

    let encoding = if size < config.min_compress_size {
        crate::negotiation::Encoding::Identity
    } else {
        get_encoding(&request.accept_encoding, &config.compressions, media_type)
            .unwrap_or(crate::negotiation::Encoding::Identity)
    };

    // A `Range` header always routes through the pump, cache or no cache —
    // a cache hit is a whole materialized body with no notion of a byte
    // window, so serving it here would silently upgrade a 206 request into
    // a 200 (spec §8 invariant 5). The pump re-reads/seeks `file` itself.
    let range_driven = !request.range.is_empty();

    if config.cache && !range_driven {
        if let Some(artifact) = cache.get(path, encoding, mtime) {
            if request.is_aborted() {
                return Ok(());
            }
            return emit_whole(writer, config, &artifact).await;
        }
    }

    if range_driven || size >= config.min_stream_size {
        return pump::stream(
            writer,
            request,
            file,
            StreamRequest {
                path,
                size,
                mtime,
                media_type: Some(media_type.as_str()),
                encoding,
            },
            config.last_modified,
            config.etag,
        )
        .await;
    }

    let mut bytes = Vec::with_capacity(size as usize);
    {
        use tokio::io::AsyncReadExt;
        let mut file = file;
        file.read_to_end(&mut bytes)
            .await
            .map_err(ServeError::Internal)?;
    }

    if request.is_aborted() {
        return Ok(());
    }

    let mut artifact = Artifact {
        path: path.to_path_buf(),
        mtime,
        bytes: Bytes::from(bytes),
        encoding: crate::negotiation::Encoding::Identity,
        media_type: Some(media_type.as_str()),
    };

    if let Some(transform) = &config.transform {
        artifact = transform(artifact).await;
        if request.is_aborted() {
            return Ok(());
        }
    }

    if encoding != crate::negotiation::Encoding::Identity {
        let compressed = compress_whole(&artifact.bytes, encoding).map_err(ServeError::Internal)?;
        artifact.bytes = Bytes::from(compressed);
        artifact.encoding = encoding;
    }

    if request.is_aborted() {
        return Ok(());
    }

    if config.cache && size < config.max_cache_size {
        cache.insert(artifact.clone());
    } else if config.cache {
        log::debug!("skipping cache admission for {:?}: size {} >= max_cache_size", path, size);
    }

    if request.is_aborted() {
        return Ok(());
    }

    emit_whole(writer, config, &artifact).await
}
