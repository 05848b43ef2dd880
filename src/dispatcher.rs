//! Dispatcher (spec §4.7): constructs `RequestState`, branches on index
//! resolution, then hands off to the File reader. The one place that maps
//! a `ServeError` onto a wire response (spec §7's propagation policy).

use std::sync::Arc;

use crate::cache::{ArtifactCache, IndexMemo};
use crate::config::Config;
use crate::emitter::emit_error;
use crate::error::ServeError;
use crate::path::{self, PathOutcome};
use crate::reader;
use crate::request::RequestState;
use crate::writer::HttpWriter;

struct Inner {
    config: Config,
    cache: ArtifactCache,
    index_memo: IndexMemo,
}

/// Owns `Config` plus both caches for a handler instance's lifetime (spec
/// §3's ownership rule); cheap to `Clone` into every connection task since
/// the shared state lives behind an `Arc` (spec §5).
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                cache: ArtifactCache::new(),
                index_memo: IndexMemo::new(),
            }),
        }
    }

    pub async fn handle(&self, writer: &mut dyn HttpWriter, request: RequestState) {
        let result = self.dispatch(writer, &request).await;
        if let Err(e) = result {
            if request.is_aborted() {
                return;
            }
            self.emit_error_response(writer, &e).await;
        }
    }

    async fn dispatch(&self, writer: &mut dyn HttpWriter, request: &RequestState) -> Result<(), ServeError> {
        let config = &self.inner.config;

        let index_active = !matches!(config.index, crate::config::IndexPolicy::Off);
        if request.ext.is_empty() && index_active {
            let outcome = path::resolve(config, &self.inner.index_memo, request).await?;
            match outcome {
                PathOutcome::Done => return Ok(()),
                PathOutcome::Redirect(target) => {
                    return self.emit_redirect(writer, &target).await;
                }
                PathOutcome::Serve(resolved) => {
                    return reader::handle_file(writer, config, &self.inner.cache, request, &resolved).await;
                }
            }
        }

        let resolved = path::resolve_plain(config, &request.url)?;
        reader::handle_file(writer, config, &self.inner.cache, request, &resolved).await
    }

    async fn emit_redirect(&self, writer: &mut dyn HttpWriter, location: &str) -> Result<(), ServeError> {
        writer.write_status(301, "Moved Permanently");
        writer.write_header("Connection", "keep-alive");
        writer.write_header("Location", location);
        writer.write_header("Content-Length", "0");
        writer.cork_flush().await.map_err(ServeError::Internal)?;
        let (_, done) = writer.try_end(&[], 0).map_err(ServeError::Internal)?;
        if !done {
            writer.writable().await.map_err(ServeError::Internal)?;
        }
        writer.end().await.map_err(ServeError::Internal)
    }

    async fn emit_error_response(&self, writer: &mut dyn HttpWriter, error: &ServeError) {
        let config = &self.inner.config;
        let result = match error {
            ServeError::NotFound => {
                if let Some(hook) = &config.not_found {
                    let (status, reason, body) = hook().await;
                    emit_error(writer, status, &reason, &body).await
                } else {
                    emit_error(writer, 404, "Not Found", "Not Found").await
                }
            }
            ServeError::NotSatisfiable { size } => {
                self.emit_not_satisfiable(writer, *size).await
            }
            ServeError::Internal(e) => {
                log::error!("internal error: {e}");
                if let Some(hook) = &config.internal_error {
                    let (status, reason, body) = hook(e.to_string()).await;
                    emit_error(writer, status, &reason, &body).await
                } else {
                    emit_error(writer, 500, "Internal Server Error", "Internal Server Error").await
                }
            }
        };
        if let Err(e) = result {
            log::error!("failed to emit error response: {e}");
        }
    }

    /// `416` carries `Content-Range: bytes */<size-1>` (spec §6, §7), which
    /// `emit_error` doesn't know about, so it's written directly here.
    async fn emit_not_satisfiable(&self, writer: &mut dyn HttpWriter, size: u64) -> Result<(), ServeError> {
        let body = "Range Not Satisfiable";
        writer.write_status(416, "Range Not Satisfiable");
        writer.write_header("Connection", "keep-alive");
        writer.write_header("Content-Range", &format!("bytes */{}", size.saturating_sub(1)));
        writer.write_header("Content-Type", "text/plain; charset=utf-8");
        writer.write_header("Content-Length", &body.len().to_string());
        writer.cork_flush().await.map_err(ServeError::Internal)?;
        let (_, done) = writer.try_end(body.as_bytes(), body.len() as u64).map_err(ServeError::Internal)?;
        if !done {
            writer.writable().await.map_err(ServeError::Internal)?;
        }
        writer.end().await.map_err(ServeError::Internal)
    }
}
