//! Configuration (spec §3): immutable, bound to a handler instance for its
//! lifetime. Built with a `with_*` chain, the idiom already used for
//! compression configuration elsewhere in this corpus
//! (`other_examples/55516978_...armature.../static_assets.rs::CompressionConfig`).

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::cache::Artifact;
use crate::negotiation::Encoding;
use crate::request::RequestState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The response was already ended (e.g. a `301` rewrite was written).
    Done,
    /// Skip index logic; serve the URL as-is.
    FallThrough,
    /// Treat as a rewrite path relative to `root`; re-validated for containment.
    Rewrite(String),
}

/// A caller-supplied index function. The spec's `Async` return variant is
/// not a separate tag here: in Rust, awaiting this future already *is*
/// "evaluate until a non-Async terminal is reached" (see SPEC_FULL.md §10.R).
pub type IndexFn = Arc<dyn Fn(RequestState, PathBuf) -> BoxFuture<'static, IndexOutcome> + Send + Sync>;

/// Optional pre-compression hook (spec §3's `transform`): sees the
/// whole-body `Artifact` before compression and may mutate `bytes`/`type`.
pub type TransformFn = Arc<dyn Fn(Artifact) -> BoxFuture<'static, Artifact> + Send + Sync>;

/// Optional replacement for the default `404` response (spec §3's
/// `notFound`). Returns `(status, reason, body)`, written out verbatim in
/// place of the hardcoded `(404, "Not Found", "Not Found")` triple.
pub type NotFoundFn = Arc<dyn Fn() -> BoxFuture<'static, (u16, String, String)> + Send + Sync>;

/// Optional replacement for the default `500` response (spec §3's
/// `internalError`). Receives the error rendered to a string; returns
/// `(status, reason, body)` in place of the hardcoded
/// `(500, "Internal Server Error", "Internal Server Error")` triple.
pub type InternalErrorFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, (u16, String, String)> + Send + Sync>;

#[derive(Clone)]
pub enum IndexPolicy {
    Off,
    Default,
    Custom(IndexFn),
}

impl std::fmt::Debug for IndexPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexPolicy::Off => write!(f, "IndexPolicy::Off"),
            IndexPolicy::Default => write!(f, "IndexPolicy::Default"),
            IndexPolicy::Custom(_) => write!(f, "IndexPolicy::Custom(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub base: String,
    pub root: PathBuf,
    pub index: IndexPolicy,
    pub secure: bool,
    pub compressions: Vec<Encoding>,
    pub last_modified: bool,
    pub etag: bool,
    pub cache: bool,
    pub min_stream_size: u64,
    pub max_cache_size: u64,
    pub min_compress_size: u64,
    pub transform: Option<TransformFn>,
    pub not_found: Option<NotFoundFn>,
    pub internal_error: Option<InternalErrorFn>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base", &self.base)
            .field("root", &self.root)
            .field("index", &self.index)
            .field("secure", &self.secure)
            .field("compressions", &self.compressions)
            .field("last_modified", &self.last_modified)
            .field("etag", &self.etag)
            .field("cache", &self.cache)
            .field("min_stream_size", &self.min_stream_size)
            .field("max_cache_size", &self.max_cache_size)
            .field("min_compress_size", &self.min_compress_size)
            .field("transform", &self.transform.as_ref().map(|_| ".."))
            .field("not_found", &self.not_found.as_ref().map(|_| ".."))
            .field("internal_error", &self.internal_error.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Config {
    pub fn builder(root: impl Into<PathBuf>) -> ConfigBuilder {
        ConfigBuilder::new(root)
    }
}

pub struct ConfigBuilder {
    root: PathBuf,
    base: String,
    index: IndexPolicy,
    secure: bool,
    compressions: Option<Vec<Encoding>>,
    last_modified: bool,
    etag: bool,
    cache: bool,
    min_stream_size: u64,
    max_cache_size: u64,
    min_compress_size: u64,
    transform: Option<TransformFn>,
    not_found: Option<NotFoundFn>,
    internal_error: Option<InternalErrorFn>,
}

impl ConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base: String::new(),
            index: IndexPolicy::Default,
            secure: false,
            compressions: None,
            last_modified: true,
            etag: true,
            cache: true,
            min_stream_size: 512 * 1024,
            max_cache_size: 2 * 1024 * 1024,
            min_compress_size: 1280,
            transform: None,
            not_found: None,
            internal_error: None,
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn index(mut self, policy: IndexPolicy) -> Self {
        self.index = policy;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn compressions(mut self, compressions: Vec<Encoding>) -> Self {
        self.compressions = Some(compressions);
        self
    }

    pub fn last_modified(mut self, enabled: bool) -> Self {
        self.last_modified = enabled;
        self
    }

    pub fn etag(mut self, enabled: bool) -> Self {
        self.etag = enabled;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn min_stream_size(mut self, size: u64) -> Self {
        self.min_stream_size = size;
        self
    }

    pub fn max_cache_size(mut self, size: u64) -> Self {
        self.max_cache_size = size;
        self
    }

    pub fn min_compress_size(mut self, size: u64) -> Self {
        self.min_compress_size = size;
        self
    }

    pub fn transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn not_found(mut self, hook: NotFoundFn) -> Self {
        self.not_found = Some(hook);
        self
    }

    pub fn internal_error(mut self, hook: InternalErrorFn) -> Self {
        self.internal_error = Some(hook);
        self
    }

    pub fn build(self) -> Config {
        let compressions = self.compressions.unwrap_or_else(|| {
            if self.secure {
                vec![Encoding::Br, Encoding::Gzip, Encoding::Deflate]
            } else {
                vec![Encoding::Gzip, Encoding::Deflate]
            }
        });

        Config {
            base: self.base,
            root: self.root,
            index: self.index,
            secure: self.secure,
            compressions,
            last_modified: self.last_modified,
            etag: self.etag,
            cache: self.cache,
            min_stream_size: self.min_stream_size,
            max_cache_size: self.max_cache_size,
            min_compress_size: self.min_compress_size,
            transform: self.transform,
            not_found: self.not_found,
            internal_error: self.internal_error,
        }
    }
}
