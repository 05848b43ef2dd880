//! Path resolution & containment (spec §4.1), plus default index resolution.
//!
//! Containment is enforced lexically: URL segments are joined onto `root`
//! and `..`/`.` components are resolved without touching the filesystem
//! (`Path::canonicalize` needs the target to exist, and existence is
//! already checked separately when the File reader opens the path), then
//! the result is required to still be rooted under `root` — this is the
//! only defense against traversal (spec §4.1, invariant 1 in §8).

use std::path::{Component, Path, PathBuf};

use crate::cache::IndexMemo;
use crate::config::{Config, IndexOutcome, IndexPolicy};
use crate::error::ServeError;
use crate::request::RequestState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Serve this file under `root`.
    Serve(PathBuf),
    /// Emit a `301 Moved Permanently` to this URL; dispatcher must not
    /// emit again afterward.
    Redirect(String),
    /// The index function already ended the response.
    Done,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Joins `root` with the `/`-separated, percent-decoded URL, normalizes
/// away `.`/`..`, and rejects anything that escapes `root`.
fn contained_path(config: &Config, url: &str) -> Result<PathBuf, ServeError> {
    let mut joined = config.root.clone();
    for segment in url.split('/') {
        if !segment.is_empty() {
            joined.push(segment);
        }
    }
    let normalized = normalize(&joined);
    if normalized.starts_with(&config.root) {
        Ok(normalized)
    } else {
        Err(ServeError::NotFound)
    }
}

async fn is_readable_file(path: &Path) -> bool {
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.is_file())
}

/// Default index policy steps 1–4 (spec §4.1). Returns the URL that should
/// actually be served: unchanged when nothing better is found, or a
/// sibling/child path when index resolution found one.
async fn find_index(config: &Config, stripped: &str, accept: &str) -> Result<String, ServeError> {
    let as_is = contained_path(config, stripped)?;
    if is_readable_file(&as_is).await {
        return Ok(stripped.to_string());
    }

    let suffixes: &[&str] = if accept.starts_with("text/html") {
        &["/index.html", ".html"]
    } else if accept == "*/*" {
        &["/index.js", ".js"]
    } else {
        &[]
    };

    for suffix in suffixes {
        let candidate_url = format!("{stripped}{suffix}");
        let candidate = contained_path(config, &candidate_url)?;
        if is_readable_file(&candidate).await {
            return Ok(candidate_url);
        }
    }

    Ok(stripped.to_string())
}

fn finish_default(config: &Config, stripped: &str, target: &str) -> Result<PathOutcome, ServeError> {
    if target == stripped {
        Ok(PathOutcome::Serve(contained_path(config, stripped)?))
    } else {
        Ok(PathOutcome::Redirect(target.to_string()))
    }
}

async fn default_index(
    config: &Config,
    memo: &IndexMemo,
    request: &RequestState,
) -> Result<PathOutcome, ServeError> {
    let stripped = request.url.trim_end_matches('/').to_string();

    if config.cache {
        if let Some(target) = memo.get(&request.url) {
            return finish_default(config, &stripped, &target);
        }
    }

    let target = find_index(config, &stripped, &request.accept).await?;

    if config.cache {
        memo.insert(request.url.clone(), target.clone());
    }

    finish_default(config, &stripped, &target)
}

/// Top-level entry: dispatcher calls this once it knows index resolution
/// applies (extensionless URL, index policy active — spec §4.7 step 2).
pub async fn resolve(
    config: &Config,
    memo: &IndexMemo,
    request: &RequestState,
) -> Result<PathOutcome, ServeError> {
    match &config.index {
        IndexPolicy::Off => Ok(PathOutcome::Serve(contained_path(config, &request.url)?)),
        IndexPolicy::Default => default_index(config, memo, request).await,
        IndexPolicy::Custom(index_fn) => {
            let outcome = index_fn(request.clone(), config.root.clone()).await;
            match outcome {
                IndexOutcome::Done => Ok(PathOutcome::Done),
                IndexOutcome::FallThrough => {
                    Ok(PathOutcome::Serve(contained_path(config, &request.url)?))
                }
                IndexOutcome::Rewrite(target) => {
                    Ok(PathOutcome::Serve(contained_path(config, &target)?))
                }
            }
        }
    }
}

/// The plain (non-index) file path: URL has an extension, or index policy
/// is off. Exposed separately so the dispatcher can skip the async index
/// machinery entirely on the hot path (spec §4.7 step 3).
pub fn resolve_plain(config: &Config, url: &str) -> Result<PathBuf, ServeError> {
    contained_path(config, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cfg(root: &Path) -> Config {
        Config::builder(root).build()
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = cfg(dir.path());
        let err = resolve_plain(&config, "/../etc/passwd").unwrap_err();
        assert!(matches!(err, ServeError::NotFound));
    }

    #[test]
    fn plain_path_joins_and_normalizes() {
        let dir = TempDir::new().unwrap();
        let config = cfg(dir.path());
        let path = resolve_plain(&config, "/a/./b/../c.txt").unwrap();
        assert_eq!(path, dir.path().join("a").join("c.txt"));
    }

    #[tokio::test]
    async fn serves_existing_extensionless_file_unchanged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app"), b"hi").unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), "text/html".into(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Serve(dir.path().join("app")));
    }

    #[tokio::test]
    async fn falls_back_to_index_html_for_html_accept() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app").join("index.html"), b"hi").unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), "text/html,*/*".into(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Redirect("/app/index.html".into()));
    }

    #[tokio::test]
    async fn falls_back_to_html_sibling_when_no_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.html"), b"hi").unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), "text/html".into(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Redirect("/app.html".into()));
    }

    #[tokio::test]
    async fn wildcard_accept_tries_index_js() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app").join("index.js"), b"hi").unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), "*/*".into(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Redirect("/app/index.js".into()));
    }

    #[tokio::test]
    async fn no_match_serves_url_unchanged() {
        let dir = TempDir::new().unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/missing".into(), "text/html".into(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Serve(dir.path().join("missing")));
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_memo() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app").join("index.html"), b"hi").unwrap();
        let config = cfg(dir.path());
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), "text/html".into(), String::new(), String::new());

        resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(memo.get("/app"), Some("/app/index.html".to_string()));

        // Remove the file; a memoized rewrite must still be returned without
        // re-probing the filesystem.
        fs::remove_file(dir.path().join("app").join("index.html")).unwrap();
        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Redirect("/app/index.html".into()));
    }

    #[tokio::test]
    async fn custom_index_fallthrough_serves_url_as_is() {
        use futures::FutureExt;
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app"), b"hi").unwrap();
        let config = Config::builder(dir.path())
            .index(IndexPolicy::Custom(std::sync::Arc::new(|_req, _root| {
                async { IndexOutcome::FallThrough }.boxed()
            })))
            .build();
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), String::new(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Serve(dir.path().join("app")));
    }

    #[tokio::test]
    async fn custom_index_rewrite_serves_directly_without_redirect() {
        use futures::FutureExt;
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.html"), b"hi").unwrap();
        let config = Config::builder(dir.path())
            .index(IndexPolicy::Custom(std::sync::Arc::new(|_req, _root| {
                async { IndexOutcome::Rewrite("/real.html".into()) }.boxed()
            })))
            .build();
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), String::new(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Serve(dir.path().join("real.html")));
    }

    #[tokio::test]
    async fn custom_index_rewrite_is_still_containment_checked() {
        use futures::FutureExt;
        let dir = TempDir::new().unwrap();
        let config = Config::builder(dir.path())
            .index(IndexPolicy::Custom(std::sync::Arc::new(|_req, _root| {
                async { IndexOutcome::Rewrite("/../outside".into()) }.boxed()
            })))
            .build();
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), String::new(), String::new(), String::new());

        let err = resolve(&config, &memo, &req).await.unwrap_err();
        assert!(matches!(err, ServeError::NotFound));
    }

    #[tokio::test]
    async fn custom_index_done_short_circuits() {
        use futures::FutureExt;
        let dir = TempDir::new().unwrap();
        let config = Config::builder(dir.path())
            .index(IndexPolicy::Custom(std::sync::Arc::new(|_req, _root| {
                async { IndexOutcome::Done }.boxed()
            })))
            .build();
        let memo = IndexMemo::new();
        let req = RequestState::new("/app".into(), String::new(), String::new(), String::new());

        let outcome = resolve(&config, &memo, &req).await.unwrap();
        assert_eq!(outcome, PathOutcome::Done);
    }
}
