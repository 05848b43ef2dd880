//! Error taxonomy for the request pipeline (spec §7).
//!
//! Every suspension point in the reader and the stream pump returns a
//! [`ServeError`]; the dispatcher maps each variant to exactly one wire
//! outcome and never writes a second status line for the same request.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// `open` returned `ENOENT`/`EISDIR`, the path escaped `root`, or index
    /// resolution found nothing.
    #[error("not found")]
    NotFound,

    /// `Range` requested `end >= size`.
    #[error("range not satisfiable, size={size}")]
    NotSatisfiable { size: u64 },

    /// Any other open/stat/read/compress/stream failure.
    #[error("internal error: {0}")]
    Internal(#[from] io::Error),
}

impl ServeError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServeError::NotFound => 404,
            ServeError::NotSatisfiable { .. } => 416,
            ServeError::Internal(_) => 500,
        }
    }
}
