//! A static-file HTTP serving core: URL → file under a root, with content
//! negotiation for compression, an in-memory artifact cache, streaming
//! with explicit backpressure, byte-range requests, and index resolution.
//!
//! [`Dispatcher`] is the entry point; pair it with [`server::serve_connection`]
//! to run it over a real `TcpStream`, or embed it behind a different
//! `HttpWriter`/`RequestState` source entirely.

pub mod cache;
pub mod compress;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod mime;
pub mod negotiation;
pub mod path;
pub mod pump;
pub mod range;
pub mod reader;
pub mod request;
pub mod server;
pub mod writer;

pub use cache::{Artifact, ArtifactCache, IndexMemo};
pub use config::{Config, ConfigBuilder, IndexFn, IndexOutcome, IndexPolicy, TransformFn};
pub use dispatcher::Dispatcher;
pub use error::ServeError;
pub use mime::MimeType;
pub use negotiation::Encoding;
pub use request::RequestState;
pub use writer::HttpWriter;
