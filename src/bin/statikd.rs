//! Process entry point (ambient, out of THE CORE's scope per spec §1).
//! Grounded on the teacher's `main`/`shutdown_signal`: a `tokio::select!`
//! accept loop with a Ctrl-C/SIGTERM shutdown path, `tokio::spawn` per
//! connection, `TCP_NODELAY` on.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::signal;

use statik::{Config, Dispatcher};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ROOT: &str = "./content";

struct EnvConfig {
    root: PathBuf,
    port: u16,
    workers: usize,
    compressions: Option<Vec<statik::Encoding>>,
}

fn parse_compressions(raw: &str) -> Vec<statik::Encoding> {
    raw.split(',')
        .filter_map(|token| match token.trim() {
            "br" => Some(statik::Encoding::Br),
            "gzip" => Some(statik::Encoding::Gzip),
            "deflate" => Some(statik::Encoding::Deflate),
            "identity" => Some(statik::Encoding::Identity),
            _ => None,
        })
        .collect()
}

/// Reads `STATIK_ROOT`, `STATIK_PORT`, `STATIK_WORKERS`, `STATIK_COMPRESSIONS`,
/// falling back to the teacher's own constants as defaults.
fn env_config() -> EnvConfig {
    let root = std::env::var("STATIK_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT));
    let port = std::env::var("STATIK_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let workers = std::env::var("STATIK_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(num_cpus_fallback);
    let compressions = std::env::var("STATIK_COMPRESSIONS")
        .ok()
        .map(|v| parse_compressions(&v));

    EnvConfig {
        root,
        port,
        workers,
        compressions,
    }
}

/// `num_cpus` isn't in this corpus's dependency set; `available_parallelism`
/// is the stdlib equivalent and needs no extra crate.
fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let env = env_config();
    let mut builder = Config::builder(&env.root);
    if let Some(compressions) = env.compressions {
        builder = builder.compressions(compressions);
    }
    let config = builder.build();
    let base = config.base.clone();
    let dispatcher = Dispatcher::new(config);

    let listener = TcpListener::bind(("0.0.0.0", env.port))
        .await
        .unwrap_or_else(|e| panic!("failed to bind 0.0.0.0:{}: {e}", env.port));

    log::info!(
        "statikd listening on 0.0.0.0:{} root={:?} workers={}",
        env.port,
        env.root,
        env.workers
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let _ = stream.set_nodelay(true);
                        let dispatcher = dispatcher.clone();
                        let base = base.clone();
                        tokio::spawn(statik::server::serve_connection(stream, dispatcher, base));
                    }
                    Err(e) => {
                        log::warn!("accept failed: {e}");
                    }
                }
            }
            _ = shutdown_signal() => {
                log::info!("shutdown signal received");
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
