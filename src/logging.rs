//! Structured logging setup, mirroring the teacher's own `slog` stack:
//! async JSON drain, `RUST_LOG`-style env filtering, and a `log`-crate
//! shim so `actix-web`'s own internal logging lands in the same place.

use slog::{o, Drain, Logger};

/// Builds the process-wide root logger.
///
/// JSON records go to stdout through an async drain so logging never blocks
/// the registry actor's mailbox; `slog-envlogger` applies `RUST_LOG`-style
/// filtering on top.
pub fn init() -> Logger {
    let json_drain = slog_json::Json::new(std::io::stdout())
        .add_default_keys()
        .build()
        .fuse();
    let envlogger = slog_envlogger::new(json_drain);
    let async_drain = slog_async::Async::new(envlogger).build().fuse();
    let logger = Logger::root(async_drain, o!("service" => "pairsync-coordinator"));

    let _guard = slog_scope::set_global_logger(logger.clone());
    std::mem::forget(_guard);
    slog_stdlog::init().ok();

    logger
}
