use env_logger::{Builder, Env, Target};
use log::{Level, LevelFilter};
use std::io::Write;

/// Initialise logging to stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        let timestamp = buf.timestamp();
        match record.level() {
            Level::Error | Level::Warn => writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                timestamp,
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            ),
            level => writeln!(
                buf,
                "{} [{}] [{}]: {}",
                timestamp,
                level,
                record.target(),
                record.args()
            ),
        }
    });

    // HTTP stack is noisy below warn
    builder
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .target(Target::Stderr)
        .init();
}
