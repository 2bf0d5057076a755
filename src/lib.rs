pub mod application;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod window;

pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging()
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
