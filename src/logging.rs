//! Wrapper around `tracing_subscriber` for logging.
//!
//! Logs go to stderr at the `INFO` level unless `RUST_LOG` says otherwise.
//! Hosts that install their own subscriber should not call [`Logger::init`].
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, util::SubscriberInitExt};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Configure logging process-wide.
    ///
    /// Calling this multiple times is safe. Logger will be initialized only once.
    pub fn init() {
        INITIALIZED.get_or_init(setup_logging);
    }
}

fn setup_logging() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_file(false)
        .with_target(false)
        .finish()
        .try_init();
}
