pub mod fake_smtp;
pub mod temp_env;

use tracing_subscriber::filter::LevelFilter;

/// Initializes logging for a test binary. Safe to call from every test;
/// only the first call installs the subscriber.
pub fn setup_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_target(false)
        .without_time()
        .try_init();
}
