//! Tracing setup for the `quiz` binary.
//!
//! - `QUIZ_LOG` holds the filter directives (default `warn`).
//! - `QUIZ_LOG_FORMAT=json` switches to structured JSON lines.
//!
//! Logs always go to stderr so stdout stays usable for JSON output.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "QUIZ_LOG";
pub const LOG_FORMAT_ENV: &str = "QUIZ_LOG_FORMAT";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in tests.
    let _ = match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
}
