use std::fs::File;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use env_logger::{Builder, Target};

const DEFAULT_LOG_FILTER: &str = "beatclock=info";
const LOG_FILE: &str = "beatclock.log";

/// Log to a file; the terminal belongs to the UI
pub fn setup() -> EyreResult<()> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let file = File::create(LOG_FILE).wrap_err_with(|| format!("failed to create {LOG_FILE}"))?;

    Builder::new()
        .parse_filters(&directives)
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
