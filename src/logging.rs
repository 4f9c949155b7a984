//! Tracing subscriber setup for hosts embedding the crawl engine

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber based on verbosity
///
/// `quiet` keeps only errors; each `verbose` step raises the crate's level.
/// Does nothing if a subscriber is already installed.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::new(filter_directives(verbose, quiet));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Logging already initialized: {}", e);
    }
}

fn filter_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }

    match verbose {
        0 => "geosweep=info,warn",
        1 => "geosweep=debug,info",
        2 => "geosweep=trace,debug",
        _ => "trace",
    }
}
