//! Logging setup.
//!
//! Logs go to stderr so the report on stdout stays machine readable. The
//! level follows the command line (`--verbose` debug, `--quiet` warn, info
//! otherwise); `RUST_LOG` overrides it when set.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Level implied by the command line flags
pub fn level(verbose: bool, quiet: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger. Later calls are ignored.
pub fn init(verbose: bool, quiet: bool) {
    let _ = Builder::new()
        .target(Target::Stderr)
        .filter_level(level(verbose, quiet))
        .parse_env(Env::default())
        .format_timestamp(None)
        .try_init();
}
