//! Log output for `vglink`.
//!
//! The engine logs through the `log` facade. A `tracing-subscriber` fmt layer
//! on stderr picks those records up through its `log` bridge, leaving stdout
//! to the JSON result.

use std::io::IsTerminal;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Level for a `-v` count: warnings by default, `-v` info, `-vv` debug,
/// `-vvv` and up trace. `--quiet` wins and silences everything.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Filter for the stderr layer. `RUST_LOG` directives refine the default
/// level unless output is switched off.
fn env_filter(level: LevelFilter) -> EnvFilter {
    if level == LevelFilter::OFF {
        return EnvFilter::new("off");
    }
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the stderr subscriber and the `log` bridge. A second call is a no-op.
pub fn init(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(env_filter(level))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }

    #[test]
    fn verbosity_ladder() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
    }
}
