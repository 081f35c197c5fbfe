use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Logs go to stderr so they never interleave with the interview on stdout.
pub fn init(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
