#[cfg(test)]
mod tests;

use std::process;
use std::thread;
use std::time::Duration;

use clap::Parser;
use kurl::{fetch, Args, Options, Trace};
use log::{error, LevelFilter};

/// kurl - A curl-like HTTP client
fn main() {
    let args = Args::parse();
    init_logging(&args);

    let options = match Options::from_args(&args) {
        Ok(options) => options,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    if let Some(limit) = options.max_time {
        start_watchdog(limit);
    }

    let mut transport = options.transport();
    let mut trace = Trace::new(options.verbose, options.head);
    let mut failed = false;

    for target in &args.urls {
        if let Err(err) = fetch(&options, target, &mut transport, &mut trace) {
            error!("{}: {}", target, err);
            if err.is_fatal() {
                process::exit(1);
            }
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
}

/// `-s` silences everything, `-v` shows progress messages, `RUST_LOG` overrides both.
fn init_logging(args: &Args) {
    let level = if args.silent {
        LevelFilter::Off
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// Abort the whole invocation once `limit` has passed.
fn start_watchdog(limit: Duration) {
    thread::spawn(move || {
        thread::sleep(limit);
        error!("Operation timed out after {} seconds", limit.as_secs());
        process::exit(28);
    });
}
