//! Logger setup with colored level tags

use console::style;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

/// Initialize the process logger. `verbose` switches the whole stack to
/// debug level and adds the log target to each line; `RUST_LOG` still
/// overrides the filter.
pub fn init_logger(verbose: bool) {
    let env = Env::default().filter_or("RUST_LOG", if verbose { "debug" } else { "warn" });

    Builder::from_env(env)
        .format(move |buf, record| {
            let level = match record.level() {
                Level::Error => format!("{}", style("error").red().bold()),
                Level::Warn => format!("{}", style("warn ").yellow().bold()),
                Level::Info => format!("{}", style("info ").green()),
                Level::Debug => format!("{}", style("debug").cyan()),
                Level::Trace => format!("{}", style("trace").dim()),
            };

            if verbose {
                writeln!(
                    buf,
                    "{} {} {}",
                    level,
                    style(record.target()).dim(),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {}", level, record.args())
            }
        })
        .filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();
}
