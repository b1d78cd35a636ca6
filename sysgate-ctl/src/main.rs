//! sysgate controller CLI - compile seccomp filter policies and run
//! commands under them

mod cli;
mod commands;
mod logging;

use clap::Parser;
use console::style;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Compile { policy, output } => {
            commands::compile_policy(policy.as_deref(), &output)
        }
        Commands::Apply {
            program,
            command,
            args,
        } => {
            // apply_program comes back only when a stage failed
            Err(commands::apply_program(&program, &command, &args).into())
        }
        Commands::Inspect { program } => commands::inspect_program(&program),
        Commands::Check => {
            commands::check_support();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}
