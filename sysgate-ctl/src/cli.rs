//! Command-line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sysgate-ctl")]
#[command(version, about = "Compile seccomp filter policies and run commands under them")]
#[command(after_help = "EXAMPLES:
    # Compile the built-in deny-unix-sockets policy
    sysgate-ctl compile filter.bpf

    # Compile a JSON policy document
    sysgate-ctl compile --policy policy.json filter.bpf

    # Run a command under a compiled filter
    sysgate-ctl apply filter.bpf curl https://example.com

    # Disassemble a compiled program
    sysgate-ctl inspect filter.bpf

    # Probe kernel support
    sysgate-ctl check
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a policy into a loadable filter program
    Compile {
        /// JSON policy document (defaults to the built-in deny-unix-sockets policy)
        #[arg(short, long, value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Output program file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Install a compiled program and execute a command under it
    Apply {
        /// Compiled program file
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// Command to execute
        #[arg(value_name = "COMMAND")]
        command: String,

        /// Arguments passed to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Disassemble a compiled program file
    Inspect {
        /// Compiled program file
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,
    },

    /// Check kernel support for filter installation
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compile_with_default_policy() {
        let cli = Cli::parse_from(["sysgate-ctl", "compile", "filter.bpf"]);
        match cli.command {
            Commands::Compile { policy, output } => {
                assert!(policy.is_none());
                assert_eq!(output, PathBuf::from("filter.bpf"));
            }
            _ => panic!("expected compile subcommand"),
        }
    }

    #[test]
    fn parses_compile_with_policy_document() {
        let cli = Cli::parse_from(["sysgate-ctl", "compile", "--policy", "p.json", "out.bpf"]);
        match cli.command {
            Commands::Compile { policy, .. } => {
                assert_eq!(policy, Some(PathBuf::from("p.json")));
            }
            _ => panic!("expected compile subcommand"),
        }
    }

    #[test]
    fn apply_passes_hyphen_arguments_through() {
        let cli = Cli::parse_from([
            "sysgate-ctl",
            "apply",
            "filter.bpf",
            "ls",
            "-la",
            "--color=never",
        ]);
        match cli.command {
            Commands::Apply { program, command, args } => {
                assert_eq!(program, PathBuf::from("filter.bpf"));
                assert_eq!(command, "ls");
                assert_eq!(args, vec!["-la", "--color=never"]);
            }
            _ => panic!("expected apply subcommand"),
        }
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::parse_from(["sysgate-ctl", "check", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }
}
