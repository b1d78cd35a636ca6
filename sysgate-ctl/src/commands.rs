//! Implementations of the ctl subcommands

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use console::style;
use log::{debug, info};

use sysgate_bpf::{FilterCompiler, FilterPolicy, FilterProgram};
use sysgate_core::{LoaderError, SystemCapabilities};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Compile a policy document (or the built-in deny-unix-sockets policy)
/// and write the program file with owner-only permissions.
pub fn compile_policy(policy_path: Option<&Path>, output: &Path) -> CommandResult {
    let policy = match policy_path {
        Some(path) => {
            debug!("reading policy document {}", path.display());
            let text = fs::read_to_string(path)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            serde_json::from_str::<FilterPolicy>(&text)
                .map_err(|e| format!("{}: {}", path.display(), e))?
        }
        None => {
            debug!("no policy document given, using the built-in deny-unix-sockets policy");
            FilterPolicy::deny_unix_sockets()
        }
    };

    let program = FilterCompiler::compile(&policy)?;
    let bytes = program.to_bytes();

    // the program decides process fate, so keep it owner-only
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(output)?;
    file.write_all(&bytes)?;

    info!(
        "wrote {} instructions to {}",
        program.len(),
        output.display()
    );
    println!(
        "compiled {} instructions ({} bytes) for {} -> {}",
        program.len(),
        bytes.len(),
        policy.arch,
        output.display()
    );
    Ok(())
}

/// Install the program and execute the command under it. Returns only
/// when some stage of the sequence failed.
pub fn apply_program(program: &Path, command: &str, args: &[String]) -> LoaderError {
    info!("applying {} before exec of {}", program.display(), command);
    sysgate_loader::apply_and_exec(program, command, args)
}

/// Decode a compiled program file and print a disassembly listing.
pub fn inspect_program(path: &Path) -> CommandResult {
    let bytes = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let program = FilterProgram::from_bytes(&bytes)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    println!(
        "{} ({} instructions, {} bytes)",
        path.display(),
        program.len(),
        bytes.len()
    );
    for (idx, insn) in program.iter().enumerate() {
        println!(
            "  {:>4}: {:#06x} {:>3} {:>3} {:#010x}  {}",
            idx, insn.code, insn.jt, insn.jf, insn.k, insn
        );
    }
    Ok(())
}

/// Probe the kernel and print what filter installation would need.
pub fn check_support() {
    println!("Checking seccomp filter support...\n");

    let caps = SystemCapabilities::detect();
    println!("{}", caps.summary());
    println!();

    if caps.can_install_filter() {
        println!(
            "{} filters can be installed on this kernel (root not required)",
            style("ready:").green().bold()
        );
    } else {
        println!(
            "{} this kernel cannot install seccomp filters",
            style("unsupported:").red().bold()
        );
    }
}
