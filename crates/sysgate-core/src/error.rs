//! Error types for policy compilation and filter loading

use std::io;
use thiserror::Error;

/// Errors detected while translating a policy into BPF instructions.
///
/// All of these are terminal: an oversize or inconsistent policy is rejected,
/// never truncated or partially emitted.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("program needs {count} instructions, over the {limit}-instruction kernel limit")]
    TooLarge { count: usize, limit: usize },

    #[error("conditional jump of {distance} instructions cannot be encoded in an 8-bit offset")]
    UnresolvableJump { distance: usize },

    #[error("rule targets {found}, but the filter is compiled for {expected}")]
    InvalidArchitecture { expected: String, found: String },

    #[error("unknown syscall '{name}' on {arch}")]
    UnknownSyscall { name: String, arch: String },

    #[error("syscall argument index {0} out of range (seccomp exposes arguments 0-5)")]
    ArgumentOutOfRange(u8),
}

/// Errors raised by the ingest -> lock -> install -> exec sequence.
///
/// Every variant is fail-closed: after a privilege lock the process must
/// exit rather than continue unfiltered.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid filter program: {0}")]
    InvalidProgram(String),

    #[error("privilege lock (PR_SET_NO_NEW_PRIVS) failed: {0}")]
    PrivilegeLockFailed(io::Error),

    #[error("kernel rejected the filter: {0}")]
    RejectedByKernel(io::Error),

    #[error("failed to execute '{command}': {source}")]
    ExecFailed { command: String, source: io::Error },
}
