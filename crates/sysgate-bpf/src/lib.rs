//! sysgate-bpf: policy model and classic-BPF compiler for seccomp filters
//!
//! Everything here is pure computation: declarative policies in, validated
//! instruction streams out. Installing a compiled program into the kernel
//! lives in sysgate-loader.

pub mod compiler;
pub mod insn;
pub mod policy;
pub mod program;
pub mod syscall;

pub use compiler::FilterCompiler;
pub use insn::{Arch, Instruction};
pub use policy::{Action, ArgComparison, CmpOp, FilterPolicy, SyscallId, SyscallRule};
pub use program::{
    FilterProgram, ProgramError, INSTRUCTION_SIZE, MAX_INSTRUCTIONS, MAX_PROGRAM_BYTES,
};
