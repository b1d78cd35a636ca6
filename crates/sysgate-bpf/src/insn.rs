//! Classic-BPF instruction model and the kernel constants it encodes

use std::fmt;

use serde::{Deserialize, Serialize};

/// One classic-BPF instruction, layout-identical to the kernel's
/// `sock_filter`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

impl Instruction {
    /// Non-jumping statement (load or return)
    pub const fn stmt(code: u16, k: u32) -> Self {
        Self {
            code,
            jt: 0,
            jf: 0,
            k,
        }
    }

    /// Conditional jump with explicit true/false displacements
    pub const fn jump(code: u16, k: u32, jt: u8, jf: u8) -> Self {
        Self { code, jt, jf, k }
    }

    /// Load the 32-bit word at `offset` within seccomp_data
    pub const fn load_abs(offset: u32) -> Self {
        Self::stmt(opcode::LD_W_ABS, offset)
    }

    /// Terminal verdict
    pub const fn ret(k: u32) -> Self {
        Self::stmt(opcode::RET_K, k)
    }

    /// Serialize to the 8-byte kernel record, native byte order
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..2].copy_from_slice(&self.code.to_ne_bytes());
        out[2] = self.jt;
        out[3] = self.jf;
        out[4..8].copy_from_slice(&self.k.to_ne_bytes());
        out
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            opcode::LD_W_ABS => write!(f, "ld [{}]", self.k),
            opcode::JEQ_K => write!(f, "jeq #{:#x} jt {} jf {}", self.k, self.jt, self.jf),
            opcode::JGT_K => write!(f, "jgt #{:#x} jt {} jf {}", self.k, self.jt, self.jf),
            opcode::JGE_K => write!(f, "jge #{:#x} jt {} jf {}", self.k, self.jt, self.jf),
            opcode::JA => write!(f, "ja +{}", self.k),
            opcode::RET_K => write!(f, "ret {}", verdict_name(self.k)),
            _ => write!(
                f,
                ".raw {:#06x} {} {} {:#010x}",
                self.code, self.jt, self.jf, self.k
            ),
        }
    }
}

fn verdict_name(k: u32) -> String {
    match k & action::SECCOMP_RET_ACTION_FULL {
        action::SECCOMP_RET_ALLOW => "ALLOW".to_string(),
        action::SECCOMP_RET_TRAP => "TRAP".to_string(),
        action::SECCOMP_RET_ERRNO => format!("ERRNO({})", k & action::SECCOMP_RET_DATA),
        action::SECCOMP_RET_KILL_PROCESS => "KILL_PROCESS".to_string(),
        action::SECCOMP_RET_KILL_THREAD => "KILL_THREAD".to_string(),
        _ => format!("{:#010x}", k),
    }
}

/// BPF opcodes used by seccomp filters
pub mod opcode {
    /// Load a 32-bit word from an absolute seccomp_data offset
    pub const LD_W_ABS: u16 = 0x20;
    /// Jump if accumulator equals the constant
    pub const JEQ_K: u16 = 0x15;
    /// Jump if accumulator is greater than the constant
    pub const JGT_K: u16 = 0x25;
    /// Jump if accumulator is greater than or equal to the constant
    pub const JGE_K: u16 = 0x35;
    /// Unconditional forward jump
    pub const JA: u16 = 0x05;
    /// Return the constant as the filter verdict
    pub const RET_K: u16 = 0x06;
}

/// Seccomp verdict codes (action half of a filter's return value)
pub mod action {
    /// Kill the whole process
    pub const SECCOMP_RET_KILL_PROCESS: u32 = 0x80000000;
    /// Kill the calling thread
    pub const SECCOMP_RET_KILL_THREAD: u32 = 0x00000000;
    /// Deliver SIGSYS to the calling thread
    pub const SECCOMP_RET_TRAP: u32 = 0x00030000;
    /// Fail the syscall with the errno in the data bits
    pub const SECCOMP_RET_ERRNO: u32 = 0x00050000;
    /// Let the syscall proceed
    pub const SECCOMP_RET_ALLOW: u32 = 0x7fff0000;
    /// Mask selecting the errno payload
    pub const SECCOMP_RET_DATA: u32 = 0x0000ffff;
    /// Mask selecting the action half
    pub const SECCOMP_RET_ACTION_FULL: u32 = 0xffff0000;
}

/// Audit architecture identifiers reported in `seccomp_data.arch`
pub mod audit {
    pub const AUDIT_ARCH_X86_64: u32 = 0xc000003e;
    pub const AUDIT_ARCH_AARCH64: u32 = 0xc00000b7;
}

/// Target architecture of a compiled filter
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// The architecture this build targets
    pub fn native() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Arch::X86_64
        }
        #[cfg(target_arch = "aarch64")]
        {
            Arch::Aarch64
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            compile_error!("sysgate supports x86_64 and aarch64 targets")
        }
    }

    /// The value the kernel reports for this ABI
    pub fn audit_value(self) -> u32 {
        match self {
            Arch::X86_64 => audit::AUDIT_ARCH_X86_64,
            Arch::Aarch64 => audit::AUDIT_ARCH_AARCH64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
