//! Serialized filter programs
//!
//! The wire format is the kernel's own: a flat sequence of 8-byte
//! `sock_filter` records in native byte order, at most 512 of them. A byte
//! stream is validated in full before any record is decoded.

use thiserror::Error;

use crate::insn::Instruction;

/// Kernel ceiling on filter length (BPF_MAXINSNS)
pub const MAX_INSTRUCTIONS: usize = 512;
/// Size of one serialized instruction record
pub const INSTRUCTION_SIZE: usize = 8;
/// Largest well-formed serialized program
pub const MAX_PROGRAM_BYTES: usize = MAX_INSTRUCTIONS * INSTRUCTION_SIZE;

/// Reasons a byte stream or instruction sequence is rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,

    #[error("length {0} bytes is not a multiple of the 8-byte record size")]
    NotAligned(usize),

    #[error("{0} instructions exceed the 512-instruction kernel limit")]
    TooLong(usize),
}

/// A validated, immutable BPF filter program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterProgram {
    insns: Vec<Instruction>,
}

impl FilterProgram {
    /// Wrap an instruction sequence, enforcing the kernel length limits
    pub fn new(insns: Vec<Instruction>) -> Result<Self, ProgramError> {
        if insns.is_empty() {
            return Err(ProgramError::Empty);
        }
        if insns.len() > MAX_INSTRUCTIONS {
            return Err(ProgramError::TooLong(insns.len()));
        }
        Ok(Self { insns })
    }

    /// Wrap instructions the compiler has already bounds-checked
    pub(crate) fn new_unchecked(insns: Vec<Instruction>) -> Self {
        Self { insns }
    }

    /// Instruction count (1..=512 by construction)
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.insns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.insns.iter()
    }

    /// Serialize to the kernel record format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.insns.len() * INSTRUCTION_SIZE);
        for insn in &self.insns {
            bytes.extend_from_slice(&insn.to_bytes());
        }
        bytes
    }

    /// Parse the kernel record format; every length check runs before the
    /// first record is decoded
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProgramError> {
        if bytes.is_empty() {
            return Err(ProgramError::Empty);
        }
        if bytes.len() % INSTRUCTION_SIZE != 0 {
            return Err(ProgramError::NotAligned(bytes.len()));
        }
        if bytes.len() > MAX_PROGRAM_BYTES {
            return Err(ProgramError::TooLong(bytes.len() / INSTRUCTION_SIZE));
        }

        let mut insns = Vec::with_capacity(bytes.len() / INSTRUCTION_SIZE);
        for rec in bytes.chunks_exact(INSTRUCTION_SIZE) {
            insns.push(Instruction {
                code: u16::from_ne_bytes([rec[0], rec[1]]),
                jt: rec[2],
                jf: rec[3],
                k: u32::from_ne_bytes([rec[4], rec[5], rec[6], rec[7]]),
            });
        }
        Ok(Self { insns })
    }
}
