//! Policy-to-BPF compilation
//!
//! Lowers an ordered rule policy into the flat conditional-jump chain the
//! kernel verifier accepts: forward-only jumps, a verdict on every path,
//! at most 512 instructions. Compilation is deterministic; the same policy
//! always produces the same bytes.

use sysgate_core::CompileError;

use crate::insn::{action, opcode, Arch, Instruction};
use crate::policy::{ArgComparison, CmpOp, FilterPolicy, SyscallId, SyscallRule};
use crate::program::{FilterProgram, MAX_INSTRUCTIONS};
use crate::syscall;

/// Offset of the syscall number within seccomp_data
const SECCOMP_DATA_NR: u32 = 0;
/// Offset of the audit architecture word
const SECCOMP_DATA_ARCH: u32 = 4;
/// Offset of the first 64-bit argument slot
const SECCOMP_DATA_ARGS: u32 = 16;
const ARG_SLOT_SIZE: u32 = 8;
/// Argument slots seccomp_data exposes
const ARG_COUNT: u8 = 6;

/// BPF filter compiler
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compile a policy into a loadable program.
    ///
    /// The emitted layout is an architecture guard, one jump chain per rule
    /// in declaration order, and the default verdict. The first rule whose
    /// syscall number and argument predicates all match decides the
    /// verdict; later rules for the same syscall are unreachable.
    pub fn compile(policy: &FilterPolicy) -> Result<FilterProgram, CompileError> {
        let mut out = Vec::new();

        emit_arch_guard(&mut out, policy.arch);

        for rule in &policy.rules {
            let nr = resolve_rule(rule, policy.arch)?;
            emit_rule(&mut out, rule, nr)?;
        }

        out.push(Instruction::ret(policy.default_action.ret_value()));

        if out.len() > MAX_INSTRUCTIONS {
            return Err(CompileError::TooLarge {
                count: out.len(),
                limit: MAX_INSTRUCTIONS,
            });
        }
        Ok(FilterProgram::new_unchecked(out))
    }
}

/// Validate the rule's architecture tag and resolve its syscall number
fn resolve_rule(rule: &SyscallRule, target: Arch) -> Result<u32, CompileError> {
    if let Some(tag) = rule.arch {
        if tag != target {
            return Err(CompileError::InvalidArchitecture {
                expected: target.to_string(),
                found: tag.to_string(),
            });
        }
    }
    match &rule.syscall {
        SyscallId::Number(nr) => Ok(*nr),
        SyscallId::Name(name) => {
            syscall::syscall_number(name, target).ok_or_else(|| CompileError::UnknownSyscall {
                name: name.clone(),
                arch: target.to_string(),
            })
        }
    }
}

/// Kill the process outright when the syscall ABI is not the one the
/// policy was compiled for; syscall numbers are meaningless across ABIs
fn emit_arch_guard(out: &mut Vec<Instruction>, target: Arch) {
    out.push(Instruction::load_abs(SECCOMP_DATA_ARCH));
    out.push(Instruction::jump(opcode::JEQ_K, target.audit_value(), 1, 0));
    out.push(Instruction::ret(action::SECCOMP_RET_KILL_PROCESS));
}

fn emit_rule(
    out: &mut Vec<Instruction>,
    rule: &SyscallRule,
    nr: u32,
) -> Result<(), CompileError> {
    for cmp in &rule.comparisons {
        if cmp.arg >= ARG_COUNT {
            return Err(CompileError::ArgumentOutOfRange(cmp.arg));
        }
    }

    // Instructions between the syscall match and the end of this rule: an
    // argument load plus a jump per comparison, then the verdict.
    let body = 2 * rule.comparisons.len() + 1;

    // Argument loads clobber the accumulator, so every rule reloads nr.
    out.push(Instruction::load_abs(SECCOMP_DATA_NR));
    out.push(Instruction::jump(opcode::JEQ_K, nr, 0, jump_offset(body)?));

    for (idx, cmp) in rule.comparisons.iter().enumerate() {
        let remaining = 2 * (rule.comparisons.len() - idx - 1) + 1;
        emit_comparison(out, cmp, jump_offset(remaining)?);
    }

    out.push(Instruction::ret(rule.action.ret_value()));
    Ok(())
}

/// A failed predicate jumps `fail` instructions ahead, past the rest of
/// the rule; a passing one falls through
fn emit_comparison(out: &mut Vec<Instruction>, cmp: &ArgComparison, fail: u8) {
    out.push(Instruction::load_abs(arg_offset(cmp.arg)));
    let insn = match cmp.op {
        CmpOp::Eq => Instruction::jump(opcode::JEQ_K, cmp.value, 0, fail),
        CmpOp::Ne => Instruction::jump(opcode::JEQ_K, cmp.value, fail, 0),
        CmpOp::Gt => Instruction::jump(opcode::JGT_K, cmp.value, 0, fail),
        CmpOp::Le => Instruction::jump(opcode::JGT_K, cmp.value, fail, 0),
        CmpOp::Ge => Instruction::jump(opcode::JGE_K, cmp.value, 0, fail),
        CmpOp::Lt => Instruction::jump(opcode::JGE_K, cmp.value, fail, 0),
    };
    out.push(insn);
}

/// Jump displacements are 8-bit; anything wider is unencodable
fn jump_offset(distance: usize) -> Result<u8, CompileError> {
    u8::try_from(distance).map_err(|_| CompileError::UnresolvableJump { distance })
}

/// Native-endian low word of the 64-bit argument slot
fn arg_offset(arg: u8) -> u32 {
    let base = SECCOMP_DATA_ARGS + ARG_SLOT_SIZE * u32::from(arg);
    if cfg!(target_endian = "little") {
        base
    } else {
        base + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Action;

    #[test]
    fn test_empty_policy_is_guard_plus_default() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow);
        let program = FilterCompiler::compile(&policy).unwrap();
        assert_eq!(program.len(), 4);

        let insns = program.as_slice();
        assert_eq!(insns[0], Instruction::load_abs(SECCOMP_DATA_ARCH));
        assert_eq!(
            insns[1],
            Instruction::jump(opcode::JEQ_K, Arch::X86_64.audit_value(), 1, 0)
        );
        assert_eq!(insns[2], Instruction::ret(action::SECCOMP_RET_KILL_PROCESS));
        assert_eq!(insns[3], Instruction::ret(action::SECCOMP_RET_ALLOW));
    }

    #[test]
    fn test_reference_policy_shape() {
        let policy = FilterPolicy::deny_unix_sockets();
        let program = FilterCompiler::compile(&policy).unwrap();
        // guard (3) + nr load/match (2) + one comparison (2) + rule verdict
        // (1) + default (1)
        assert_eq!(program.len(), 9);

        let insns = program.as_slice();
        assert_eq!(insns[3], Instruction::load_abs(SECCOMP_DATA_NR));
        // a failed match skips load+jump+ret of the rule body
        assert_eq!(insns[4].jf, 3);
        assert_eq!(insns[8], Instruction::ret(action::SECCOMP_RET_ALLOW));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let policy = FilterPolicy::deny_unix_sockets();
        let a = FilterCompiler::compile(&policy).unwrap();
        let b = FilterCompiler::compile(&policy).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_rule_arch_tag_must_match_policy() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow).with_rule(
            SyscallRule::new("socket", Action::Kill).for_arch(Arch::Aarch64),
        );
        let err = FilterCompiler::compile(&policy).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArchitecture { .. }));
    }

    #[test]
    fn test_matching_rule_arch_tag_is_accepted() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow)
            .with_rule(SyscallRule::new("socket", Action::Kill).for_arch(Arch::X86_64));
        assert!(FilterCompiler::compile(&policy).is_ok());
    }

    #[test]
    fn test_unknown_syscall_name() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow)
            .with_rule(SyscallRule::new("definitely_not_a_syscall", Action::Kill));
        let err = FilterCompiler::compile(&policy).unwrap_err();
        assert!(matches!(err, CompileError::UnknownSyscall { .. }));
    }

    #[test]
    fn test_name_resolution_uses_policy_arch() {
        let policy = FilterPolicy::new(Arch::Aarch64, Action::Allow)
            .with_rule(SyscallRule::new("socket", Action::Kill));
        let program = FilterCompiler::compile(&policy).unwrap();
        // socket is 198 on aarch64
        assert_eq!(program.as_slice()[4].k, 198);
    }

    #[test]
    fn test_numeric_id_bypasses_table() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow)
            .with_rule(SyscallRule::new(999u32, Action::Trap));
        let program = FilterCompiler::compile(&policy).unwrap();
        assert_eq!(program.as_slice()[4].k, 999);
    }

    #[test]
    fn test_argument_index_out_of_range() {
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow).with_rule(
            SyscallRule::new("socket", Action::Kill)
                .with_comparison(ArgComparison::eq(6, 0)),
        );
        let err = FilterCompiler::compile(&policy).unwrap_err();
        assert!(matches!(err, CompileError::ArgumentOutOfRange(6)));
    }

    #[test]
    fn test_degenerate_rule_overflows_jump() {
        let mut rule = SyscallRule::new("socket", Action::Kill);
        for _ in 0..128 {
            rule = rule.with_comparison(ArgComparison::eq(0, 1));
        }
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow).with_rule(rule);
        let err = FilterCompiler::compile(&policy).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvableJump { distance: 257 }));
    }

    #[test]
    fn test_widest_encodable_rule() {
        // 127 comparisons puts the skip at exactly 255
        let mut rule = SyscallRule::new("socket", Action::Kill);
        for _ in 0..127 {
            rule = rule.with_comparison(ArgComparison::eq(0, 1));
        }
        let policy = FilterPolicy::new(Arch::X86_64, Action::Allow).with_rule(rule);
        let program = FilterCompiler::compile(&policy).unwrap();
        assert_eq!(program.as_slice()[4].jf, 255);
    }

    #[test]
    fn test_big_endian_argument_offset() {
        // On little-endian targets the low word sits at the slot base
        if cfg!(target_endian = "little") {
            assert_eq!(arg_offset(0), 16);
            assert_eq!(arg_offset(5), 56);
        } else {
            assert_eq!(arg_offset(0), 20);
            assert_eq!(arg_offset(5), 60);
        }
    }
}
