//! Declarative syscall-filter policies
//!
//! A policy is an ordered rule list evaluated first-match-wins against the
//! syscall number and arguments, with a default action when nothing
//! matches. Policies serialize as JSON documents:
//!
//! ```json
//! {
//!   "arch": "x86_64",
//!   "default_action": "allow",
//!   "rules": [
//!     { "syscall": "socket",
//!       "comparisons": [ { "arg": 0, "op": "eq", "value": 1 } ],
//!       "action": { "errno": 1 } }
//!   ]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::insn::{action, Arch};

/// Verdict a filter returns for a matched syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Let the syscall proceed
    Allow,
    /// Fail the syscall with this errno
    Errno(u16),
    /// Deliver SIGSYS to the calling thread
    Trap,
    /// Kill the whole process
    Kill,
}

impl Action {
    /// The 32-bit verdict word this action encodes to
    pub fn ret_value(self) -> u32 {
        match self {
            Action::Allow => action::SECCOMP_RET_ALLOW,
            Action::Errno(code) => action::SECCOMP_RET_ERRNO | u32::from(code),
            Action::Trap => action::SECCOMP_RET_TRAP,
            Action::Kill => action::SECCOMP_RET_KILL_PROCESS,
        }
    }
}

/// Comparison operator applied to a syscall argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One argument predicate; a rule matches only if all of its predicates hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgComparison {
    /// Argument index, 0-5
    pub arg: u8,
    pub op: CmpOp,
    /// Compared against the low 32 bits of the argument
    pub value: u32,
}

impl ArgComparison {
    pub fn new(arg: u8, op: CmpOp, value: u32) -> Self {
        Self { arg, op, value }
    }

    /// Shorthand for the common equality predicate
    pub fn eq(arg: u8, value: u32) -> Self {
        Self::new(arg, CmpOp::Eq, value)
    }
}

/// How a rule names its syscall: symbolically or by raw number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyscallId {
    Number(u32),
    Name(String),
}

impl fmt::Display for SyscallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallId::Number(nr) => write!(f, "{}", nr),
            SyscallId::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for SyscallId {
    fn from(name: &str) -> Self {
        SyscallId::Name(name.to_string())
    }
}

impl From<u32> for SyscallId {
    fn from(nr: u32) -> Self {
        SyscallId::Number(nr)
    }
}

/// One filter rule: match a syscall plus argument predicates, return an
/// action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyscallRule {
    pub syscall: SyscallId,
    /// Defaults to the policy's architecture; a disagreeing tag is a
    /// compile error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<ArgComparison>,
    pub action: Action,
}

impl SyscallRule {
    pub fn new(syscall: impl Into<SyscallId>, action: Action) -> Self {
        Self {
            syscall: syscall.into(),
            arch: None,
            comparisons: Vec::new(),
            action,
        }
    }

    /// Add an argument predicate; predicates AND together in order
    pub fn with_comparison(mut self, cmp: ArgComparison) -> Self {
        self.comparisons.push(cmp);
        self
    }

    /// Pin the rule to an architecture
    pub fn for_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }
}

/// An ordered filter policy: the first matching rule wins, otherwise the
/// default action applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    pub arch: Arch,
    pub default_action: Action,
    #[serde(default)]
    pub rules: Vec<SyscallRule>,
}

impl FilterPolicy {
    /// An empty policy; compiles to the architecture guard plus the
    /// default action
    pub fn new(arch: Arch, default_action: Action) -> Self {
        Self {
            arch,
            default_action,
            rules: Vec::new(),
        }
    }

    /// Append a rule; evaluation order is insertion order
    pub fn push(&mut self, rule: SyscallRule) {
        self.rules.push(rule);
    }

    /// Builder-style rule append
    pub fn with_rule(mut self, rule: SyscallRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Deny local (AF_UNIX) socket creation with EPERM, allow everything
    /// else
    pub fn deny_unix_sockets() -> Self {
        Self::new(Arch::native(), Action::Allow).with_rule(
            SyscallRule::new("socket", Action::Errno(libc::EPERM as u16))
                .with_comparison(ArgComparison::eq(0, libc::AF_UNIX as u32)),
        )
    }
}
