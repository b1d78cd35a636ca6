//! Syscall name resolution for filter policies
//!
//! A curated table of the syscalls filtering policies name in practice:
//! the socket family, process lifecycle, privilege transitions, tracing,
//! kernel/namespace surface, and basic I/O. Numeric policy entries bypass
//! the table entirely, so a missing name never makes a syscall
//! unfilterable.

use crate::insn::Arch;

/// Resolve a syscall name to its number on `arch`
pub fn syscall_number(name: &str, arch: Arch) -> Option<u32> {
    let (_, x86_64, aarch64) = *TABLE.iter().find(|(n, _, _)| *n == name)?;
    match arch {
        Arch::X86_64 => x86_64,
        Arch::Aarch64 => aarch64,
    }
}

/// (name, x86_64 number, aarch64 number); `None` where the ABI has no such
/// entry point (legacy non-at calls mostly)
#[rustfmt::skip]
static TABLE: &[(&str, Option<u32>, Option<u32>)] = &[
    // Basic I/O
    ("read",              Some(0),   Some(63)),
    ("write",             Some(1),   Some(64)),
    ("open",              Some(2),   None),
    ("close",             Some(3),   Some(57)),
    ("openat",            Some(257), Some(56)),
    ("ioctl",             Some(16),  Some(29)),
    ("fcntl",             Some(72),  Some(25)),
    // Filesystem mutation
    ("mkdir",             Some(83),  None),
    ("mkdirat",           Some(258), Some(34)),
    ("unlink",            Some(87),  None),
    ("unlinkat",          Some(263), Some(35)),
    ("rename",            Some(82),  None),
    ("renameat",          Some(264), Some(38)),
    ("chmod",             Some(90),  None),
    ("fchmod",            Some(91),  Some(52)),
    ("fchmodat",          Some(268), Some(53)),
    ("chown",             Some(92),  None),
    ("fchownat",          Some(260), Some(54)),
    // Network
    ("socket",            Some(41),  Some(198)),
    ("socketpair",        Some(53),  Some(199)),
    ("bind",              Some(49),  Some(200)),
    ("listen",            Some(50),  Some(201)),
    ("accept",            Some(43),  Some(202)),
    ("accept4",           Some(288), Some(242)),
    ("connect",           Some(42),  Some(203)),
    ("getsockname",       Some(51),  Some(204)),
    ("getpeername",       Some(52),  Some(205)),
    ("sendto",            Some(44),  Some(206)),
    ("recvfrom",          Some(45),  Some(207)),
    ("setsockopt",        Some(54),  Some(208)),
    ("getsockopt",        Some(55),  Some(209)),
    ("shutdown",          Some(48),  Some(210)),
    ("sendmsg",           Some(46),  Some(211)),
    ("recvmsg",           Some(47),  Some(212)),
    ("sendmmsg",          Some(307), Some(269)),
    ("recvmmsg",          Some(299), Some(243)),
    // Process lifecycle
    ("clone",             Some(56),  Some(220)),
    ("clone3",            Some(435), Some(435)),
    ("fork",              Some(57),  None),
    ("vfork",             Some(58),  None),
    ("execve",            Some(59),  Some(221)),
    ("execveat",          Some(322), Some(281)),
    ("exit",              Some(60),  Some(93)),
    ("exit_group",        Some(231), Some(94)),
    ("wait4",             Some(61),  Some(260)),
    ("kill",              Some(62),  Some(129)),
    ("tkill",             Some(200), Some(130)),
    ("tgkill",            Some(234), Some(131)),
    ("getpid",            Some(39),  Some(172)),
    ("gettid",            Some(186), Some(178)),
    // Privilege transitions
    ("setuid",            Some(105), Some(146)),
    ("setgid",            Some(106), Some(144)),
    ("setreuid",          Some(113), Some(145)),
    ("setregid",          Some(114), Some(143)),
    ("setresuid",         Some(117), Some(147)),
    ("setresgid",         Some(119), Some(149)),
    ("capget",            Some(125), Some(90)),
    ("capset",            Some(126), Some(91)),
    ("prctl",             Some(157), Some(167)),
    // Tracing and introspection
    ("ptrace",            Some(101), Some(117)),
    ("process_vm_readv",  Some(310), Some(270)),
    ("process_vm_writev", Some(311), Some(271)),
    ("perf_event_open",   Some(298), Some(241)),
    ("seccomp",           Some(317), Some(277)),
    ("bpf",               Some(321), Some(280)),
    // Kernel and namespace surface
    ("mount",             Some(165), Some(40)),
    ("umount2",           Some(166), Some(39)),
    ("pivot_root",        Some(155), Some(41)),
    ("chroot",            Some(161), Some(51)),
    ("init_module",       Some(175), Some(105)),
    ("finit_module",      Some(313), Some(273)),
    ("delete_module",     Some(176), Some(106)),
    ("kexec_load",        Some(246), Some(104)),
    ("reboot",            Some(169), Some(142)),
    ("unshare",           Some(272), Some(97)),
    ("setns",             Some(308), Some(268)),
    ("add_key",           Some(248), Some(217)),
    ("request_key",       Some(249), Some(218)),
    ("keyctl",            Some(250), Some(219)),
    // Misc
    ("futex",             Some(202), Some(98)),
    ("uname",             Some(63),  Some(160)),
    ("getrandom",         Some(318), Some(278)),
    ("memfd_create",      Some(319), Some(279)),
];
