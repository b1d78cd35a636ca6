//! Runtime detection of kernel seccomp support
//!
//! Probes the running kernel before a filter install is attempted, so the
//! CLI can report up front why an `apply` would fail.

/// Detected kernel facilities relevant to filter installation
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// Running as root (euid == 0); not required for seccomp
    pub has_root: bool,
    /// Seccomp BPF filtering is available
    pub has_seccomp: bool,
    /// Current seccomp mode (0 disabled, 1 strict, 2 filter), -1 if unsupported
    pub seccomp_mode: i32,
    /// no_new_privs is already set for this process
    pub no_new_privs: bool,
}

impl SystemCapabilities {
    /// Detect all relevant capabilities on the current system
    pub fn detect() -> Self {
        let mode = probe_seccomp_mode();
        Self {
            has_root: detect_root(),
            has_seccomp: mode >= 0,
            seccomp_mode: mode,
            no_new_privs: detect_no_new_privs(),
        }
    }

    /// Check if a filter install can succeed for an unprivileged process
    pub fn can_install_filter(&self) -> bool {
        self.has_seccomp
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let check = |available: bool| if available { "[ok]" } else { "[--]" };

        lines.push(format!(
            "{} Seccomp BPF filtering (current mode {})",
            check(self.has_seccomp),
            self.seccomp_mode
        ));
        lines.push(format!(
            "{} no_new_privs already set",
            check(self.no_new_privs)
        ));
        lines.push(format!("{} Root privileges", check(self.has_root)));

        lines.join("\n")
    }
}

fn detect_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn probe_seccomp_mode() -> i32 {
    // Returns the current mode, or -1 with EINVAL if seccomp is not built
    // into the kernel. Under mode 1 (strict) this prctl would be fatal, but
    // a strict-mode process could not have reached this code.
    unsafe { libc::prctl(libc::PR_GET_SECCOMP, 0, 0, 0, 0) }
}

fn detect_no_new_privs() -> bool {
    unsafe { libc::prctl(libc::PR_GET_NO_NEW_PRIVS, 0, 0, 0, 0) == 1 }
}
