//! The irreversible bootstrap sequence: ingest, lock, install, exec
//!
//! Each stage is a separate owning type and every transition consumes its
//! predecessor, so a step cannot be skipped, repeated, or reordered. After
//! `lock_privileges` succeeds there is no way back; if a later stage fails
//! the process must exit instead of running the target unfiltered.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;
use nix::unistd;

use sysgate_bpf::{FilterProgram, Instruction, MAX_PROGRAM_BYTES};
use sysgate_core::LoaderError;

/// Kernel descriptor for an installable filter. `len` is the instruction
/// count, not a byte length.
#[repr(C)]
struct SockFprog {
    len: libc::c_ushort,
    filter: *const Instruction,
}

/// Read and validate a serialized program from disk. The read is capped
/// one byte past the largest well-formed program, so an oversize or
/// endless source fails validation instead of exhausting memory.
pub fn ingest_file(path: impl AsRef<Path>) -> Result<Ingested, LoaderError> {
    let mut bytes = Vec::new();
    File::open(path)?
        .take(MAX_PROGRAM_BYTES as u64 + 1)
        .read_to_end(&mut bytes)?;
    ingest_bytes(&bytes)
}

/// Validate a serialized program already in memory
pub fn ingest_bytes(bytes: &[u8]) -> Result<Ingested, LoaderError> {
    let program =
        FilterProgram::from_bytes(bytes).map_err(|e| LoaderError::InvalidProgram(e.to_string()))?;
    debug!("ingested filter program: {} instructions", program.len());
    Ok(Ingested { program })
}

/// Run the whole sequence against a program file. Returns only on failure;
/// on success the process image is replaced by `command` with the filter
/// already enforced.
pub fn apply_and_exec(path: impl AsRef<Path>, command: &str, args: &[String]) -> LoaderError {
    let ingested = match ingest_file(path) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let locked = match ingested.lock_privileges() {
        Ok(v) => v,
        Err(e) => return e,
    };
    let installed = match locked.install() {
        Ok(v) => v,
        Err(e) => return e,
    };
    installed.exec(command, args)
}

/// A validated program that does not yet affect the process
#[derive(Debug)]
pub struct Ingested {
    program: FilterProgram,
}

impl Ingested {
    pub fn program(&self) -> &FilterProgram {
        &self.program
    }

    /// Set PR_SET_NO_NEW_PRIVS. Irreversible for the current process; the
    /// kernel requires it before an unprivileged filter install.
    pub fn lock_privileges(self) -> Result<Locked, LoaderError> {
        let ret = unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) };
        if ret != 0 {
            return Err(LoaderError::PrivilegeLockFailed(io::Error::last_os_error()));
        }
        debug!("privileges locked (no_new_privs)");
        Ok(Locked {
            program: self.program,
        })
    }
}

/// Privilege-locked and ready to install. A failure past this point leaves
/// the process in a reduced state; callers must exit, not retry.
pub struct Locked {
    program: FilterProgram,
}

impl Locked {
    /// Hand the filter to the kernel. Enforcement starts immediately and
    /// survives exec.
    pub fn install(self) -> Result<Installed, LoaderError> {
        let insns = self.program.as_slice();
        let prog = SockFprog {
            len: insns.len() as libc::c_ushort,
            filter: insns.as_ptr(),
        };

        // self.program stays alive across the call, so the pointer is valid
        let ret = unsafe {
            libc::prctl(
                libc::PR_SET_SECCOMP,
                libc::SECCOMP_MODE_FILTER,
                &prog as *const SockFprog,
            )
        };
        if ret != 0 {
            return Err(LoaderError::RejectedByKernel(io::Error::last_os_error()));
        }
        debug!("filter installed: {} instructions", insns.len());
        Ok(Installed(()))
    }
}

/// The filter is live; the only remaining operation is replacing the
/// process image
pub struct Installed(());

impl Installed {
    /// Replace the process image via execvp (PATH search, environment
    /// inherited). Returns only on failure; there is no fallback.
    pub fn exec(self, command: &str, args: &[String]) -> LoaderError {
        let program = match CString::new(command) {
            Ok(c) => c,
            Err(_) => {
                return LoaderError::ExecFailed {
                    command: command.to_string(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "embedded NUL in command"),
                }
            }
        };

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.clone());
        for arg in args {
            match CString::new(arg.as_str()) {
                Ok(c) => argv.push(c),
                Err(_) => {
                    return LoaderError::ExecFailed {
                        command: command.to_string(),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "embedded NUL in argument",
                        ),
                    }
                }
            }
        }

        debug!("replacing process image with {}", command);
        let errno = match unistd::execvp(&program, &argv) {
            Ok(infallible) => match infallible {},
            Err(errno) => errno,
        };
        LoaderError::ExecFailed {
            command: command.to_string(),
            source: io::Error::from_raw_os_error(errno as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use sysgate_bpf::{Action, Arch, FilterCompiler, FilterPolicy};

    fn reference_bytes() -> Vec<u8> {
        FilterCompiler::compile(&FilterPolicy::deny_unix_sockets())
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn test_ingest_accepts_compiled_program() {
        let ingested = ingest_bytes(&reference_bytes()).unwrap();
        assert_eq!(ingested.program().len(), 9);
    }

    #[test]
    fn test_ingest_rejects_empty() {
        let err = ingest_bytes(&[]).unwrap_err();
        match err {
            LoaderError::InvalidProgram(reason) => assert!(reason.contains("empty")),
            other => panic!("expected InvalidProgram, got {:?}", other),
        }
    }

    #[test]
    fn test_ingest_rejects_misaligned() {
        let err = ingest_bytes(&[0u8; 7]).unwrap_err();
        match err {
            LoaderError::InvalidProgram(reason) => assert!(reason.contains("multiple")),
            other => panic!("expected InvalidProgram, got {:?}", other),
        }
    }

    #[test]
    fn test_ingest_rejects_oversize() {
        let bytes = vec![0u8; 513 * 8];
        let err = ingest_bytes(&bytes).unwrap_err();
        match err {
            LoaderError::InvalidProgram(reason) => assert!(reason.contains("512")),
            other => panic!("expected InvalidProgram, got {:?}", other),
        }
    }

    #[test]
    fn test_ingest_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&reference_bytes()).unwrap();
        file.flush().unwrap();

        let ingested = ingest_file(file.path()).unwrap();
        assert_eq!(ingested.program().len(), 9);
    }

    #[test]
    fn test_ingest_missing_file_is_io_error() {
        let err = ingest_file("/definitely/not/here/sysgate.bpf").unwrap_err();
        assert!(matches!(err, LoaderError::Io(_)));
    }

    #[test]
    fn test_ingest_file_read_is_bounded() {
        // /dev/zero never ends; only a capped read turns it into a clean
        // validation failure
        let err = ingest_file("/dev/zero").unwrap_err();
        match err {
            LoaderError::InvalidProgram(_) => {}
            other => panic!("expected InvalidProgram, got {:?}", other),
        }
    }

    #[test]
    fn test_ingest_oversize_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; MAX_PROGRAM_BYTES * 4]).unwrap();
        file.flush().unwrap();

        let err = ingest_file(file.path()).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidProgram(_)));
    }

    #[test]
    fn test_empty_policy_program_ingests() {
        let bytes = FilterCompiler::compile(&FilterPolicy::new(Arch::native(), Action::Allow))
            .unwrap()
            .to_bytes();
        let ingested = ingest_bytes(&bytes).unwrap();
        assert_eq!(ingested.program().len(), 4);
    }
}
