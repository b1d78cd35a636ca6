//! sysgate-loader: installs compiled seccomp filters and hands off to the
//! target command
//!
//! The sequence is one-way: ingest and validate the program bytes, lock
//! privileges with PR_SET_NO_NEW_PRIVS, hand the filter to the kernel,
//! replace the process image. Each transition consumes the previous stage,
//! and nothing here is reversible once the lock has been taken.

pub mod bootstrap;

pub use bootstrap::{apply_and_exec, ingest_bytes, ingest_file, Ingested, Installed, Locked};
