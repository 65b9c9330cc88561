//! The driver's own fatal errors: an unreadable entry file halts the whole
//! build immediately, unlike a module load failure deeper in a `use` chain
//! or a type error, both of which are reported as diagnostics and the build
//! continues past them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read entry file {path}: {source}")]
    EntryFileNotReadable { path: String, source: std::io::Error },

    #[error("module resolution failed for the entry file: {0}")]
    EntryModuleUnresolved(#[from] mach_module::ModuleError),
}
