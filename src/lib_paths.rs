//! Purpose: Shared library-name and library-directory path helpers.
//! Exports: `MARKER_FILE`, `default_data_dir`, `library_dir`, `check_library_name`, `check_unit_name`.
//! Role: Keep create, search, and CLI path semantics aligned from one source.
//! Invariants: A library directory is `<base>/<lowercase name>` during search.
//! Invariants: Library names and unit filenames are single plain path components.

use std::path::{Path, PathBuf};

/// Marker file whose presence makes a directory a library.
pub const MARKER_FILE: &str = "_NVC_LIB";

const DEFAULT_DATA_DIR: &str = "/usr/local/share/nvc";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum LibNameError {
    Empty,
    ContainsPathSeparator,
    Reserved,
}

/// Built-in installation data directory, probed last during extended search.
pub fn default_data_dir() -> PathBuf {
    PathBuf::from(option_env!("NVC_DATADIR").unwrap_or(DEFAULT_DATA_DIR))
}

pub(crate) fn check_library_name(name: &str) -> Result<(), LibNameError> {
    check_component(name)
}

/// Unit idents double as filenames and must stay inside the library directory.
pub(crate) fn check_unit_name(name: &str) -> Result<(), LibNameError> {
    check_component(name)
}

fn check_component(name: &str) -> Result<(), LibNameError> {
    if name.is_empty() {
        return Err(LibNameError::Empty);
    }
    if name.chars().any(std::path::is_separator) {
        return Err(LibNameError::ContainsPathSeparator);
    }
    if name == "." || name == ".." {
        return Err(LibNameError::Reserved);
    }
    Ok(())
}

pub(crate) fn library_dir(base: &Path, name: &str) -> PathBuf {
    base.join(name.to_lowercase())
}

pub(crate) fn marker_contents() -> String {
    format!("{} {}\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
