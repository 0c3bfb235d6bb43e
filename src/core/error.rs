// Crate error type: a kind plus optional message, path, hint, and probed search bases.
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use libc::{EACCES, EEXIST, ENOENT, EPERM};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    AlreadyExists,
    Permission,
    Corrupt,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    path: Option<PathBuf>,
    hint: Option<String>,
    searched: Vec<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            path: None,
            hint: None,
            searched: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Base directories probed by a failed library search, in probe order.
    pub fn searched(&self) -> &[PathBuf] {
        &self.searched
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_searched(mut self, searched: Vec<PathBuf>) -> Self {
        self.searched = searched;
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wraps an OS error, classifying it with [`io_error_kind`].
    pub(crate) fn io(err: io::Error, path: &Path) -> Self {
        Error::new(io_error_kind(&err))
            .with_path(path)
            .with_source(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::AlreadyExists => 4,
        ErrorKind::Permission => 6,
        ErrorKind::Corrupt => 7,
        ErrorKind::Io => 8,
    }
}

pub(crate) fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.raw_os_error() {
        Some(EACCES) | Some(EPERM) => return ErrorKind::Permission,
        Some(EEXIST) => return ErrorKind::AlreadyExists,
        Some(ENOENT) => return ErrorKind::NotFound,
        _ => {}
    }
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, io_error_kind, to_exit_code};
    use std::path::PathBuf;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::AlreadyExists, 4),
            (ErrorKind::Permission, 6),
            (ErrorKind::Corrupt, 7),
            (ErrorKind::Io, 8),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn io_errors_map_to_expected_kinds() {
        let err = std::io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(io_error_kind(&err), ErrorKind::Permission);

        let err = std::io::Error::from_raw_os_error(libc::EPERM);
        assert_eq!(io_error_kind(&err), ErrorKind::Permission);

        let err = std::io::Error::from_raw_os_error(libc::EEXIST);
        assert_eq!(io_error_kind(&err), ErrorKind::AlreadyExists);

        let err = std::io::Error::from_raw_os_error(libc::ENOENT);
        assert_eq!(io_error_kind(&err), ErrorKind::NotFound);

        let err = std::io::Error::from_raw_os_error(libc::EIO);
        assert_eq!(io_error_kind(&err), ErrorKind::Io);
    }

    #[test]
    fn display_includes_message_and_path() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("library WORK not found")
            .with_path("/tmp/work");
        assert_eq!(
            err.to_string(),
            "NotFound: library WORK not found (path: /tmp/work)"
        );
    }

    #[test]
    fn searched_bases_are_kept_in_order() {
        let err = Error::new(ErrorKind::NotFound)
            .with_searched(vec![PathBuf::from("."), PathBuf::from("/opt/libs")]);
        assert_eq!(
            err.searched(),
            &[PathBuf::from("."), PathBuf::from("/opt/libs")]
        );
        assert!(err.hint().is_none());
    }
}
