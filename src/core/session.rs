//! Purpose: Explicit library session owning the registry and the work-library selection.
//! Exports: `Session`, `FindOptions`.
//! Role: Entry point for create/find/release/destroy; replaces process-wide globals.
//! Invariants: Registry lookup always precedes path resolution.
//! Invariants: A failed create leaves no directory behind and registers nothing.
//! Invariants: `release` never flushes; unsaved units are dropped with the handle.
#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::ident::Ident;
use crate::core::library::{DestroyReport, Library};
use crate::core::registry::Registry;
use crate::core::search::{Probe, SearchConfig};
use crate::core::unit::Unit;
use crate::lib_paths::{LibNameError, MARKER_FILE, check_library_name, marker_contents};

/// Name given to ephemeral libraries by default.
pub const DEFAULT_EPHEMERAL_NAME: &str = "work";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FindOptions {
    /// Also probe `NVC_LIBPATH` entries and the data directory.
    pub search: bool,
    /// Report every probed base when the library is not found.
    pub verbose: bool,
}

impl FindOptions {
    pub fn extended() -> Self {
        Self {
            search: true,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug)]
pub struct Session<U> {
    config: SearchConfig,
    registry: Registry<U>,
    work: Option<Ident>,
}

impl<U: Unit> Session<U> {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            work: None,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<U> {
        &self.registry
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.registry.contains(&Ident::upcase(name))
    }

    pub fn find_open(&mut self, name: &str) -> Option<&mut Library<U>> {
        self.registry.find_open(&Ident::upcase(name))
    }

    /// Creates `<work_dir>/<name>` with a marker file and registers it.
    pub fn create(&mut self, name: &str) -> Result<&mut Library<U>, Error> {
        check_name(name)?;
        if self.is_open(name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("library {} is already open", Ident::upcase(name))));
        }

        let dir = self.config.work_dir.join(name);
        if fs::symlink_metadata(&dir).is_ok() {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("file {name} already exists"))
                .with_path(&dir));
        }
        fs::create_dir(&dir).map_err(|err| {
            Error::io(err, &dir).with_message(format!("failed to create library {name}"))
        })?;

        let path = match init_library_dir(&dir) {
            Ok(path) => path,
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!(path = %dir.display(), "failed to clean up partial library: {cleanup}");
                }
                return Err(err);
            }
        };

        debug!(library = name, path = %path.display(), "created library");
        Ok(self.registry.register(Library::open(name, path)))
    }

    /// Resolves an open library, or locates one on the search path and opens it.
    pub fn find(&mut self, name: &str, options: FindOptions) -> Result<&mut Library<U>, Error> {
        check_name(name)?;
        let canonical = Ident::upcase(name);
        if self.registry.contains(&canonical) {
            return self
                .registry
                .find_open(&canonical)
                .ok_or_else(|| Error::new(ErrorKind::Internal).with_message("registry lookup failed"));
        }

        match self.config.probe(name, options.search) {
            Probe::Found(dir) => {
                let path = fs::canonicalize(&dir).map_err(|err| Error::io(err, &dir))?;
                debug!(library = %canonical, path = %path.display(), "opened library");
                Ok(self.registry.register(Library::open(name, path)))
            }
            Probe::Missing { searched } => {
                if options.verbose {
                    warn!("library {name} not found in:");
                    for base in &searched {
                        warn!("  {}", base.display());
                    }
                }
                Err(Error::new(ErrorKind::NotFound)
                    .with_message(format!("library {name} not found"))
                    .with_searched(searched))
            }
        }
    }

    /// Registers a memory-only library.
    pub fn open_ephemeral(&mut self, name: &str) -> Result<&mut Library<U>, Error> {
        if self.is_open(name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("library {} is already open", Ident::upcase(name))));
        }
        Ok(self.registry.register(Library::ephemeral(name)))
    }

    /// Unregisters and returns the library without saving it.
    pub fn release(&mut self, name: &str) -> Option<Library<U>> {
        self.registry.unregister(&Ident::upcase(name))
    }

    /// Releases the library and deletes its backing directory.
    pub fn destroy(&mut self, name: &str) -> Result<DestroyReport, Error> {
        let library = self.release(name).ok_or_else(|| {
            Error::new(ErrorKind::NotFound).with_message(format!("library {name} is not open"))
        })?;
        Ok(library.destroy())
    }

    /// Selects the work library; the name is not checked against the registry.
    pub fn set_work(&mut self, name: &str) {
        self.work = Some(Ident::upcase(name));
    }

    pub fn work_name(&self) -> Option<&Ident> {
        self.work.as_ref()
    }

    pub fn work(&mut self) -> Result<&mut Library<U>, Error> {
        let Some(name) = self.work.clone() else {
            return Err(Error::new(ErrorKind::Usage).with_message("no work library selected"));
        };
        self.registry.find_open(&name).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("work library {name} is no longer open"))
        })
    }
}

impl<U: Unit> Default for Session<U> {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

fn check_name(name: &str) -> Result<(), Error> {
    check_library_name(name).map_err(|err| {
        let message = match err {
            LibNameError::Empty => "library name must not be empty",
            LibNameError::ContainsPathSeparator => "library name must not contain path separators",
            LibNameError::Reserved => "library name must not be . or ..",
        };
        Error::new(ErrorKind::Usage).with_message(message)
    })
}

fn init_library_dir(dir: &Path) -> Result<PathBuf, Error> {
    let marker = dir.join(MARKER_FILE);
    fs::write(&marker, marker_contents()).map_err(|err| Error::io(err, &marker))?;
    fs::canonicalize(dir).map_err(|err| Error::io(err, dir))
}

#[cfg(test)]
mod tests {
    use super::{FindOptions, Session};
    use crate::core::error::ErrorKind;
    use crate::core::ident::Ident;
    use crate::core::search::SearchConfig;
    use crate::core::tree::Tree;
    use crate::lib_paths::MARKER_FILE;
    use std::path::Path;

    fn session(dir: &Path) -> Session<Tree> {
        Session::new(SearchConfig::new(dir).with_data_dir(dir.join("no-data-dir")))
    }

    #[test]
    fn create_writes_marker_and_registers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());

        let library = session.create("mylib").expect("create");
        assert_eq!(library.name(), &Ident::new("MYLIB"));
        let path = library.path().expect("path").to_path_buf();
        assert!(path.is_absolute());
        assert!(path.join(MARKER_FILE).is_file());
        assert!(session.is_open("MyLib"));
    }

    #[test]
    fn create_rejects_existing_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("taken"), "x").expect("write");
        let mut session = session(temp.path());

        let err = session.create("taken").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(!session.is_open("taken"));
    }

    #[test]
    fn create_rejects_open_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        session.open_ephemeral("work").expect("ephemeral");

        let err = session.create("work").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(!temp.path().join("work").exists());
    }

    #[test]
    fn create_in_missing_parent_fails_cleanly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(&temp.path().join("absent"));

        let err = session.create("mylib").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(session.registry().is_empty());
    }

    #[test]
    fn invalid_names_are_usage_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());

        let err = session.create("a/b").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = session.find("", FindOptions::default()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn find_returns_open_handle_before_probing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        session
            .open_ephemeral("scratch")
            .expect("ephemeral")
            .put(Tree::new("PKG", "package"));

        let library = session.find("SCRATCH", FindOptions::default()).expect("find");
        assert!(library.is_ephemeral());
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn find_reports_searched_bases() {
        let temp = tempfile::tempdir().expect("tempdir");
        let extra = temp.path().join("extra");
        let mut session: Session<Tree> = Session::new(
            SearchConfig::new(temp.path())
                .with_lib_path(vec![extra.clone()])
                .with_data_dir(temp.path().join("data")),
        );

        let err = session
            .find("nope", FindOptions::extended().with_verbose(true))
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.searched(),
            &[
                temp.path().to_path_buf(),
                extra,
                temp.path().join("data")
            ]
        );
    }

    #[test]
    fn release_discards_unsaved_units() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        session
            .create("mylib")
            .expect("create")
            .put(Tree::new("ENTITY_A", "entity"));

        let released = session.release("mylib").expect("released");
        assert_eq!(released.dirty_count(), 1);
        drop(released);
        assert!(session.release("mylib").is_none());

        let library = session.find("mylib", FindOptions::default()).expect("find");
        assert!(library.get(&Ident::new("ENTITY_A")).expect("get").is_none());
    }

    #[test]
    fn destroy_releases_and_removes_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        session.create("mylib").expect("create");

        let report = session.destroy("mylib").expect("destroy");
        assert_eq!(report.failures, 0);
        assert!(!temp.path().join("mylib").exists());
        assert!(!session.is_open("mylib"));
        assert_eq!(
            session.destroy("mylib").expect_err("err").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn work_requires_selection() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut session = session(temp.path());
        assert_eq!(session.work().expect_err("err").kind(), ErrorKind::Usage);

        session.set_work("ghost");
        assert_eq!(session.work().expect_err("err").kind(), ErrorKind::Usage);

        session.open_ephemeral("ghost").expect("ephemeral");
        assert_eq!(session.work().expect("work").name(), &Ident::new("GHOST"));
    }
}
