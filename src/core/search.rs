// Library search path: candidate base directories and the marker-file probe.
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::lib_paths::{MARKER_FILE, default_data_dir, library_dir};

/// Environment variable listing extra colon-separated search bases.
pub const LIBPATH_ENV: &str = "NVC_LIBPATH";

/// Upper bound on probed base directories; extra entries are dropped.
pub const MAX_SEARCH_PATHS: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchConfig {
    /// First search base, and the parent directory for newly created libraries.
    pub work_dir: PathBuf,
    pub lib_path: Vec<PathBuf>,
    pub data_dir: PathBuf,
}

/// Outcome of probing every candidate base for one library name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Probe {
    Found(PathBuf),
    Missing { searched: Vec<PathBuf> },
}

impl SearchConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            lib_path: Vec::new(),
            data_dir: default_data_dir(),
        }
    }

    /// Current directory plus `NVC_LIBPATH` and the built-in data directory.
    pub fn from_env() -> Self {
        let lib_path = std::env::var(LIBPATH_ENV)
            .map(|value| parse_lib_path(&value))
            .unwrap_or_default();
        Self::new(".").with_lib_path(lib_path)
    }

    pub fn with_lib_path(mut self, lib_path: Vec<PathBuf>) -> Self {
        self.lib_path = lib_path;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Ordered, deduplicated base directories to probe.
    pub fn candidates(&self, extended: bool) -> Vec<PathBuf> {
        let mut bases = Vec::new();
        push_base(&mut bases, &self.work_dir);
        if extended {
            for dir in &self.lib_path {
                push_base(&mut bases, dir);
            }
            push_base(&mut bases, &self.data_dir);
        }
        bases
    }

    /// Probes candidates in order; the first valid library directory wins.
    pub fn probe(&self, name: &str, extended: bool) -> Probe {
        let searched = self.candidates(extended);
        for base in &searched {
            let dir = library_dir(base, name);
            if is_library_dir(&dir) {
                debug!(library = name, dir = %dir.display(), "library found");
                return Probe::Found(dir);
            }
            debug!(library = name, base = %base.display(), "library not in base");
        }
        Probe::Missing { searched }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Splits a colon-separated search list, skipping empty segments.
pub fn parse_lib_path(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .filter(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .collect()
}

pub fn is_library_dir(dir: &Path) -> bool {
    dir.exists() && dir.join(MARKER_FILE).exists()
}

fn push_base(bases: &mut Vec<PathBuf>, dir: &Path) {
    if bases.len() >= MAX_SEARCH_PATHS || bases.iter().any(|base| base == dir) {
        return;
    }
    bases.push(dir.to_path_buf());
}

#[cfg(test)]
mod tests {
    use super::{MAX_SEARCH_PATHS, Probe, SearchConfig, parse_lib_path};
    use crate::lib_paths::MARKER_FILE;
    use std::path::{Path, PathBuf};

    fn make_library(base: &Path, dir_name: &str) -> PathBuf {
        let dir = base.join(dir_name);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join(MARKER_FILE), "test\n").expect("marker");
        dir
    }

    #[test]
    fn lib_path_skips_empty_segments() {
        let dirs = parse_lib_path("/a::/b:");
        assert_eq!(dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(parse_lib_path("").is_empty());
    }

    #[test]
    fn narrow_search_only_uses_work_dir() {
        let config = SearchConfig::new("/w")
            .with_lib_path(vec![PathBuf::from("/x")])
            .with_data_dir("/data");
        assert_eq!(config.candidates(false), vec![PathBuf::from("/w")]);
        assert_eq!(
            config.candidates(true),
            vec![
                PathBuf::from("/w"),
                PathBuf::from("/x"),
                PathBuf::from("/data")
            ]
        );
    }

    #[test]
    fn candidates_are_deduplicated_and_capped() {
        let lib_path = (0..100)
            .map(|i| PathBuf::from(format!("/lib{}", i % 80)))
            .collect::<Vec<_>>();
        let config = SearchConfig::new("/lib0")
            .with_lib_path(lib_path)
            .with_data_dir("/data");
        let bases = config.candidates(true);
        assert_eq!(bases.len(), MAX_SEARCH_PATHS);
        assert_eq!(bases[0], PathBuf::from("/lib0"));
        assert_eq!(bases[1], PathBuf::from("/lib1"));
        assert!(!bases.contains(&PathBuf::from("/data")));
    }

    #[test]
    fn probe_requires_marker_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(temp.path().join("plain")).expect("mkdir");
        let config = SearchConfig::new(temp.path());

        match config.probe("PLAIN", false) {
            Probe::Missing { searched } => assert_eq!(searched, vec![temp.path().to_path_buf()]),
            Probe::Found(dir) => panic!("unexpected library at {}", dir.display()),
        }

        let dir = make_library(temp.path(), "ieee");
        assert_eq!(config.probe("IEEE", false), Probe::Found(dir));
    }

    #[test]
    fn work_dir_wins_over_lib_path() {
        let work = tempfile::tempdir().expect("work");
        let extra = tempfile::tempdir().expect("extra");
        let local = make_library(work.path(), "shared");
        make_library(extra.path(), "shared");

        let config = SearchConfig::new(work.path())
            .with_lib_path(vec![extra.path().to_path_buf()])
            .with_data_dir(extra.path().join("missing"));
        assert_eq!(config.probe("shared", true), Probe::Found(local));
    }

    #[test]
    fn lib_path_is_only_used_for_extended_search() {
        let work = tempfile::tempdir().expect("work");
        let extra = tempfile::tempdir().expect("extra");
        let remote = make_library(extra.path(), "vendor");

        let config = SearchConfig::new(work.path())
            .with_lib_path(vec![extra.path().to_path_buf()]);
        assert!(matches!(config.probe("vendor", false), Probe::Missing { .. }));
        assert_eq!(config.probe("vendor", true), Probe::Found(remote));
    }
}
