//! Purpose: One open library: canonical name, optional backing directory, and unit cache.
//! Exports: `Library`, `UnitEntry`, `DestroyReport`.
//! Role: Memory-first unit lookup with lazy load-on-miss and dirty-tracked write-back.
//! Invariants: Lookups return the earliest-inserted entry with a matching ident.
//! Invariants: Ephemeral libraries (no backing path) never touch the filesystem.
//! Invariants: Misses are not remembered; each miss rescans the directory.
//! Invariants: No locking; concurrent processes on one directory may race.
#![allow(clippy::result_large_err)]

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::ident::Ident;
use crate::core::unit::Unit;
use crate::lib_paths::check_unit_name;

#[derive(Debug)]
pub struct UnitEntry<U> {
    unit: U,
    dirty: bool,
}

impl<U> UnitEntry<U> {
    pub fn unit(&self) -> &U {
        &self.unit
    }

    /// True until the entry has been written to its backing file.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Counts from a best-effort [`Library::destroy`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DestroyReport {
    pub removed: usize,
    pub failures: usize,
}

#[derive(Debug)]
pub struct Library<U> {
    name: Ident,
    path: Option<PathBuf>,
    units: Vec<UnitEntry<U>>,
}

impl<U: Unit> Library<U> {
    /// Handle over an existing library directory; the cache starts empty.
    pub fn open(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: Ident::upcase(name),
            path: Some(path.into()),
            units: Vec::new(),
        }
    }

    /// Memory-only library with no backing directory.
    pub fn ephemeral(name: &str) -> Self {
        Self {
            name: Ident::upcase(name),
            path: None,
            units: Vec::new(),
        }
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.path.is_none()
    }

    /// Path of `name` inside the backing directory, or the directory itself.
    pub fn file_path(&self, name: Option<&str>) -> Option<PathBuf> {
        let dir = self.path.as_ref()?;
        Some(match name {
            Some(name) => dir.join(name),
            None => dir.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.units.iter().filter(|entry| entry.dirty).count()
    }

    /// Dirty state of the entry `get` would return, if cached.
    pub fn is_dirty(&self, ident: &Ident) -> Option<bool> {
        self.position(ident).map(|index| self.units[index].dirty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitEntry<U>> {
        self.units.iter()
    }

    /// Appends `unit` as dirty. Existing entries with the same ident keep precedence.
    pub fn put(&mut self, unit: U) {
        debug!(library = %self.name, unit = %unit.ident(), "put unit");
        self.units.push(UnitEntry { unit, dirty: true });
    }

    pub fn get(&mut self, ident: &Ident) -> Result<Option<&U>, Error> {
        if let Some(index) = self.position(ident) {
            return Ok(Some(&self.units[index].unit));
        }
        let Some(dir) = self.path.clone() else {
            return Ok(None);
        };

        let Some(file) = find_entry(&dir, ident.as_str())? else {
            return Ok(None);
        };
        let unit = read_unit::<U>(&file)?;
        debug!(library = %self.name, unit = %ident, "loaded unit");
        self.units.push(UnitEntry { unit, dirty: false });
        Ok(self.units.last().map(|entry| &entry.unit))
    }

    /// Loads every unit file in the backing directory into the cache.
    pub fn load_all(&mut self) -> Result<(), Error> {
        let Some(dir) = self.path.clone() else {
            return Ok(());
        };
        for name in list_entries(&dir)? {
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            self.get(&Ident::from(name))?;
        }
        Ok(())
    }

    pub fn foreach(&self, mut visit: impl FnMut(&U)) {
        for entry in &self.units {
            visit(&entry.unit);
        }
    }

    /// Writes dirty entries to `<dir>/<ident>` and marks them clean.
    ///
    /// Every dirty ident must be a plain filename; otherwise nothing is
    /// written and a `Usage` error is returned.
    ///
    /// Returns the number of files written; a second call with no intervening
    /// `put` writes nothing.
    pub fn save(&mut self) -> Result<usize, Error> {
        let Some(dir) = self.path.as_deref() else {
            return Ok(0);
        };
        for entry in self.units.iter().filter(|entry| entry.dirty) {
            unit_file_path(dir, entry.unit.ident())?;
        }
        let mut written = 0;
        for entry in self.units.iter_mut().filter(|entry| entry.dirty) {
            let path = unit_file_path(dir, entry.unit.ident())?;
            write_unit(&entry.unit, &path)?;
            debug!(library = %self.name, path = %path.display(), "saved unit");
            entry.dirty = false;
            written += 1;
        }
        Ok(written)
    }

    /// Deletes the backing directory and its contents, tolerating partial failure.
    pub fn destroy(self) -> DestroyReport {
        let mut report = DestroyReport::default();
        let Some(dir) = self.path else {
            return report;
        };

        match fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if entry.file_name().to_string_lossy().starts_with('.') {
                        continue;
                    }
                    let path = entry.path();
                    let result = if path.is_dir() {
                        fs::remove_dir_all(&path)
                    } else {
                        fs::remove_file(&path)
                    };
                    match result {
                        Ok(()) => report.removed += 1,
                        Err(err) => {
                            warn!(path = %path.display(), "failed to remove: {err}");
                            report.failures += 1;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(path = %dir.display(), "failed to read library directory: {err}");
                report.failures += 1;
            }
        }

        if let Err(err) = fs::remove_dir(&dir) {
            warn!(path = %dir.display(), "failed to remove library directory: {err}");
            report.failures += 1;
        }
        report
    }

    fn position(&self, ident: &Ident) -> Option<usize> {
        self.units
            .iter()
            .position(|entry| entry.unit.ident() == ident)
    }
}

fn list_entries(dir: &Path) -> Result<Vec<String>, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("library directory cannot be read")
            .with_path(dir)
            .with_source(err)
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read library directory entry")
                .with_path(dir)
                .with_source(err)
        })?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

fn find_entry(dir: &Path, name: &str) -> Result<Option<PathBuf>, Error> {
    Ok(list_entries(dir)?
        .into_iter()
        .find(|entry| entry == name)
        .map(|entry| dir.join(entry)))
}

fn read_unit<U: Unit>(path: &Path) -> Result<U, Error> {
    let file = File::open(path).map_err(|err| Error::io(err, path))?;
    let mut reader = BufReader::new(file);
    U::read_from(&mut reader).map_err(|err| err.with_path(path))
}

fn unit_file_path(dir: &Path, ident: &Ident) -> Result<PathBuf, Error> {
    check_unit_name(ident.as_str()).map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unit ident {ident} is not a plain filename"))
            .with_path(dir)
    })?;
    Ok(dir.join(ident.as_str()))
}

fn write_unit<U: Unit>(unit: &U, path: &Path) -> Result<(), Error> {
    let file = File::create(path).map_err(|err| Error::io(err, path))?;
    let mut writer = BufWriter::new(file);
    unit.write_to(&mut writer)
        .map_err(|err| err.with_path(path))?;
    writer.flush().map_err(|err| Error::io(err, path))
}
