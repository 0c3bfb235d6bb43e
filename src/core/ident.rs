//! Purpose: Canonical name handles shared by libraries and units.
//! Exports: `Ident`.
//! Role: Stand-in for the compiler's identifier table; cheap to clone and compare.
//! Invariants: Equality and hashing follow the canonical string exactly.
//! Invariants: `Ident::upcase` is the only case-folding path (library names).
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(Arc<str>);

impl Ident {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Canonical form of a library name: ASCII letters upcased before interning.
    pub fn upcase(name: impl AsRef<str>) -> Self {
        Self::new(name.as_ref().to_ascii_uppercase())
    }

    /// Stable rendering, also used verbatim as the on-disk unit filename.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Serialize for Ident {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Ident::from)
    }
}
