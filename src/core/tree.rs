//! Purpose: Reference unit type with a JSON codec.
//! Exports: `Tree`.
//! Role: Lets the CLI and tests exercise the store without the compiler's binary tree codec.
//! Invariants: One JSON document per file; `ident` is required and a plain filename.
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::ident::Ident;
use crate::core::unit::Unit;
use crate::lib_paths::check_unit_name;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub ident: Ident,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl Tree {
    pub fn new(ident: impl Into<Ident>, kind: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            kind: kind.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn from_json(value: Value) -> Result<Self, Error> {
        let tree: Tree = serde_json::from_value(value).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("unit JSON must be an object with an \"ident\" string")
                .with_source(err)
        })?;
        tree.check_ident()?;
        Ok(tree)
    }

    pub fn to_json(&self) -> Result<Value, Error> {
        serde_json::to_value(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode unit")
                .with_source(err)
        })
    }

    fn check_ident(&self) -> Result<(), Error> {
        check_unit_name(self.ident.as_str()).map_err(|_| {
            Error::new(ErrorKind::Usage).with_message(format!(
                "unit ident {:?} must be a plain filename (no separators, not . or ..)",
                self.ident.as_str()
            ))
        })
    }
}

impl Unit for Tree {
    fn ident(&self) -> &Ident {
        &self.ident
    }

    fn read_from(reader: &mut dyn Read) -> Result<Self, Error> {
        let tree: Tree = serde_json::from_reader(reader).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("failed to decode unit")
                .with_source(err)
        })?;
        if tree.ident.as_str().is_empty() {
            return Err(Error::new(ErrorKind::Corrupt).with_message("unit has an empty ident"));
        }
        Ok(tree)
    }

    fn write_to(&self, writer: &mut dyn Write) -> Result<(), Error> {
        serde_json::to_writer(&mut *writer, self).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to encode unit")
                .with_source(err)
        })?;
        writer
            .write_all(b"\n")
            .map_err(|err| Error::new(ErrorKind::Io).with_source(err))
    }
}
