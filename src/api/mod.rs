//! Purpose: Define the stable public Rust API boundary for unit libraries.
//! Exports: Session, library handle, unit codec seam, search config, and errors.
//! Role: Public, additive-only surface used by the CLI and by compiler drivers.
//! Invariants: Everything a caller needs to create, find, fill, and save a library is here.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::ident::Ident;
pub use crate::core::library::{DestroyReport, Library, UnitEntry};
pub use crate::core::registry::Registry;
pub use crate::core::search::{LIBPATH_ENV, MAX_SEARCH_PATHS, Probe, SearchConfig, parse_lib_path};
pub use crate::core::session::{DEFAULT_EPHEMERAL_NAME, FindOptions, Session};
pub use crate::core::tree::Tree;
pub use crate::core::unit::Unit;
pub use crate::lib_paths::{MARKER_FILE, default_data_dir};
