// Codec seam between the library store and the compiler's unit trees.
use std::io::{Read, Write};

use crate::core::error::Error;
use crate::core::ident::Ident;

/// A compiled unit the store can cache and persist.
///
/// The store never inspects unit contents: it only needs the unit's own
/// identifier (which doubles as its filename) and a way to move it through a
/// byte stream.
pub trait Unit: Sized {
    fn ident(&self) -> &Ident;

    /// Decodes one unit from the full contents of its file.
    fn read_from(reader: &mut dyn Read) -> Result<Self, Error>;

    fn write_to(&self, writer: &mut dyn Write) -> Result<(), Error>;
}
