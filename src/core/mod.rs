// Core modules implementing identifiers, the unit cache, search, and error modeling.
pub mod error;
pub mod ident;
pub mod library;
pub mod registry;
pub mod search;
pub mod session;
pub mod tree;
pub mod unit;
