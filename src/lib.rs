//! Purpose: Library crate for directory-backed stores of compiled units.
//! Exports: `api` (stable surface), `core` (store internals), `notice` (CLI diagnostics).
//! Role: Backs the `unitlib` binary and embeds into compiler drivers via `api::Session`.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: No process-wide state; every open library belongs to one `Session`.
pub mod api;
pub mod core;
mod lib_paths;
pub mod notice;
