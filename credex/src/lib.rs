//! `credex` is the distributable crate: it re-exports [`credex_core`] for Rust
//! hosts and carries its `UniFFI` scaffolding into the `staticlib` and
//! `cdylib` artifacts that Swift and Kotlin bindings load.

pub use credex_core::*;

credex_core::uniffi_reexport_scaffolding!();
