//! HTTP read API and process wiring for the dog-breed mirror.
//!
//! The library half exists so the router can be exercised in tests; the
//! `dogmirror` binary in `main.rs` is a thin shell over [`cli`] and
//! [`startup`].

pub mod api;
pub mod cli;
pub mod router;
pub mod startup;
pub mod state;
