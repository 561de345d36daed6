//! # pokedex-core
//!
//! Core abstractions shared by the pokedex services:
//!
//! - **Domain Model**: wire-shaped types for range listings, details, and search
//! - **Error Types**: shared error definitions and result types
//! - **Observability**: structured logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `pokedex-core` is the only crate allowed to define shared primitives.
//! It carries no HTTP, database, or runtime dependencies; those live in
//! `pokedex-api`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod error;
pub mod model;
pub mod observability;

pub use error::{Error, Result};
