//! Foglio: a small publishing backend with pluggable post storage.
//!
//! The crate is layered: `domain` holds pure types and rules, `application`
//! the store traits and services built on them, `infra` the file, database,
//! media and HTTP adapters, and `config` the typed settings loader.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
