//! Storage infrastructure: configuration file loading.
//!
//! The correlator reads one TOML file at startup and never writes it.  The
//! device registry, capture settings, and hub endpoint all come from there.

pub mod config;
