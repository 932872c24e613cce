//! multissl - multi-version TLS build-and-validation pipeline
//!
//! Builds many OpenSSL and LibreSSL versions into isolated install
//! prefixes, rebinds a dependent runtime's native modules to each one
//! in turn, and runs the runtime's test suite against the result.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod layout;
pub mod pipeline;
pub(crate) mod proc;
pub mod rebind;
pub mod tester;

pub use error::{MultisslError, MultisslResult};
