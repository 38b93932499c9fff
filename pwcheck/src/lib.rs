//! Password strength checking, breach lookups, password generation and a local
//! credential store, driven from the `pwcheck` command line.
//!
//! Breach lookups use [`pwcheck_breach`]; persistence uses [`pwcheck_store`].

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod interactive;
pub mod logging;
pub mod service;
pub mod strength;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use generator::{Generator, GeneratorPolicy};
pub use service::{Assessment, Service};
pub use strength::{Evaluator, Finding, Policy, Severity, Strength};
