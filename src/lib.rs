//! Mine dependency-upgrade regressions from TypeScript repositories and grade
//! candidate fixes by comparing type-check diagnostics before and after.

pub mod cli;
pub mod commands;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod evaluate;
pub mod exec;
pub mod generator;
pub mod github;
pub mod manifest;
pub mod model;
pub mod nvm;
pub mod registry;
pub mod store;
pub mod upgrade;
pub mod util;
pub mod workspace;

pub use error::BenchError;
