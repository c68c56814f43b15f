// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration handling for the replibus replication daemon.
//!
//! This crate owns the declarative side of the daemon: the YAML-backed
//! schema, the pure validator that proves a fleet's write plan is
//! geometrically safe, the post-validation normalization pass, and the
//! file loader.
//!
//! # Pipeline
//!
//! ```text
//! load() -> validate() -> normalize() -> frozen Config
//! ```
//!
//! `validate` never mutates and performs no I/O; `normalize` is only
//! allowed to run on a configuration that already validated.

pub mod error;
pub mod loader;
pub mod normalize;
pub mod schema;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use normalize::normalize;
pub use schema::{
    Config, FleetConfig, MemoryConfig, PollConfig, ReadConfig, SourceConfig, TargetConfig,
    UnitConfig,
};
pub use validate::validate;
