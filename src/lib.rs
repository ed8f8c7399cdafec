//! Gantry - a Ninja build-file generator with an abstract toolchain layer.
//!
//! This crate provides the core machinery for turning abstract compile and
//! link operations into a correctly escaped, dependency-ordered Ninja
//! build graph: the in-memory graph model and serializer, toolchain
//! builders for the native C family and the JVM family, per-role
//! option-to-flag translators, and package resolvers that locate headers,
//! libraries, and jars on the host system.

pub mod env;
pub mod file_types;
pub mod languages;
pub mod ninja;
pub mod options;
pub mod packages;
pub mod path;
pub mod platform;
pub mod safe_str;
pub mod shell;
pub mod toolchain;
pub mod util;
pub mod version;

/// Test doubles for gantry's own unit tests.
#[cfg(test)]
pub mod test_support;

pub use env::{Backend, Env};
pub use file_types::FileArtifact;
pub use languages::{Language, Languages};
pub use ninja::{BuildArgs, GraphError, NinjaFile, Rule, Section};
pub use options::{BuildOption, OptionList};
pub use packages::{CommonPackage, PackageKind, PackageResolutionError};
pub use path::{BuildPath, InstallRoot, Root};
pub use platform::{HostPlatform, ObjectFormat, TargetPlatform};
pub use safe_str::Value;
pub use toolchain::{LinkMode, Toolchain, ToolchainError};
