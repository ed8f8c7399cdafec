//! The configuration environment.
//!
//! An [`Env`] bundles everything a toolchain builder or package resolver
//! needs from the outside world: the variable table captured at
//! configuration time, host and target platform descriptions, the backend
//! being generated for, and the process runner used for probes. It is
//! immutable after construction and passed by reference, so independent
//! configurations can coexist in one process.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::platform::{HostPlatform, TargetPlatform};
use crate::util::process::{Accept, OutputMode, ProcessBuilder};

/// The build-file dialect being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Ninja,
    Make,
}

/// Captured stdout/stderr of a finished probe.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The process-execution primitive.
///
/// Implementations run a command synchronously and return its captured
/// output; launch failures and (when `accept` demands success) nonzero
/// exits surface as errors. Tests substitute a scripted implementation.
pub trait ProcessRunner: std::fmt::Debug + Send + Sync {
    fn run(
        &self,
        argv: &[String],
        stdout: OutputMode,
        stderr: OutputMode,
        accept: Accept,
    ) -> Result<ProcessOutput>;
}

/// Runs commands on the host system.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        argv: &[String],
        stdout: OutputMode,
        stderr: OutputMode,
        accept: Accept,
    ) -> Result<ProcessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("empty command line"))?;
        let output = ProcessBuilder::new(program)
            .args(args)
            .exec(stdout, stderr, accept)?;
        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Immutable configuration handle.
#[derive(Debug, Clone)]
pub struct Env {
    vars: IndexMap<String, String>,
    pub host: HostPlatform,
    pub target: TargetPlatform,
    pub backend: Backend,
    runner: Arc<dyn ProcessRunner>,
}

impl Env {
    /// Create an environment that executes probes on the host system.
    pub fn new(
        host: HostPlatform,
        target: TargetPlatform,
        backend: Backend,
        vars: IndexMap<String, String>,
    ) -> Self {
        Env::with_runner(host, target, backend, vars, Arc::new(SystemRunner))
    }

    /// Create an environment with an explicit process runner.
    pub fn with_runner(
        host: HostPlatform,
        target: TargetPlatform,
        backend: Backend,
        vars: IndexMap<String, String>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Env {
            vars,
            host,
            target,
            backend,
            runner,
        }
    }

    /// Look up a captured variable, falling back to a default.
    pub fn getvar(&self, name: &str, default: &str) -> String {
        self.vars
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Look up a captured variable if set.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Execute a command through the configured runner.
    pub fn execute(
        &self,
        argv: &[String],
        stdout: OutputMode,
        stderr: OutputMode,
        accept: Accept,
    ) -> Result<ProcessOutput> {
        self.runner.run(argv, stdout, stderr, accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getvar_default() {
        let env = Env::new(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::from([("CC".to_string(), "clang".to_string())]),
        );
        assert_eq!(env.getvar("CC", "cc"), "clang");
        assert_eq!(env.getvar("CXX", "c++"), "c++");
        assert_eq!(env.var("CXX"), None);
    }
}
