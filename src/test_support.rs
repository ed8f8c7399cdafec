//! Test doubles for unit tests.
//!
//! Probe behavior is keyed on the final argument of the command line,
//! which is how the toolchain probes distinguish themselves
//! (`--version`, `-Wl,--version`, `-print-search-dirs`, ...). Commands
//! with no scripted response fail as if the program could not be
//! launched, which is exactly the degraded path the toolchain code must
//! survive.

use anyhow::bail;
use indexmap::IndexMap;

use crate::env::{ProcessOutput, ProcessRunner};
use crate::util::process::{Accept, OutputMode};

/// A process runner answering from a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: IndexMap<String, (String, String)>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        ScriptedRunner::default()
    }

    /// Script a response for command lines ending in `last_arg`.
    pub fn on(mut self, last_arg: &str, stdout: &str, stderr: &str) -> Self {
        self.responses
            .insert(last_arg.to_string(), (stdout.to_string(), stderr.to_string()));
        self
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(
        &self,
        argv: &[String],
        _stdout: OutputMode,
        _stderr: OutputMode,
        _accept: Accept,
    ) -> anyhow::Result<ProcessOutput> {
        let last = argv.last().map(String::as_str).unwrap_or("");
        match self.responses.get(last) {
            Some((stdout, stderr)) => Ok(ProcessOutput {
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            None => bail!("no scripted response for `{}`", argv.join(" ")),
        }
    }
}
