//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{bail, Context, Result};

/// What to do with a captured output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture the stream.
    Pipe,
    /// Discard the stream.
    DevNull,
}

/// Which exit codes count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// Only a zero exit code.
    Success,
    /// Any exit code; the caller inspects the captured output.
    Any,
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Execute and capture output according to the given modes.
    pub fn exec(&self, stdout: OutputMode, stderr: OutputMode, accept: Accept) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(match stdout {
            OutputMode::Pipe => Stdio::piped(),
            OutputMode::DevNull => Stdio::null(),
        });
        cmd.stderr(match stderr {
            OutputMode::Pipe => Stdio::piped(),
            OutputMode::DevNull => Stdio::null(),
        });

        let output = cmd
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        if accept == Accept::Success && !output.status.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_captures_stdout() {
        let output = ProcessBuilder::new("echo")
            .args(["hello"])
            .exec(OutputMode::Pipe, OutputMode::DevNull, Accept::Success)
            .unwrap();
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("gcc").args(["-Wall", "-o", "out", "in.c"]);
        assert_eq!(pb.display_command(), "gcc -Wall -o out in.c");
    }
}
