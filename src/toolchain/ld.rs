//! The underlying linker, discovered behind the compiler driver.
//!
//! The raw linker never appears in a build edge; it exists so the
//! toolchain can ask it things the driver hides: which linker it really
//! is (BFD vs. gold, which drives the rpath-link workaround) and where
//! it searches for libraries.

use std::sync::OnceLock;

use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::env::Env;
use crate::file_types::FileArtifact;
use crate::languages::Language;
use crate::options::{BuildOption, OptionList};
use crate::platform::ObjectFormat;
use crate::safe_str::Value;
use crate::util::process::{Accept, OutputMode};
use crate::version::detect_version;

use super::{CommandRole, FlagsMode, LinkContext, Linker, ToolchainError};

/// Which linker implementation was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdBrand {
    Bfd,
    Gold,
    Unknown,
}

impl LdBrand {
    /// The brand name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LdBrand::Bfd => "bfd",
            LdBrand::Gold => "gold",
            LdBrand::Unknown => "unknown",
        }
    }
}

fn search_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"SEARCH_DIR\("(=?)([^"]*)"\)"#).expect("static regex"))
}

/// The discovered raw linker.
#[derive(Debug, Clone)]
pub struct LdLinker {
    role: CommandRole,
    lang: Language,
    env: Env,
    pub brand: LdBrand,
    pub version: Option<Version>,
}

impl LdLinker {
    /// Wrap a discovered linker command, branding it from the
    /// `--version` output captured during discovery.
    pub fn new(env: &Env, lang: Language, command: Vec<String>, version_output: &str) -> Self {
        let (brand, version) = if version_output.contains("GNU ld") {
            (LdBrand::Bfd, detect_version(version_output))
        } else if version_output.contains("GNU gold") {
            (LdBrand::Gold, detect_version(version_output))
        } else {
            (LdBrand::Unknown, None)
        };

        LdLinker {
            role: CommandRole::new("ld", "ld", command, "ldflags", Vec::new()),
            lang,
            env: env.clone(),
            brand,
            version,
        }
    }

    /// Scrape the linker's library search directories.
    ///
    /// `ld --verbose` prints its linker script, which names each
    /// directory as `SEARCH_DIR("...")`; a leading `=` stands for the
    /// sysroot. With `strict` false, any probe failure degrades to an
    /// empty list.
    pub fn search_dirs(&self, sysroot: &str, strict: bool) -> anyhow::Result<Vec<String>> {
        let mut argv = self.role.command.clone();
        argv.push("--verbose".to_string());
        let output = match self
            .env
            .execute(&argv, OutputMode::Pipe, OutputMode::DevNull, Accept::Success)
        {
            Ok(out) => out,
            Err(err) if !strict => {
                debug!("linker search-dir probe failed: {err:#}");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let dirs = search_dir_re()
            .captures_iter(&output.stdout)
            .map(|caps| {
                let sysrooted = !caps[1].is_empty();
                let dir = &caps[2];
                if sysrooted {
                    format!("{}{}", sysroot.trim_end_matches('/'), dir)
                } else {
                    dir.to_string()
                }
            })
            .collect();
        Ok(dirs)
    }
}

impl Linker for LdLinker {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn flavor(&self) -> &'static str {
        "ld"
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn can_link(&self, _format: ObjectFormat, _langs: &[Language]) -> bool {
        // Links always go through the compiler driver.
        false
    }

    fn flags(
        &self,
        options: &OptionList,
        _output: Option<&FileArtifact>,
        _mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError> {
        let mut flags = Vec::new();
        for opt in options {
            match opt {
                BuildOption::Raw(s) => flags.push(Value::raw(s.clone())),
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "ld",
                    })
                }
            }
        }
        Ok(flags)
    }

    fn lib_flags(
        &self,
        _options: &OptionList,
        _mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError> {
        Ok(Vec::new())
    }

    fn link_args(
        &self,
        inputs: &[Value],
        outputs: &[Value],
        libs: Vec<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![self.role.command_ref()];
        args.extend(flags);
        args.extend(inputs.iter().cloned());
        args.extend(libs);
        args.push(Value::raw("-o"));
        args.extend(outputs.iter().cloned());
        args
    }

    fn output_file(
        &self,
        _name: &str,
        _context: &LinkContext,
    ) -> Result<Vec<FileArtifact>, ToolchainError> {
        Err(ToolchainError::RawLinkerOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Backend;
    use crate::platform::{HostPlatform, TargetPlatform};
    use crate::test_support::ScriptedRunner;
    use indexmap::IndexMap;
    use std::sync::Arc;

    fn env_with(runner: ScriptedRunner) -> Env {
        Env::with_runner(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::new(),
            Arc::new(runner),
        )
    }

    #[test]
    fn test_brand_bfd() {
        let ld = LdLinker::new(
            &env_with(ScriptedRunner::new()),
            Language::C,
            vec!["/usr/bin/ld".to_string()],
            "GNU ld (GNU Binutils for Ubuntu) 2.26.1",
        );
        assert_eq!(ld.brand, LdBrand::Bfd);
        assert_eq!(ld.version, Some(Version::new(2, 26, 1)));
    }

    #[test]
    fn test_brand_gold() {
        let ld = LdLinker::new(
            &env_with(ScriptedRunner::new()),
            Language::C,
            vec!["ld.gold".to_string()],
            "GNU gold (GNU Binutils 2.26.1) 1.11",
        );
        assert_eq!(ld.brand, LdBrand::Gold);
    }

    #[test]
    fn test_brand_unknown() {
        let ld = LdLinker::new(
            &env_with(ScriptedRunner::new()),
            Language::C,
            vec!["ld64".to_string()],
            "ld64-274.2",
        );
        assert_eq!(ld.brand, LdBrand::Unknown);
        assert_eq!(ld.version, None);
    }

    #[test]
    fn test_search_dirs() {
        let runner = ScriptedRunner::new().on(
            "--verbose",
            "SEARCH_DIR(\"=/usr/local/lib\"); SEARCH_DIR(\"/lib\"); SEARCH_DIR(\"=/usr/lib\");",
            "",
        );
        let ld = LdLinker::new(
            &env_with(runner),
            Language::C,
            vec!["ld".to_string()],
            "GNU ld 2.26.1",
        );
        assert_eq!(
            ld.search_dirs("/", false).unwrap(),
            vec!["/usr/local/lib", "/lib", "/usr/lib"]
        );
        assert_eq!(
            ld.search_dirs("/sysroot", false).unwrap(),
            vec!["/sysroot/usr/local/lib", "/lib", "/sysroot/usr/lib"]
        );
    }

    #[test]
    fn test_search_dirs_probe_failure() {
        let ld = LdLinker::new(
            &env_with(ScriptedRunner::new()),
            Language::C,
            vec!["ld".to_string()],
            "GNU ld 2.26.1",
        );
        assert_eq!(ld.search_dirs("/", false).unwrap(), Vec::<String>::new());
        assert!(ld.search_dirs("/", true).is_err());
    }
}
