//! The archiver role for static libraries.

use crate::env::Env;
use crate::file_types::{FileArtifact, StaticLibrary};
use crate::languages::Language;
use crate::options::{BuildOption, OptionList};
use crate::path::BuildPath;
use crate::platform::ObjectFormat;
use crate::safe_str::Value;
use crate::shell;

use super::{CommandRole, FlagsMode, LinkContext, Linker, ToolchainError};

/// `ar`, wired as the static-library linker of a native toolchain.
#[derive(Debug)]
pub struct ArLinker {
    role: CommandRole,
    lang: Language,
    format: ObjectFormat,
}

impl ArLinker {
    /// Configure the archiver from `AR`/`ARFLAGS`.
    pub fn new(env: &Env, lang: Language, format: ObjectFormat) -> Self {
        let command = shell::split(&env.getvar("AR", "ar"));
        let command = if command.is_empty() {
            vec!["ar".to_string()]
        } else {
            command
        };
        let global_flags = shell::split(&env.getvar("ARFLAGS", "cr"));
        ArLinker {
            role: CommandRole::new("ar", "ar", command, "arflags", global_flags),
            lang,
            format,
        }
    }
}

impl Linker for ArLinker {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn flavor(&self) -> &'static str {
        "ar"
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn can_link(&self, format: ObjectFormat, langs: &[Language]) -> bool {
        // Archiving only bundles objects; any language of the right
        // format is fine.
        format == self.format && !langs.iter().any(Language::is_jvm)
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
                // Archives neither link libraries nor embed paths.
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "ar",
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

    /// Argument order is flags, then the archive, then its members.
    fn link_args(
        &self,
        inputs: &[Value],
        outputs: &[Value],
        _libs: Vec<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![self.role.command_ref()];
        args.extend(flags);
        args.extend(outputs.iter().cloned());
        args.extend(inputs.iter().cloned());
        args
    }

    fn output_file(
        &self,
        name: &str,
        _context: &LinkContext,
    ) -> Result<Vec<FileArtifact>, ToolchainError> {
        let path = static_library_name(name);
        Ok(vec![FileArtifact::Static(StaticLibrary {
            path,
            format: self.format,
            lang: self.lang,
        })])
    }
}

fn static_library_name(name: &str) -> BuildPath {
    let path = BuildPath::build(name);
    let parent = path.parent();
    parent.append(format!("lib{}.a", path.basename()))
}
