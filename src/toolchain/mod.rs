//! Toolchain abstraction.
//!
//! A [`Toolchain`] wires together the role objects for one (language,
//! command) pair: a compiler, possibly a precompiled-header compiler, and
//! one linker per output kind. Each role exposes the same small surface
//! (translate an option list into flags, name an output file),
//! implemented independently per family; shared mechanics like rule
//! naming and seeded global flags live in the [`CommandRole`] composition
//! helper rather than an inheritance chain.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::env::Env;
use crate::file_types::FileArtifact;
use crate::languages::{Language, LanguageInfo};
use crate::ninja::{DepsStyle, Variable};
use crate::options::OptionList;
use crate::path::BuildPath;
use crate::platform::ObjectFormat;
use crate::safe_str::Value;
use crate::shell;
use crate::util::process;

pub mod ar;
pub mod cc;
pub mod jvm;
pub mod ld;

/// The output kind a linker produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMode {
    Executable,
    SharedLibrary,
    StaticLibrary,
    /// The underlying linker itself, used only for discovery queries.
    Raw,
}

impl LinkMode {
    /// The mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Executable => "executable",
            LinkMode::SharedLibrary => "shared_library",
            LinkMode::StaticLibrary => "static_library",
            LinkMode::Raw => "raw",
        }
    }
}

/// How translated flags will be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsMode {
    /// Building our own graph: static libraries may be passed raw.
    #[default]
    Normal,
    /// Flags exported for package metadata: everything via `-l`.
    PkgConfig,
}

/// Error raised by toolchain construction and flag translation.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("unknown link mode `{0}`")]
    UnknownMode(String),

    #[error("static linking not supported with {0}")]
    StaticLinkUnsupported(String),

    #[error("frameworks not supported on this platform")]
    FrameworksUnsupported,

    #[error("entry point only applies to {0}")]
    EntryPointUnsupported(&'static str),

    #[error("unknown option type `{option}` for {role}")]
    UnknownOption {
        option: &'static str,
        role: &'static str,
    },

    #[error("`{0}` is not a valid library name")]
    InvalidLibraryName(String),

    #[error("unable to construct rpath")]
    RpathUnconstructible,

    #[error("the raw linker does not produce outputs")]
    RawLinkerOutput,
}

/// Rule naming and seeded flags shared by every build command.
#[derive(Debug, Clone)]
pub struct CommandRole {
    /// The build-file rule this command is registered under.
    pub rule_name: String,
    /// The variable holding the command itself.
    pub command_var: String,
    /// The invocation, as captured at configuration time.
    pub command: Vec<String>,
    /// The variable holding global flags.
    pub flags_var: String,
    /// Environment-seeded global flags.
    pub global_flags: Vec<String>,
    /// The variable holding global libraries, for roles that link.
    pub libs_var: Option<String>,
    /// Environment-seeded global libraries.
    pub global_libs: Vec<String>,
}

impl CommandRole {
    /// A role with no library handling.
    pub fn new(
        rule_name: impl Into<String>,
        command_var: impl Into<String>,
        command: Vec<String>,
        flags_var: impl Into<String>,
        global_flags: Vec<String>,
    ) -> Self {
        CommandRole {
            rule_name: rule_name.into(),
            command_var: command_var.into(),
            command,
            flags_var: flags_var.into(),
            global_flags,
            libs_var: None,
            global_libs: Vec::new(),
        }
    }

    /// Extend the role with library handling.
    pub fn with_libs(mut self, libs_var: impl Into<String>, global_libs: Vec<String>) -> Self {
        self.libs_var = Some(libs_var.into());
        self.global_libs = global_libs;
        self
    }

    /// A reference to the variable holding this command.
    pub fn command_ref(&self) -> Value {
        Variable::new(&self.command_var).use_()
    }
}

/// Choose the invocation for a language's compiler: the configured
/// environment variable when set, a PATH lookup of the conventional name
/// otherwise, and the bare name as a last resort.
pub fn default_command(env: &Env, info: &LanguageInfo) -> Vec<String> {
    let configured = env.getvar(info.compiler_var, "");
    if !configured.is_empty() {
        let split = shell::split(&configured);
        if !split.is_empty() {
            return split;
        }
    }
    match process::find_executable(info.default_compiler) {
        Some(path) => vec![path.to_string_lossy().into_owned()],
        None => vec![info.default_compiler.to_string()],
    }
}

/// Extra knowledge about the thing being linked.
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    /// The target's base name.
    pub name: String,
    /// Full version for versioned shared libraries.
    pub version: Option<String>,
    /// ABI version for the soname.
    pub soversion: Option<String>,
    /// Entry point, for families that support one.
    pub entry_point: Option<String>,
}

/// A post-install rewrite to be carried out by an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostInstallStep {
    /// Replace the rpath list in an installed ELF binary.
    PatchElf {
        path: BuildPath,
        rpaths: Vec<BuildPath>,
    },
    /// Rewrite install names in an installed Mach-O binary and drop the
    /// loader-relative rpath.
    InstallNameTool {
        path: BuildPath,
        /// The binary's own new id, when it is a library.
        id: Option<BuildPath>,
        /// The rpath entry to delete.
        delete_rpath: Option<String>,
        /// (old install name, new absolute path) pairs.
        changes: Vec<(String, BuildPath)>,
    },
}

/// A compiling role.
pub trait Compiler {
    fn role(&self) -> &CommandRole;

    /// The language this compiler accepts.
    fn lang(&self) -> Language;

    /// The dependency-file style the command emits, if any.
    fn deps_style(&self) -> Option<DepsStyle> {
        None
    }

    /// Whether a precompiled header may be passed to this compiler.
    fn accepts_pch(&self) -> bool;

    /// Whether compilation needs the library list (JVM classpaths).
    fn needs_libs(&self) -> bool {
        false
    }

    /// Translate options into compiler flags.
    fn flags(&self, options: &OptionList) -> Result<Vec<Value>, ToolchainError>;

    /// Assemble the full argument vector for one compilation.
    fn compile_args(
        &self,
        input: Value,
        output: Value,
        deps: Option<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value>;

    /// Name the output artifact for a target base name.
    fn output_file(&self, name: &str) -> FileArtifact;
}

/// A linking role (including archivers and jar packaging).
pub trait Linker {
    fn role(&self) -> &CommandRole;

    /// The family-specific flavor tag.
    fn flavor(&self) -> &'static str;

    /// The language driving the link.
    fn lang(&self) -> Language;

    /// Whether this linker can combine the given object format and
    /// source languages.
    fn can_link(&self, format: ObjectFormat, langs: &[Language]) -> bool;

    /// How many outputs one invocation produces.
    fn num_outputs(&self) -> usize {
        1
    }

    /// Translate options into linker flags.
    fn flags(
        &self,
        options: &OptionList,
        output: Option<&FileArtifact>,
        mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError>;

    /// Translate options into library flags (the trailing `-l...` group).
    fn lib_flags(
        &self,
        options: &OptionList,
        mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError>;

    /// Assemble the full argument vector for one link.
    fn link_args(
        &self,
        inputs: &[Value],
        outputs: &[Value],
        libs: Vec<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value>;

    /// Libraries every link of this kind needs, beyond what the target
    /// asked for. `primary` is true when this linker's own language is
    /// the dominant one.
    fn always_libs(&self, _primary: bool) -> OptionList {
        OptionList::new()
    }

    /// Options injected into compilations feeding this linker.
    fn compile_options(&self, _context: &LinkContext) -> OptionList {
        OptionList::new()
    }

    /// Name the output artifacts for a target base name.
    fn output_file(
        &self,
        name: &str,
        context: &LinkContext,
    ) -> Result<Vec<FileArtifact>, ToolchainError>;

    /// The rewrite needed after installing the output, if any.
    fn post_install(
        &self,
        _options: &OptionList,
        _output: &FileArtifact,
    ) -> Option<PostInstallStep> {
        None
    }
}

/// A configured toolchain: compiler plus per-mode linkers.
pub trait Toolchain {
    /// The flavor tag (`cc`, `jvm`).
    fn flavor(&self) -> &'static str;

    /// The family tag (`native`, `jvm`).
    fn family(&self) -> &'static str;

    /// Whether the compiler resolves libraries itself at link time.
    fn auto_link(&self) -> bool {
        false
    }

    /// Whether one front-end drives multiple source languages.
    fn can_dual_link(&self) -> bool;

    /// The compiler role.
    fn compiler(&self) -> &dyn Compiler;

    /// The precompiled-header compiler, for languages that support one.
    fn pch_compiler(&self) -> Option<&dyn Compiler> {
        None
    }

    /// Look up the linker for an output kind.
    fn linker(&self, mode: LinkMode) -> Result<&dyn Linker, ToolchainError>;
}

/// The preprocessor macro defined when building a library named `name`.
///
/// Only meaningful on platforms with separate import/export rules.
pub fn library_macro(name: &str, mode: LinkMode) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\W").expect("static regex"));
    let upper = name.to_uppercase();
    let stem = re.replace_all(&upper, "_");
    let suffix = if mode == LinkMode::SharedLibrary {
        "EXPORTS"
    } else {
        "STATIC"
    };
    format!("{}_{}", stem, suffix)
}
