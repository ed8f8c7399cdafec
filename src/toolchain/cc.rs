//! The C-family toolchain: gcc- and clang-style drivers.
//!
//! One [`CcBuilder`] is configured per (language, command) pair. It brands
//! the compiler from its `--version` output, seeds global flags from the
//! environment, discovers the linker hiding behind the driver, and wires
//! the role objects together: a compiler, a precompiled-header compiler
//! for languages that support one, and a linker per output kind.

use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use regex::Regex;
use semver::{Version, VersionReq};
use tracing::debug;

use crate::env::{Backend, Env};
use crate::file_types::{
    DllBinary, Executable, FileArtifact, HeaderDirectory, Library, ObjectFile, PrecompiledHeader,
    SharedLibrary, VersionedSharedLibrary,
};
use crate::languages::{Language, LanguageInfo};
use crate::ninja::DepsStyle;
use crate::options::{BuildOption, LibraryRef, OptionList};
use crate::path::{BuildPath, InstallRoot, Root};
use crate::platform::{ObjectFormat, PlatformName};
use crate::safe_str::Value;
use crate::shell;
use crate::util::process::{Accept, OutputMode};
use crate::version::detect_version;

use crate::packages::CcPackageResolver;

use super::ar::ArLinker;
use super::ld::{LdBrand, LdLinker};
use super::{
    library_macro, CommandRole, Compiler, FlagsMode, LinkContext, LinkMode, Linker,
    PostInstallStep, Toolchain, ToolchainError,
};

/// The detected compiler brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcBrand {
    Gcc,
    Clang,
    Unknown,
}

impl CcBrand {
    /// The brand name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CcBrand::Gcc => "gcc",
            CcBrand::Clang => "clang",
            CcBrand::Unknown => "unknown",
        }
    }
}

/// Detection results shared by every role of one toolchain.
#[derive(Debug, Clone)]
struct CcInfo {
    brand: CcBrand,
    version: Option<Version>,
    raw_brand: Option<LdBrand>,
}

/// A configured C-family toolchain.
#[derive(Debug)]
pub struct CcBuilder {
    pub lang: Language,
    pub brand: CcBrand,
    pub version: Option<Version>,
    pub object_format: ObjectFormat,
    compiler: CcCompiler,
    pch_compiler: Option<CcCompiler>,
    exe_linker: CcLinker,
    shared_linker: CcLinker,
    static_linker: ArLinker,
    raw_linker: Option<LdLinker>,
    packages: CcPackageResolver,
}

impl CcBuilder {
    /// Probe a candidate command for its version banner.
    pub fn check_command(env: &Env, command: &[String]) -> anyhow::Result<String> {
        let mut argv = command.to_vec();
        argv.push("--version".to_string());
        let output = env.execute(&argv, OutputMode::Pipe, OutputMode::DevNull, Accept::Success)?;
        Ok(output.stdout)
    }

    /// Configure a toolchain from a captured version banner.
    pub fn new(env: &Env, info: &LanguageInfo, command: Vec<String>, version_output: &str) -> Self {
        let (brand, version) = if version_output.contains("Free Software Foundation") {
            (CcBrand::Gcc, detect_version(version_output))
        } else if version_output.contains("clang") {
            (CcBrand::Clang, detect_version(version_output))
        } else {
            (CcBrand::Unknown, None)
        };

        let object_format = env.target.object_format;

        let mut cflags = shell::split(&env.getvar("CPPFLAGS", ""));
        cflags.extend(shell::split(&env.getvar(info.cflags_var, "")));
        let ldflags = shell::split(&env.getvar("LDFLAGS", ""));
        let ldlibs = shell::split(&env.getvar("LDLIBS", ""));

        let raw_linker = Self::find_linker(env, info.lang, &command, &ldflags);
        let cc = CcInfo {
            brand,
            version: version.clone(),
            raw_brand: raw_linker.as_ref().map(|ld| ld.brand),
        };

        let compiler = CcCompiler::new(env, info, &command, &cflags, &cc, false);
        // Only the C-family languages have header precompilation.
        let pch_compiler = match info.lang {
            Language::C | Language::Cxx => {
                Some(CcCompiler::new(env, info, &command, &cflags, &cc, true))
            }
            _ => None,
        };

        let exe_linker = CcLinker::new(
            env,
            info,
            LinkMode::Executable,
            &command,
            (&ldflags, &ldlibs),
            &cc,
        );
        let shared_linker = CcLinker::new(
            env,
            info,
            LinkMode::SharedLibrary,
            &command,
            (&ldflags, &ldlibs),
            &cc,
        );
        let static_linker = ArLinker::new(env, info.lang, object_format);

        let packages = CcPackageResolver::new(
            env,
            object_format,
            info.lang,
            &compiler,
            &exe_linker,
            raw_linker.as_ref(),
        );

        CcBuilder {
            lang: info.lang,
            brand,
            version,
            object_format,
            compiler,
            pch_compiler,
            exe_linker,
            shared_linker,
            static_linker,
            raw_linker,
            packages,
        }
    }

    /// Discover the linker the driver will actually run.
    ///
    /// `cc -v -Wl,--version` makes the driver print the link line on
    /// stderr and the linker print its version on stdout. The first
    /// shell token of a stderr line mentioning `--version` is the linker
    /// command, unless it is the `collect2` wrapper, in which case the
    /// real linker shows up on a later line. Any failure leaves the raw
    /// linker role unregistered.
    fn find_linker(
        env: &Env,
        lang: Language,
        command: &[String],
        ldflags: &[String],
    ) -> Option<LdLinker> {
        let mut argv = command.to_vec();
        argv.extend(ldflags.iter().cloned());
        argv.push("-v".to_string());
        argv.push("-Wl,--version".to_string());

        let output = match env.execute(&argv, OutputMode::Pipe, OutputMode::Pipe, Accept::Any) {
            Ok(output) => output,
            Err(err) => {
                debug!("linker discovery failed: {err:#}");
                return None;
            }
        };

        for line in output.stderr.lines() {
            if !line.contains("--version") {
                continue;
            }
            let Some(first) = shell::split(line).into_iter().next() else {
                continue;
            };
            let basename = Path::new(&first)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if basename != "collect2" {
                return Some(LdLinker::new(env, lang, vec![first], &output.stdout));
            }
        }
        None
    }

    /// The discovered raw linker, when discovery succeeded.
    pub fn raw_linker(&self) -> Option<&LdLinker> {
        self.raw_linker.as_ref()
    }

    /// The package resolver configured for this toolchain.
    pub fn packages(&self) -> &CcPackageResolver {
        &self.packages
    }
}

impl Toolchain for CcBuilder {
    fn flavor(&self) -> &'static str {
        "cc"
    }

    fn family(&self) -> &'static str {
        "native"
    }

    fn can_dual_link(&self) -> bool {
        true
    }

    fn compiler(&self) -> &dyn Compiler {
        &self.compiler
    }

    fn pch_compiler(&self) -> Option<&dyn Compiler> {
        self.pch_compiler.as_ref().map(|c| c as &dyn Compiler)
    }

    fn linker(&self, mode: LinkMode) -> Result<&dyn Linker, ToolchainError> {
        match mode {
            LinkMode::Executable => Ok(&self.exe_linker),
            LinkMode::SharedLibrary => Ok(&self.shared_linker),
            LinkMode::StaticLibrary => Ok(&self.static_linker),
            LinkMode::Raw => self
                .raw_linker
                .as_ref()
                .map(|ld| ld as &dyn Linker)
                .ok_or_else(|| ToolchainError::UnknownMode(mode.as_str().to_string())),
        }
    }
}

/// The compiling role, doubling as the precompiled-header compiler.
#[derive(Debug)]
pub struct CcCompiler {
    role: CommandRole,
    lang: Language,
    brand: CcBrand,
    version: Option<Version>,
    env: Env,
    pch: bool,
}

impl CcCompiler {
    fn new(
        env: &Env,
        info: &LanguageInfo,
        command: &[String],
        cflags: &[String],
        cc: &CcInfo,
        pch: bool,
    ) -> Self {
        let name = info.rule_stem();
        let rule_name = if pch { format!("{}_pch", name) } else { name.clone() };
        CcCompiler {
            role: CommandRole::new(
                rule_name,
                name,
                command.to_vec(),
                info.cflags_var.to_lowercase(),
                cflags.to_vec(),
            ),
            lang: info.lang,
            brand: cc.brand,
            version: cc.version.clone(),
            env: env.clone(),
            pch,
        }
    }

    /// The directories the compiler consults for headers beyond the
    /// defaults.
    pub fn search_dirs(&self) -> Vec<String> {
        self.env
            .getvar("CPATH", "")
            .split(':')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn x_lang(&self) -> &'static str {
        match (self.lang, self.pch) {
            (Language::C, false) => "c",
            (Language::C, true) => "c-header",
            (Language::Cxx, false) => "c++",
            (Language::Cxx, true) => "c++-header",
            (Language::Java, _) => "java",
            (Language::Scala, _) => "scala",
        }
    }

    fn always_flags(&self) -> Vec<Value> {
        let mut flags = vec![Value::raw("-x"), Value::raw(self.x_lang())];
        // Ninja runs commands without a tty, so compilers turn colors
        // off unless told otherwise.
        if self.env.backend == Backend::Ninja {
            match self.brand {
                CcBrand::Clang => flags.push(Value::raw("-fcolor-diagnostics")),
                CcBrand::Gcc => {
                    let supported = VersionReq::parse(">=4.9")
                        .ok()
                        .zip(self.version.as_ref())
                        .is_some_and(|(req, v)| req.matches(v));
                    if supported {
                        flags.push(Value::raw("-fdiagnostics-color"));
                    }
                }
                CcBrand::Unknown => {}
            }
        }
        flags
    }

    fn include_dir_flags(&self, dir: &HeaderDirectory) -> Vec<Value> {
        let is_default = dir.path.as_host_path().is_some_and(|p| {
            self.env
                .host
                .include_dirs
                .iter()
                .any(|d| Path::new(d) == p)
        });

        // Default directories must not be demoted to -isystem: GCC 6
        // breaks on stdlib.h when /usr/include is a system dir.
        if dir.system && !is_default {
            vec![Value::raw("-isystem"), Value::path(dir.path.clone())]
        } else {
            vec![Value::raw("-I").concat(Value::path(dir.path.clone()))]
        }
    }
}

impl Compiler for CcCompiler {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn deps_style(&self) -> Option<DepsStyle> {
        Some(DepsStyle::Gcc)
    }

    fn accepts_pch(&self) -> bool {
        // You can't pass a PCH to a PCH compiler.
        !self.pch
    }

    fn flags(&self, options: &OptionList) -> Result<Vec<Value>, ToolchainError> {
        let mut flags = Vec::new();
        for opt in options {
            match opt {
                BuildOption::IncludeDir(dir) => flags.extend(self.include_dir_flags(dir)),
                BuildOption::Define(name, value) => match value {
                    Some(v) => flags.push(Value::raw(format!("-D{}={}", name, v))),
                    None => flags.push(Value::raw(format!("-D{}", name))),
                },
                BuildOption::Std(std) => flags.push(Value::raw(format!("-std={}", std))),
                BuildOption::Pthread => flags.push(Value::raw("-pthread")),
                BuildOption::Pic => flags.push(Value::raw("-fPIC")),
                BuildOption::Pch(pch) => {
                    // gcc picks up foo.hpp.gch when told -include foo.hpp.
                    flags.push(Value::raw("-include"));
                    flags.push(Value::path(pch.path.strip_ext()));
                }
                BuildOption::Raw(s) => flags.push(Value::raw(s.clone())),
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "cc compiler",
                    })
                }
            }
        }
        Ok(flags)
    }

    fn compile_args(
        &self,
        input: Value,
        output: Value,
        deps: Option<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![self.role.command_ref()];
        args.extend(self.always_flags());
        args.extend(flags);
        args.push(Value::raw("-c"));
        args.push(input);
        if let Some(deps) = deps {
            args.push(Value::raw("-MMD"));
            args.push(Value::raw("-MF"));
            args.push(deps);
        }
        args.push(Value::raw("-o"));
        args.push(output);
        args
    }

    fn output_file(&self, name: &str) -> FileArtifact {
        if self.pch {
            let ext = if self.brand == CcBrand::Gcc { ".gch" } else { ".pch" };
            FileArtifact::PrecompiledHeader(PrecompiledHeader {
                path: BuildPath::build(format!("{}{}", name, ext)),
                lang: self.lang,
            })
        } else {
            FileArtifact::Object(ObjectFile {
                path: BuildPath::build(format!("{}.o", name)),
                format: self.env.target.object_format,
                lang: self.lang,
            })
        }
    }
}

/// The linking role for executables and shared libraries.
#[derive(Debug)]
pub struct CcLinker {
    role: CommandRole,
    mode: LinkMode,
    lang: Language,
    brand: CcBrand,
    version: Option<Version>,
    env: Env,
    lib_re: Regex,
    raw_brand: Option<LdBrand>,
}

impl CcLinker {
    fn new(
        env: &Env,
        info: &LanguageInfo,
        mode: LinkMode,
        command: &[String],
        (ldflags, ldlibs): (&[String], &[String]),
        cc: &CcInfo,
    ) -> Self {
        let name = info.rule_stem();
        let rule_name = match mode {
            LinkMode::SharedLibrary => format!("{}_linklib", name),
            _ => format!("{}_link", name),
        };

        // Names linkable with -l: static archives always, shared
        // libraries only where import libraries don't stand in for them.
        let mut lib_formats = vec![r"lib(.*)\.a".to_string()];
        if !env.target.has_import_library {
            lib_formats.push(format!(
                r"lib(.*){}",
                regex::escape(env.target.shared_library_ext)
            ));
        }
        let lib_re =
            Regex::new(&format!("^(?:{})$", lib_formats.join("|"))).expect("library name pattern");

        CcLinker {
            role: CommandRole::new(rule_name, name, command.to_vec(), "ldflags", ldflags.to_vec())
                .with_libs("ldlibs", ldlibs.to_vec()),
            mode,
            lang: info.lang,
            brand: cc.brand,
            version: cc.version.clone(),
            env: env.clone(),
            lib_re,
            raw_brand: cc.raw_brand,
        }
    }

    /// The compiler brand driving this link.
    pub fn brand(&self) -> CcBrand {
        self.brand
    }

    /// The detected compiler version.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// The target sysroot, from `-print-sysroot`.
    pub fn sysroot(&self, strict: bool) -> anyhow::Result<String> {
        let mut argv = self.role.command.clone();
        argv.extend(self.role.global_flags.iter().cloned());
        argv.push("-print-sysroot".to_string());
        match self
            .env
            .execute(&argv, OutputMode::Pipe, OutputMode::DevNull, Accept::Success)
        {
            Ok(output) => Ok(output.stdout.trim().to_string()),
            Err(err) if !strict => {
                debug!("sysroot probe failed: {err:#}");
                let fallback = if self.env.target.name == PlatformName::Windows {
                    ""
                } else {
                    "/"
                };
                Ok(fallback.to_string())
            }
            Err(err) => Err(err),
        }
    }

    /// The directories the driver searches for libraries.
    pub fn search_dirs(&self, strict: bool) -> anyhow::Result<Vec<String>> {
        let library_path = || -> Vec<String> {
            self.env
                .getvar("LIBRARY_PATH", "")
                .split(':')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut argv = self.role.command.clone();
        argv.extend(self.role.global_flags.iter().cloned());
        argv.push("-print-search-dirs".to_string());
        match self
            .env
            .execute(&argv, OutputMode::Pipe, OutputMode::DevNull, Accept::Success)
        {
            Ok(output) => {
                let mut dirs: Vec<String> = output
                    .stdout
                    .lines()
                    .find_map(|line| line.strip_prefix("libraries: ="))
                    .map(|list| list.split(':').map(str::to_string).collect())
                    .unwrap_or_default();
                // clang ignores LIBRARY_PATH in -print-search-dirs.
                if self.brand == CcBrand::Clang {
                    let mut all = library_path();
                    all.append(&mut dirs);
                    dirs = all;
                }
                Ok(dirs)
            }
            Err(err) if !strict => {
                debug!("search-dir probe failed: {err:#}");
                Ok(library_path())
            }
            Err(err) => Err(err),
        }
    }

    fn extract_lib_name(&self, library: &Library) -> Result<String, ToolchainError> {
        let path = match library {
            // Versioned libraries are linked through their unversioned
            // name.
            Library::VersionedShared(lib) => &lib.link,
            other => other
                .path()
                .ok_or_else(|| ToolchainError::InvalidLibraryName(String::new()))?,
        };
        let basename = path.basename();
        let caps = self
            .lib_re
            .captures(basename)
            .ok_or_else(|| ToolchainError::InvalidLibraryName(basename.to_string()))?;
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ToolchainError::InvalidLibraryName(basename.to_string()))
    }

    fn always_flags(&self) -> Vec<Value> {
        let mut flags = Vec::new();
        if self.env.target.object_format == ObjectFormat::MachO {
            // Leave room in the headers for the post-install rename.
            flags.push(Value::raw("-Wl,-headerpad_max_install_names"));
        }
        if self.mode == LinkMode::SharedLibrary {
            let shared = if self.env.target.name == PlatformName::Darwin {
                "-dynamiclib"
            } else {
                "-shared"
            };
            flags.push(Value::raw(shared));
            flags.push(Value::raw("-fPIC"));
        }
        flags
    }

    fn link_lib(
        &self,
        lib_ref: &LibraryRef,
        raw_static: bool,
    ) -> Result<Vec<Value>, ToolchainError> {
        let library = match lib_ref {
            LibraryRef::Named(name) => return Ok(vec![Value::raw(format!("-l{}", name))]),
            LibraryRef::File(library) => library,
        };

        match library {
            Library::WholeArchive(lib) => {
                if self.env.target.name == PlatformName::Darwin {
                    Ok(vec![
                        Value::raw("-Wl,-force_load"),
                        Value::path(lib.path.clone()),
                    ])
                } else {
                    Ok(vec![
                        Value::raw("-Wl,--whole-archive"),
                        Value::path(lib.path.clone()),
                        Value::raw("-Wl,--no-whole-archive"),
                    ])
                }
            }
            Library::Framework(framework) => {
                if !self.env.target.has_frameworks {
                    return Err(ToolchainError::FrameworksUnsupported);
                }
                Ok(vec![
                    Value::raw("-framework"),
                    Value::raw(framework.full_name()),
                ])
            }
            Library::Static(lib) => {
                // Raw paths keep the linker from silently preferring a
                // shared sibling.
                if raw_static {
                    Ok(vec![Value::path(lib.path.clone())])
                } else {
                    Ok(vec![Value::raw(format!(
                        "-l{}",
                        self.extract_lib_name(library)?
                    ))])
                }
            }
            Library::Shared(_) | Library::VersionedShared(_) | Library::Dll(_) => Ok(vec![
                Value::raw(format!("-l{}", self.extract_lib_name(library)?)),
            ]),
            Library::Generic(lib) => match self.extract_lib_name(library) {
                Ok(name) => Ok(vec![Value::raw(format!("-l{}", name))]),
                Err(err) => {
                    if raw_static {
                        Ok(vec![Value::path(lib.path.clone())])
                    } else {
                        Err(err)
                    }
                }
            },
        }
    }

    fn lib_dir(
        &self,
        lib_ref: &LibraryRef,
        raw_static: bool,
    ) -> Result<Vec<BuildPath>, ToolchainError> {
        let library = match lib_ref {
            LibraryRef::Named(_) => return Ok(Vec::new()),
            LibraryRef::File(library) => library,
        };

        match library {
            Library::Framework(_) | Library::WholeArchive(_) => Ok(Vec::new()),
            Library::Static(lib) => {
                if raw_static {
                    Ok(Vec::new())
                } else {
                    Ok(vec![lib.path.parent()])
                }
            }
            Library::Shared(lib) => Ok(vec![lib.path.parent()]),
            Library::VersionedShared(lib) => Ok(vec![lib.link.parent()]),
            Library::Dll(lib) => Ok(vec![lib.import_lib.parent()]),
            Library::Generic(lib) => match self.extract_lib_name(library) {
                Ok(_) => Ok(vec![lib.path.parent()]),
                Err(err) => {
                    if raw_static {
                        Ok(Vec::new())
                    } else {
                        Err(err)
                    }
                }
            },
        }
    }

    /// The rpath contributions of one linked library: the runtime search
    /// path itself and, when the BFD workaround applies, link-time
    /// rpath-link directories for its transitive runtime dependencies.
    fn local_rpath(
        &self,
        library: &Library,
        output: Option<&FileArtifact>,
    ) -> Result<(Vec<Value>, Vec<BuildPath>), ToolchainError> {
        let Some(runtime) = library.runtime_file() else {
            return Ok((Vec::new(), Vec::new()));
        };
        if self.env.target.object_format != ObjectFormat::Elf {
            return Ok((Vec::new(), Vec::new()));
        }

        let dir = runtime.parent();
        let rpath = match dir.root() {
            Root::Absolute | Root::Install(_) => Value::path(dir.clone()),
            _ => {
                let output = output.ok_or(ToolchainError::RpathUnconstructible)?;
                let rel = dir
                    .relpath(&output.path().parent(), "$ORIGIN")
                    .map_err(|_| ToolchainError::RpathUnconstructible)?;
                Value::raw(rel)
            }
        };

        // BFD's ld doesn't resolve $ORIGIN in a dependency's own rpath
        // when chasing transitive libraries, so spell their directories
        // out with -rpath-link. When discovery failed we assume BFD;
        // the extra flags are harmless elsewhere.
        let raw_brand = self.raw_brand.unwrap_or(LdBrand::Bfd);
        let mut rpath_link = Vec::new();
        if output.is_some() && raw_brand == LdBrand::Bfd {
            collect_runtime_dep_dirs(library, &mut rpath_link);
        }

        Ok((vec![rpath], rpath_link))
    }

    /// The loader-relative rpath for locally-built Mach-O binaries.
    fn darwin_rpath(&self, options: &OptionList, output: Option<&FileArtifact>) -> Option<String> {
        let output = output?;
        if self.env.target.object_format != ObjectFormat::MachO {
            return None;
        }
        let links_shared = options.libs().any(|lib_ref| match lib_ref {
            LibraryRef::File(library) => {
                !library.is_static() && !matches!(library, Library::Framework(_))
            }
            LibraryRef::Named(_) => false,
        });
        if !links_shared {
            return None;
        }
        BuildPath::build("")
            .relpath(&output.path().parent(), "@loader_path")
            .ok()
    }

    /// The rpaths a binary carries once installed.
    fn installed_rpaths(&self, options: &OptionList) -> Vec<BuildPath> {
        let mut rpaths = Vec::new();
        for opt in options {
            match opt {
                BuildOption::Lib(LibraryRef::File(library)) => {
                    if library.runtime_file().is_some() {
                        rpaths.push(install_path_of(library).parent());
                    }
                }
                BuildOption::RpathDir(path) => rpaths.push(path.clone()),
                _ => {}
            }
        }
        rpaths.into_iter().unique().collect()
    }

    fn soname_flags(&self, output: &FileArtifact) -> Vec<Value> {
        let soname = match output {
            FileArtifact::VersionedShared(lib) => &lib.soname,
            other => other.path(),
        };
        if self.env.target.name == PlatformName::Darwin {
            vec![
                Value::raw("-install_name"),
                Value::raw(darwin_install_name(soname)),
            ]
        } else {
            vec![Value::raw(format!("-Wl,-soname,{}", soname.basename()))]
        }
    }

    fn lib_name(&self, name: &str, prefix: &str, suffix: &str) -> BuildPath {
        let path = BuildPath::build(name);
        let parent = path.parent();
        parent.append(format!(
            "{}{}{}{}",
            prefix,
            path.basename(),
            self.env.target.shared_library_ext,
            suffix
        ))
    }
}

impl Linker for CcLinker {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn flavor(&self) -> &'static str {
        "cc"
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn can_link(&self, format: ObjectFormat, langs: &[Language]) -> bool {
        if format != self.env.target.object_format {
            return false;
        }
        langs.iter().all(|lang| match self.lang {
            Language::C => *lang == Language::C,
            Language::Cxx => matches!(lang, Language::C | Language::Cxx),
            _ => false,
        })
    }

    fn num_outputs(&self) -> usize {
        if self.mode == LinkMode::SharedLibrary && self.env.target.has_import_library {
            2
        } else {
            1
        }
    }

    fn flags(
        &self,
        options: &OptionList,
        output: Option<&FileArtifact>,
        mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError> {
        let raw_static = mode != FlagsMode::PkgConfig;
        let mut flags = Vec::new();
        let mut lib_dirs = Vec::new();
        let mut rpaths: Vec<Value> = Vec::new();
        let mut rpath_links: Vec<BuildPath> = Vec::new();

        if let Some(rel) = self.darwin_rpath(options, output) {
            rpaths.push(Value::raw(rel));
        }

        for opt in options {
            match opt {
                BuildOption::LibDir(dir) => lib_dirs.push(dir.clone()),
                BuildOption::Lib(lib_ref) => {
                    lib_dirs.extend(self.lib_dir(lib_ref, raw_static)?);
                    if let LibraryRef::File(library) = lib_ref {
                        let (rp, rplink) = self.local_rpath(library, output)?;
                        rpaths.extend(rp);
                        rpath_links.extend(rplink);
                    }
                }
                BuildOption::RpathDir(path) => rpaths.push(Value::path(path.clone())),
                BuildOption::RpathLinkDir(path) => rpath_links.push(path.clone()),
                BuildOption::Pthread => {
                    // Darwin's driver warns about -pthread at link time.
                    if self.env.target.name != PlatformName::Darwin {
                        flags.push(Value::raw("-pthread"));
                    }
                }
                BuildOption::EntryPoint(_) => {
                    return Err(ToolchainError::EntryPointUnsupported("java"));
                }
                BuildOption::Raw(s) => flags.push(Value::raw(s.clone())),
                BuildOption::LibLiteral(_) => {}
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "cc linker",
                    })
                }
            }
        }

        for dir in lib_dirs.into_iter().unique() {
            flags.push(Value::raw("-L").concat(Value::path(dir)));
        }
        if !rpaths.is_empty() {
            flags.push(Value::raw("-Wl,-rpath,").concat(Value::join(rpaths, ":")));
        }
        if !rpath_links.is_empty() {
            let links = rpath_links.into_iter().unique().map(Value::path);
            flags.push(Value::raw("-Wl,-rpath-link,").concat(Value::join(links, ":")));
        }

        if self.mode == LinkMode::SharedLibrary {
            if let Some(output) = output {
                flags.extend(self.soname_flags(output));
            }
        }
        Ok(flags)
    }

    fn lib_flags(
        &self,
        options: &OptionList,
        mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError> {
        let raw_static = mode != FlagsMode::PkgConfig;
        let mut flags = Vec::new();
        for opt in options {
            match opt {
                BuildOption::Lib(lib_ref) => flags.extend(self.link_lib(lib_ref, raw_static)?),
                BuildOption::LibLiteral(value) => flags.push(value.clone()),
                _ => {}
            }
        }
        Ok(flags)
    }

    fn link_args(
        &self,
        inputs: &[Value],
        outputs: &[Value],
        libs: Vec<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![self.role.command_ref()];
        args.extend(self.always_flags());
        args.extend(flags);
        args.extend(inputs.iter().cloned());
        args.extend(libs);
        args.push(Value::raw("-o"));
        if let Some(first) = outputs.first() {
            args.push(first.clone());
        }
        if self.num_outputs() == 2 {
            if let Some(implib) = outputs.get(1) {
                args.push(Value::raw("-Wl,--out-implib=").concat(implib.clone()));
            }
        }
        args
    }

    fn always_libs(&self, primary: bool) -> OptionList {
        let mut libs = OptionList::new();
        // A non-c++ driver linking c++ objects still needs the runtime.
        if self.lang == Language::Cxx && !primary {
            libs.push(BuildOption::Lib(LibraryRef::Named("stdc++".to_string())));
        }
        libs
    }

    fn compile_options(&self, context: &LinkContext) -> OptionList {
        let mut options = OptionList::new();
        if self.mode == LinkMode::SharedLibrary {
            options.push(BuildOption::Pic);
            if self.env.target.has_import_library {
                options.push(BuildOption::Define(
                    library_macro(&context.name, LinkMode::SharedLibrary),
                    None,
                ));
            }
        }
        options
    }

    fn output_file(
        &self,
        name: &str,
        context: &LinkContext,
    ) -> Result<Vec<FileArtifact>, ToolchainError> {
        let format = self.env.target.object_format;
        if self.mode == LinkMode::Executable {
            let path = BuildPath::build(format!("{}{}", name, self.env.target.executable_ext));
            return Ok(vec![FileArtifact::Executable(Executable {
                path,
                format,
                lang: self.lang,
            })]);
        }

        if let (Some(version), true) = (&context.version, self.env.target.has_versioned_library) {
            let soversion = context.soversion.as_deref().unwrap_or(version.as_str());
            let (real, soname) = if self.env.target.name == PlatformName::Darwin {
                (
                    self.lib_name(&format!("{}.{}", name, version), "lib", ""),
                    self.lib_name(&format!("{}.{}", name, soversion), "lib", ""),
                )
            } else {
                (
                    self.lib_name(name, "lib", &format!(".{}", version)),
                    self.lib_name(name, "lib", &format!(".{}", soversion)),
                )
            };
            let link = self.lib_name(name, "lib", "");
            return Ok(vec![FileArtifact::VersionedShared(VersionedSharedLibrary {
                path: real,
                format,
                soname,
                link,
                runtime_deps: Vec::new(),
            })]);
        }

        if self.env.target.has_import_library {
            let dll = self.lib_name(name, "lib", "");
            let implib = self.lib_name(name, "lib", ".a");
            return Ok(vec![FileArtifact::Dll(DllBinary {
                path: dll,
                format,
                import_lib: implib,
            })]);
        }

        Ok(vec![FileArtifact::Shared(SharedLibrary {
            path: self.lib_name(name, "lib", ""),
            format,
            runtime_deps: Vec::new(),
        })])
    }

    fn post_install(
        &self,
        options: &OptionList,
        output: &FileArtifact,
    ) -> Option<PostInstallStep> {
        match self.env.target.object_format {
            ObjectFormat::Elf => Some(PostInstallStep::PatchElf {
                path: artifact_install_path(output),
                rpaths: self.installed_rpaths(options),
            }),
            ObjectFormat::MachO => {
                let changes = options
                    .libs()
                    .filter_map(|lib_ref| match lib_ref {
                        LibraryRef::File(library) => library
                            .runtime_file()
                            .map(|runtime| (darwin_install_name(runtime), install_path_of(library))),
                        LibraryRef::Named(_) => None,
                    })
                    .collect();
                let is_library = self.mode == LinkMode::SharedLibrary;
                Some(PostInstallStep::InstallNameTool {
                    path: artifact_install_path(output),
                    id: is_library.then(|| artifact_install_path(output)),
                    delete_rpath: self.darwin_rpath(options, Some(output)),
                    changes,
                })
            }
            _ => None,
        }
    }
}

/// The install name a Mach-O library advertises before installation.
pub fn darwin_install_name(runtime: &BuildPath) -> String {
    format!("@rpath/{}", runtime.basename())
}

/// Where an artifact lands when installed.
fn artifact_install_path(artifact: &FileArtifact) -> BuildPath {
    let root = match artifact {
        FileArtifact::Executable(_) => InstallRoot::BinDir,
        _ => InstallRoot::LibDir,
    };
    BuildPath::install(root, artifact.path().basename())
}

/// Where a linked library lands when installed.
fn install_path_of(library: &Library) -> BuildPath {
    let basename = library
        .runtime_file()
        .or_else(|| library.path())
        .map(BuildPath::basename)
        .unwrap_or_default();
    BuildPath::install(InstallRoot::LibDir, basename)
}

fn collect_runtime_dep_dirs(library: &Library, acc: &mut Vec<BuildPath>) {
    fn walk(deps: &[Arc<SharedLibrary>], acc: &mut Vec<BuildPath>) {
        for dep in deps {
            acc.push(dep.path.parent());
            walk(&dep.runtime_deps, acc);
        }
    }
    walk(library.runtime_deps(), acc);
}
