//! The JVM-family toolchain: javac/scalac plus jar packaging.
//!
//! The family collapses "compile" and "link" into an archiving step: the
//! same [`JarMaker`] serves both the executable and shared-library output
//! kinds, and static linking is a capability error. Class-path handling
//! replaces the native family's library flags, and the entry point lands
//! in a generated manifest rather than on the command line.

use itertools::Itertools;

use semver::Version;

use crate::env::Env;
use crate::file_types::{ClassList, FileArtifact, GenericLibrary, ObjectFile};
use crate::languages::{Language, LanguageInfo};
use crate::options::{BuildOption, LibraryRef, OptionList};
use crate::path::BuildPath;
use crate::platform::ObjectFormat;
use crate::safe_str::Value;
use crate::shell;
use crate::util::process::{Accept, OutputMode};
use crate::version::detect_version;

use super::{
    CommandRole, Compiler, FlagsMode, LinkContext, LinkMode, Linker, Toolchain, ToolchainError,
};

/// The path separator used in class paths.
const CLASSPATH_SEP: &str = ":";

/// The detected JVM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JvmBrand {
    Oracle,
    OpenJdk,
    Epfl,
    Unknown,
}

impl JvmBrand {
    /// The brand name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JvmBrand::Oracle => "oracle",
            JvmBrand::OpenJdk => "openjdk",
            JvmBrand::Epfl => "epfl",
            JvmBrand::Unknown => "unknown",
        }
    }
}

/// A configured JVM toolchain.
#[derive(Debug)]
pub struct JvmBuilder {
    pub lang: Language,
    pub brand: JvmBrand,
    pub version: Option<Version>,
    compiler: JvmCompiler,
    jar: JarMaker,
    runner: JvmRunner,
}

impl JvmBuilder {
    /// Probe the runner for its version banner.
    ///
    /// `java -version` historically writes to stderr, so both streams are
    /// captured and concatenated.
    pub fn check_command(env: &Env, runner_command: &[String]) -> anyhow::Result<String> {
        let mut argv = runner_command.to_vec();
        argv.push("-version".to_string());
        let output = env.execute(&argv, OutputMode::Pipe, OutputMode::Pipe, Accept::Success)?;
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    /// Configure a toolchain from the runner's captured version banner.
    pub fn new(
        env: &Env,
        info: &LanguageInfo,
        command: Vec<String>,
        jar_command: Vec<String>,
        version_output: &str,
    ) -> Self {
        let (brand, version) = if version_output.contains("Java(TM)") {
            (JvmBrand::Oracle, detect_version(version_output))
        } else if version_output.contains("openjdk") {
            (JvmBrand::OpenJdk, detect_version(version_output))
        } else if version_output.contains("EPFL") {
            (JvmBrand::Epfl, detect_version(version_output))
        } else {
            (JvmBrand::Unknown, None)
        };

        let flags = shell::split(&env.getvar(info.cflags_var, ""));
        let compiler = JvmCompiler::new(env, info, command, flags);
        let jar = JarMaker::new(info.lang, jar_command);
        let runner = JvmRunner::new(env, info);

        JvmBuilder {
            lang: info.lang,
            brand,
            version,
            compiler,
            jar,
            runner,
        }
    }

    /// The runner used to execute produced jars.
    pub fn runner(&self) -> &JvmRunner {
        &self.runner
    }

    /// The jar step with its concrete type, for the manifest pre-build
    /// and input rewriting the `Linker` trait doesn't carry.
    pub fn jar_maker(&self) -> &JarMaker {
        &self.jar
    }
}

impl Toolchain for JvmBuilder {
    fn flavor(&self) -> &'static str {
        "jvm"
    }

    fn family(&self) -> &'static str {
        "jvm"
    }

    fn can_dual_link(&self) -> bool {
        false
    }

    fn compiler(&self) -> &dyn Compiler {
        &self.compiler
    }

    fn linker(&self, mode: LinkMode) -> Result<&dyn Linker, ToolchainError> {
        match mode {
            LinkMode::Executable | LinkMode::SharedLibrary => Ok(&self.jar),
            LinkMode::StaticLibrary => Err(ToolchainError::StaticLinkUnsupported(
                self.brand.as_str().to_string(),
            )),
            LinkMode::Raw => Err(ToolchainError::UnknownMode(mode.as_str().to_string())),
        }
    }
}

/// The compiling role (javac, scalac).
///
/// Compilation output is a class list captured by the `gantry-jvmoutput`
/// helper, which watches the compiler's `-verbose` stream to learn which
/// class files one source file produced.
#[derive(Debug)]
pub struct JvmCompiler {
    role: CommandRole,
    lang: Language,
    jvmoutput: String,
}

impl JvmCompiler {
    fn new(env: &Env, info: &LanguageInfo, command: Vec<String>, flags: Vec<String>) -> Self {
        let name = info.rule_stem();
        JvmCompiler {
            role: CommandRole::new(
                name.clone(),
                name,
                command,
                info.cflags_var.to_lowercase(),
                flags,
            ),
            lang: info.lang,
            jvmoutput: env.getvar("JVMOUTPUT", "gantry-jvmoutput"),
        }
    }

    /// The class-list capture helper command.
    pub fn jvmoutput(&self) -> &str {
        &self.jvmoutput
    }

    fn class_path(&self, options: &OptionList) -> Vec<Value> {
        let dirs: Vec<Value> = options
            .libs()
            .filter_map(|lib_ref| match lib_ref {
                LibraryRef::File(library) => library.path().cloned().map(Value::path),
                LibraryRef::Named(_) => None,
            })
            .unique()
            .collect();
        if dirs.is_empty() {
            return Vec::new();
        }
        vec![
            Value::raw("-cp"),
            Value::join(dirs, CLASSPATH_SEP),
        ]
    }
}

impl Compiler for JvmCompiler {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn accepts_pch(&self) -> bool {
        false
    }

    fn needs_libs(&self) -> bool {
        true
    }

    fn flags(&self, options: &OptionList) -> Result<Vec<Value>, ToolchainError> {
        let mut flags = self.class_path(options);
        for opt in options {
            match opt {
                BuildOption::Lib(_) => {}
                // The jar step's manifest carries the entry point.
                BuildOption::EntryPoint(_) => {}
                BuildOption::Raw(s) => flags.push(Value::raw(s.clone())),
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "jvm compiler",
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
        _deps: Option<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![
            Value::raw(self.jvmoutput.clone()),
            Value::raw("-o"),
            output,
            self.role.command_ref(),
        ];
        args.extend(flags);
        args.push(Value::raw("-verbose"));
        args.push(Value::raw("-d"));
        args.push(Value::raw("."));
        args.push(input);
        args
    }

    fn output_file(&self, name: &str) -> FileArtifact {
        FileArtifact::ClassList(ClassList {
            object: ObjectFile {
                path: BuildPath::build(format!("{}.classlist", name)),
                format: ObjectFormat::Jvm,
                lang: self.lang,
            },
        })
    }
}

/// A generated jar manifest and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarManifest {
    pub path: BuildPath,
    pub lines: Vec<String>,
}

/// The archiving role shared by executable and shared-library outputs.
#[derive(Debug)]
pub struct JarMaker {
    role: CommandRole,
    lang: Language,
}

impl JarMaker {
    fn new(lang: Language, command: Vec<String>) -> Self {
        JarMaker {
            role: CommandRole::new("jar", "jar", command, "jarflags", Vec::new())
                .with_libs("jarlibs", Vec::new()),
            lang,
        }
    }

    /// Describe the manifest the jar step needs written beforehand.
    ///
    /// The caller wires this up as its own build edge; the jar edge then
    /// depends on the manifest file.
    pub fn pre_build(&self, name: &str, options: &OptionList) -> JarManifest {
        let base = BuildPath::build(name).parent();
        let dirs: Vec<String> = options
            .libs()
            .filter_map(|lib_ref| match lib_ref {
                LibraryRef::File(library) => library.path().cloned(),
                LibraryRef::Named(_) => None,
            })
            .unique()
            .filter_map(|path| path.relpath(&base, "").ok())
            .collect();

        let mut lines = vec![format!("Class-Path: {}", dirs.join(" "))];
        if let Some(main) = options.entry_point() {
            lines.push(format!("Main-Class: {}", main));
        }

        JarManifest {
            path: BuildPath::build(format!("{}-manifest.txt", name)),
            lines,
        }
    }

    /// Rewrite a jar input for the command line: class lists are passed
    /// by reference so the jar picks up their contents.
    pub fn transform_input(&self, input: &FileArtifact) -> Value {
        match input {
            FileArtifact::ClassList(list) => {
                Value::raw("@").concat(Value::path(list.object.path.clone()))
            }
            other => Value::path(other.path().clone()),
        }
    }
}

impl Linker for JarMaker {
    fn role(&self) -> &CommandRole {
        &self.role
    }

    fn flavor(&self) -> &'static str {
        "jar"
    }

    fn lang(&self) -> Language {
        self.lang
    }

    fn can_link(&self, format: ObjectFormat, _langs: &[Language]) -> bool {
        format == ObjectFormat::Jvm
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
                // Libraries and the entry point live in the manifest.
                BuildOption::Lib(_) | BuildOption::EntryPoint(_) => {}
                BuildOption::Raw(s) => flags.push(Value::raw(s.clone())),
                other => {
                    return Err(ToolchainError::UnknownOption {
                        option: other.kind(),
                        role: "jar",
                    })
                }
            }
        }
        Ok(flags)
    }

    fn lib_flags(
        &self,
        options: &OptionList,
        _mode: FlagsMode,
    ) -> Result<Vec<Value>, ToolchainError> {
        let mut flags = Vec::new();
        for opt in options {
            if let BuildOption::LibLiteral(value) = opt {
                flags.push(value.clone());
            }
        }
        Ok(flags)
    }

    /// `jar cfm <output> $manifest <inputs>`; the manifest path is bound
    /// as a per-edge variable.
    fn link_args(
        &self,
        inputs: &[Value],
        outputs: &[Value],
        _libs: Vec<Value>,
        flags: Vec<Value>,
    ) -> Vec<Value> {
        let mut args = vec![
            self.role.command_ref(),
            Value::raw("cfm"),
        ];
        args.extend(flags);
        if let Some(first) = outputs.first() {
            args.push(first.clone());
        }
        args.push(Value::literal("$manifest"));
        args.extend(inputs.iter().cloned());
        args
    }

    fn output_file(
        &self,
        name: &str,
        context: &LinkContext,
    ) -> Result<Vec<FileArtifact>, ToolchainError> {
        let path = BuildPath::build(format!("{}.jar", name));
        if context.entry_point.is_some() {
            Ok(vec![FileArtifact::ExecutableLibrary(
                crate::file_types::ExecutableLibrary {
                    path,
                    format: ObjectFormat::Jvm,
                    lang: self.lang,
                },
            )])
        } else {
            Ok(vec![FileArtifact::Generic(GenericLibrary {
                path,
                format: ObjectFormat::Jvm,
            })])
        }
    }
}

/// Runs produced jars.
#[derive(Debug)]
pub struct JvmRunner {
    command: Vec<String>,
    lang: Language,
}

impl JvmRunner {
    fn new(env: &Env, info: &LanguageInfo) -> Self {
        let var = info.runner_var.unwrap_or(info.compiler_var);
        let command = shell::split(&env.getvar(var, info.lang.as_str()));
        let command = if command.is_empty() {
            vec![info.lang.as_str().to_string()]
        } else {
            command
        };
        JvmRunner {
            command,
            lang: info.lang,
        }
    }

    /// The argument vector for running a file.
    pub fn run_args(&self, file: &BuildPath, jar: bool) -> Vec<Value> {
        let mut args: Vec<Value> = self.command.iter().map(|c| Value::raw(c.clone())).collect();
        // scala runs jars without a flag.
        if jar && self.lang != Language::Scala {
            args.push(Value::raw("-jar"));
        }
        args.push(Value::path(file.clone()));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Backend;
    use crate::file_types::Library;
    use crate::languages::Languages;
    use crate::platform::{HostPlatform, TargetPlatform};
    use indexmap::IndexMap;

    const ORACLE_BANNER: &str =
        "java version \"1.7.0_55\"\nJava(TM) SE Runtime Environment (build 1.7.0_55-b13)";
    const OPENJDK_BANNER: &str = "openjdk version \"1.8.0_151\"\n\
         OpenJDK Runtime Environment (build 1.8.0_151-8u151-b12-0ubuntu0.16.04.2-b12)";
    const SCALA_BANNER: &str =
        "Scala code runner version 2.11.6 -- Copyright 2002-2013, LAMP/EPFL";

    fn env() -> Env {
        Env::new(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::new(),
        )
    }

    fn java_builder(banner: &str) -> JvmBuilder {
        let langs = Languages::defaults();
        JvmBuilder::new(
            &env(),
            langs.get(Language::Java),
            vec!["javac".to_string()],
            vec!["jar".to_string()],
            banner,
        )
    }

    fn jar_lib(path: &str) -> BuildOption {
        BuildOption::Lib(LibraryRef::File(Library::Generic(GenericLibrary {
            path: BuildPath::build(path),
            format: ObjectFormat::Jvm,
        })))
    }

    fn rendered(values: &[Value]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_properties() {
        let jvm = java_builder("version");
        assert_eq!(jvm.flavor(), "jvm");
        assert_eq!(jvm.family(), "jvm");
        assert!(!jvm.can_dual_link());
        assert!(!jvm.compiler().accepts_pch());
        assert!(jvm.compiler().needs_libs());
        assert!(jvm.pch_compiler().is_none());
        assert_eq!(
            jvm.linker(LinkMode::Executable).unwrap().flavor(),
            "jar"
        );
        assert_eq!(
            jvm.linker(LinkMode::SharedLibrary).unwrap().flavor(),
            "jar"
        );
    }

    #[test]
    fn test_brand_oracle() {
        let jvm = java_builder(ORACLE_BANNER);
        assert_eq!(jvm.brand, JvmBrand::Oracle);
        assert_eq!(jvm.version, Some(Version::new(1, 7, 0)));
    }

    #[test]
    fn test_brand_openjdk() {
        let jvm = java_builder(OPENJDK_BANNER);
        assert_eq!(jvm.brand, JvmBrand::OpenJdk);
        assert_eq!(jvm.version, Some(Version::new(1, 8, 0)));
    }

    #[test]
    fn test_brand_scala() {
        let langs = Languages::defaults();
        let jvm = JvmBuilder::new(
            &env(),
            langs.get(Language::Scala),
            vec!["scalac".to_string()],
            vec!["jar".to_string()],
            SCALA_BANNER,
        );
        assert_eq!(jvm.brand, JvmBrand::Epfl);
        assert_eq!(jvm.version, Some(Version::new(2, 11, 6)));
    }

    #[test]
    fn test_brand_unknown() {
        let jvm = java_builder("unknown");
        assert_eq!(jvm.brand, JvmBrand::Unknown);
        assert_eq!(jvm.version, None);
    }

    #[test]
    fn test_static_link_unsupported() {
        let jvm = java_builder(ORACLE_BANNER);
        assert!(matches!(
            jvm.linker(LinkMode::StaticLibrary),
            Err(ToolchainError::StaticLinkUnsupported(brand)) if brand == "oracle"
        ));
        assert!(matches!(
            jvm.linker(LinkMode::Raw),
            Err(ToolchainError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_class_path_deduped() {
        let jvm = java_builder(ORACLE_BANNER);
        let options: OptionList = [
            jar_lib("libs/a.jar"),
            jar_lib("libs/b.jar"),
            jar_lib("libs/a.jar"),
        ]
        .into_iter()
        .collect();
        let flags = jvm.compiler().flags(&options).unwrap();
        assert_eq!(rendered(&flags), vec!["-cp", "libs/a.jar:libs/b.jar"]);
    }

    #[test]
    fn test_no_class_path_without_libs() {
        let jvm = java_builder(ORACLE_BANNER);
        let flags = jvm.compiler().flags(&OptionList::new()).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn test_compiler_rejects_native_options() {
        let jvm = java_builder(ORACLE_BANNER);
        let options: OptionList = [BuildOption::Pic].into_iter().collect();
        assert!(matches!(
            jvm.compiler().flags(&options),
            Err(ToolchainError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_compile_args_wrap_jvmoutput() {
        let jvm = java_builder(ORACLE_BANNER);
        let args = jvm.compiler().compile_args(
            Value::raw("Main.java"),
            Value::raw("Main.classlist"),
            None,
            Vec::new(),
        );
        assert_eq!(
            rendered(&args),
            vec!["gantry-jvmoutput", "-o", "Main.classlist", "$javac", "-verbose", "-d", ".",
                 "Main.java"]
        );
    }

    #[test]
    fn test_classlist_output() {
        let jvm = java_builder(ORACLE_BANNER);
        let artifact = jvm.compiler().output_file("com/example/Main");
        assert_eq!(artifact.path().relative(), "com/example/Main.classlist");
    }

    #[test]
    fn test_manifest_lines() {
        let jvm = java_builder(ORACLE_BANNER);
        let options: OptionList = [
            jar_lib("libs/dep.jar"),
            BuildOption::EntryPoint("com.example.Main".to_string()),
        ]
        .into_iter()
        .collect();
        let manifest = jvm.jar.pre_build("out/app", &options);
        assert_eq!(manifest.path.relative(), "out/app-manifest.txt");
        assert_eq!(
            manifest.lines,
            vec!["Class-Path: ../libs/dep.jar", "Main-Class: com.example.Main"]
        );
    }

    #[test]
    fn test_jar_args() {
        let jvm = java_builder(ORACLE_BANNER);
        let jar = jvm.linker(LinkMode::Executable).unwrap();
        let args = jar.link_args(
            &[Value::raw("@Main.classlist")],
            &[Value::raw("app.jar")],
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(
            rendered(&args),
            vec!["$jar", "cfm", "app.jar", "$manifest", "@Main.classlist"]
        );
    }

    #[test]
    fn test_jar_output_kinds() {
        let jvm = java_builder(ORACLE_BANNER);
        let jar = jvm.linker(LinkMode::Executable).unwrap();

        let plain = jar
            .output_file("app", &LinkContext::default())
            .unwrap()
            .remove(0);
        assert!(matches!(plain, FileArtifact::Generic(_)));
        assert_eq!(plain.path().relative(), "app.jar");

        let context = LinkContext {
            entry_point: Some("com.example.Main".to_string()),
            ..LinkContext::default()
        };
        let exe = jar.output_file("app", &context).unwrap().remove(0);
        assert!(matches!(exe, FileArtifact::ExecutableLibrary(_)));
    }

    #[test]
    fn test_transform_input() {
        let jvm = java_builder(ORACLE_BANNER);
        let classlist = jvm.compiler().output_file("Main");
        assert_eq!(
            jvm.jar.transform_input(&classlist).to_string(),
            "@Main.classlist"
        );
    }

    #[test]
    fn test_runner_args() {
        let jvm = java_builder(ORACLE_BANNER);
        let args = jvm
            .runner()
            .run_args(&BuildPath::build("app.jar"), true);
        assert_eq!(rendered(&args), vec!["java", "-jar", "app.jar"]);

        let langs = Languages::defaults();
        let scala = JvmBuilder::new(
            &env(),
            langs.get(Language::Scala),
            vec!["scalac".to_string()],
            vec!["jar".to_string()],
            SCALA_BANNER,
        );
        let args = scala
            .runner()
            .run_args(&BuildPath::build("app.jar"), true);
        assert_eq!(rendered(&args), vec!["scala", "app.jar"]);
    }
}
