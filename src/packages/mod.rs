//! Locating packages on the host system.
//!
//! Resolution is a configuration-time concern: the resolver turns a
//! package name into the include/link options a target needs, preferring
//! the external pkg-config metadata and falling back to probing the
//! toolchain's own search directories. Failures surface as
//! [`PackageResolutionError`] values for the front-end to report; they
//! are never retried.

use std::path::Path;

use itertools::Itertools;
use semver::{Version, VersionReq};
use thiserror::Error;
use tracing::debug;

use crate::env::Env;
use crate::file_types::{
    Framework, GenericLibrary, HeaderDirectory, Library, SharedLibrary, StaticLibrary,
};
use crate::languages::Language;
use crate::options::{BuildOption, LibraryRef, OptionList};
use crate::path::BuildPath;
use crate::platform::{ObjectFormat, PackageMapEntry, PlatformName};
use crate::toolchain::cc::{CcCompiler, CcLinker};
use crate::toolchain::ld::LdLinker;
use crate::util::process::{Accept, OutputMode};

pub mod pkg_config;

/// Error raised when a package, header, or library cannot be located.
#[derive(Debug, Error)]
pub enum PackageResolutionError {
    #[error("unable to find header `{0}`")]
    HeaderNotFound(String),

    #[error("unable to find library `{0}`")]
    LibraryNotFound(String),

    #[error("unable to find package `{0}`")]
    PackageNotFound(String),

    #[error("package `{name}` version {found} does not satisfy `{required}`")]
    VersionMismatch {
        name: String,
        found: String,
        required: String,
    },
}

/// Which library kinds a resolution may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Any,
    Shared,
    Static,
}

impl PackageKind {
    fn allows_shared(self) -> bool {
        matches!(self, PackageKind::Any | PackageKind::Shared)
    }

    fn allows_static(self) -> bool {
        matches!(self, PackageKind::Any | PackageKind::Static)
    }
}

/// A resolved package: the options targets consume.
#[derive(Debug, Clone)]
pub struct CommonPackage {
    pub name: String,
    pub format: ObjectFormat,
    pub version: Option<Version>,
    pub compile_options: OptionList,
    pub link_options: OptionList,
}

/// Locates headers and libraries for the native family.
#[derive(Debug)]
pub struct CcPackageResolver {
    env: Env,
    format: ObjectFormat,
    lang: Language,
    /// Existing directories searched for headers.
    pub include_dirs: Vec<String>,
    /// Existing directories searched for libraries.
    pub lib_dirs: Vec<String>,
}

impl CcPackageResolver {
    /// Build the search lists from the toolchain's own discovery plus
    /// the host platform defaults.
    pub fn new(
        env: &Env,
        format: ObjectFormat,
        lang: Language,
        compiler: &CcCompiler,
        linker: &CcLinker,
        raw_linker: Option<&LdLinker>,
    ) -> Self {
        let include_dirs = compiler
            .search_dirs()
            .into_iter()
            .chain(env.host.include_dirs.iter().cloned())
            .unique()
            .filter(|dir| Path::new(dir).exists())
            .collect();

        let cc_lib_dirs = linker.search_dirs(false).unwrap_or_default();

        let ld_lib_dirs = (|| -> Option<Vec<String>> {
            let sysroot = linker.sysroot(false).ok()?;
            match raw_linker?.search_dirs(&sysroot, true) {
                Ok(dirs) => Some(dirs),
                Err(err) => {
                    debug!("raw linker search-dir probe failed: {err:#}");
                    None
                }
            }
        })()
        .unwrap_or_else(|| env.host.lib_dirs.clone());

        let lib_dirs = cc_lib_dirs
            .into_iter()
            .chain(ld_lib_dirs)
            .chain(env.host.lib_dirs.iter().cloned())
            .unique()
            .filter(|dir| Path::new(dir).exists())
            .collect();

        CcPackageResolver {
            env: env.clone(),
            format,
            lang,
            include_dirs,
            lib_dirs,
        }
    }

    /// Find the directory providing a header, first match wins.
    pub fn header(
        &self,
        name: &str,
        search_dirs: Option<&[String]>,
    ) -> Result<HeaderDirectory, PackageResolutionError> {
        let dirs = search_dirs.unwrap_or(&self.include_dirs);
        for base in dirs {
            if Path::new(base).join(name).exists() {
                return Ok(HeaderDirectory {
                    path: BuildPath::absolute(base),
                    system: true,
                });
            }
        }
        Err(PackageResolutionError::HeaderNotFound(name.to_string()))
    }

    /// Find a library by conventional name, first match wins.
    pub fn library(
        &self,
        name: &str,
        kind: PackageKind,
        search_dirs: Option<&[String]>,
    ) -> Result<Library, PackageResolutionError> {
        let dirs = search_dirs.unwrap_or(&self.lib_dirs);
        let target = &self.env.target;

        enum Candidate {
            Shared,
            ImportLib,
            Static,
            Generic,
        }

        let mut candidates = Vec::new();
        if kind.allows_shared() {
            let base = format!("lib{}{}", name, target.shared_library_ext);
            if target.has_import_library {
                candidates.push((format!("{}.a", base), Candidate::ImportLib));
            } else {
                candidates.push((base, Candidate::Shared));
            }
        }
        if kind.allows_static() {
            candidates.push((format!("lib{}.a", name), Candidate::Static));
        }
        // On Windows a bare .lib could be either kind; classify it
        // generically and let the linker sort it out.
        if target.name == PlatformName::Windows {
            candidates.push((format!("{}.lib", name), Candidate::Generic));
        }

        for base in dirs {
            for (libname, shape) in &candidates {
                let full = Path::new(base).join(libname);
                if !full.exists() {
                    continue;
                }
                let path = BuildPath::absolute(&full.to_string_lossy());
                return Ok(match shape {
                    Candidate::Shared => Library::Shared(SharedLibrary {
                        path,
                        format: self.format,
                        runtime_deps: Vec::new(),
                    }),
                    Candidate::ImportLib | Candidate::Generic => {
                        Library::Generic(GenericLibrary {
                            path,
                            format: self.format,
                        })
                    }
                    Candidate::Static => Library::Static(StaticLibrary {
                        path,
                        format: self.format,
                        lang: self.lang,
                    }),
                });
            }
        }
        Err(PackageResolutionError::LibraryNotFound(name.to_string()))
    }

    /// Resolve a package: pkg-config first, filesystem probing second.
    ///
    /// `lib_names` overrides the libraries the package is expected to
    /// provide; when absent, the target platform's package map decides.
    pub fn resolve(
        &self,
        name: &str,
        version: Option<&VersionReq>,
        kind: PackageKind,
        headers: &[String],
        lib_names: Option<&[String]>,
    ) -> Result<CommonPackage, PackageResolutionError> {
        match pkg_config::resolve(&self.env, name, self.format, version, kind) {
            Ok(package) => return Ok(package),
            Err(err) => debug!("pkg-config resolution of `{name}` failed: {err}"),
        }

        let mut compile_options = OptionList::new();
        let mut link_options = OptionList::new();

        for header in headers {
            compile_options.push(BuildOption::IncludeDir(self.header(header, None)?));
        }

        let entries: Vec<PackageMapEntry> = match lib_names {
            Some(names) => names
                .iter()
                .map(|n| PackageMapEntry::Library(n.clone()))
                .collect(),
            None => vec![self.env.target.transform_package(name)],
        };

        for entry in entries {
            match entry {
                PackageMapEntry::Framework(fw) => {
                    link_options.push(BuildOption::Lib(LibraryRef::File(Library::Framework(
                        Framework::new(fw),
                    ))));
                }
                PackageMapEntry::Library(lib_name) if lib_name == "pthread" => {
                    // Thread support is a flag on both sides, not a -l.
                    compile_options.push(BuildOption::Pthread);
                    link_options.push(BuildOption::Pthread);
                }
                PackageMapEntry::Library(lib_name) => {
                    link_options.push(BuildOption::Lib(LibraryRef::File(
                        self.library(&lib_name, kind, None)?,
                    )));
                }
            }
        }

        Ok(CommonPackage {
            name: name.to_string(),
            format: self.format,
            version: None,
            compile_options,
            link_options,
        })
    }
}

/// Locates jars for the JVM family.
#[derive(Debug)]
pub struct JvmPackageResolver {
    lang: Language,
    /// Directories scraped from the runner's settings dump.
    pub search_dirs: Vec<String>,
}

impl JvmPackageResolver {
    /// Scrape jar search directories from the runner.
    ///
    /// `java -XshowSettings:properties -version` dumps its properties to
    /// stderr; `java.ext.dirs` and `java.class.path` list the locations
    /// worth probing, with continuation entries on indented lines. A
    /// failed probe leaves the search list empty.
    pub fn new(env: &Env, lang: Language, runner_command: &[String]) -> Self {
        let mut argv = runner_command.to_vec();
        argv.push("-XshowSettings:properties".to_string());
        argv.push("-version".to_string());

        let output = match env.execute(&argv, OutputMode::Pipe, OutputMode::Pipe, Accept::Any) {
            Ok(output) => output,
            Err(err) => {
                debug!("jvm settings probe failed: {err:#}");
                return JvmPackageResolver {
                    lang,
                    search_dirs: Vec::new(),
                };
            }
        };

        let mut search_dirs = Vec::new();
        let mut continuing = false;
        for line in output.stderr.lines().chain(output.stdout.lines()) {
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                continuing = key == "java.ext.dirs" || key == "java.class.path";
                if continuing {
                    search_dirs.extend(
                        value
                            .trim()
                            .split(':')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
            } else if continuing {
                let entry = line.trim();
                if entry.is_empty() {
                    continuing = false;
                } else {
                    search_dirs.push(entry.to_string());
                }
            }
        }

        JvmPackageResolver {
            lang,
            search_dirs: search_dirs.into_iter().unique().collect(),
        }
    }

    /// Find `<name>.jar` in the scraped search directories.
    pub fn resolve(&self, name: &str) -> Result<CommonPackage, PackageResolutionError> {
        for base in &self.search_dirs {
            let full = Path::new(base).join(format!("{}.jar", name));
            if !full.exists() {
                continue;
            }
            let jar = Library::Generic(GenericLibrary {
                path: BuildPath::absolute(&full.to_string_lossy()),
                format: ObjectFormat::Jvm,
            });
            let mut options = OptionList::new();
            options.push(BuildOption::Lib(LibraryRef::File(jar)));
            return Ok(CommonPackage {
                name: name.to_string(),
                format: ObjectFormat::Jvm,
                version: None,
                compile_options: options.clone(),
                link_options: options,
            });
        }
        Err(PackageResolutionError::PackageNotFound(name.to_string()))
    }

    /// The language this resolver serves.
    pub fn lang(&self) -> Language {
        self.lang
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Backend;
    use crate::platform::{HostPlatform, TargetPlatform};
    use crate::test_support::ScriptedRunner;
    use indexmap::IndexMap;
    use std::fs;
    use std::sync::Arc;

    fn env() -> Env {
        Env::with_runner(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::new(),
            Arc::new(ScriptedRunner::new()),
        )
    }

    fn resolver_with_dirs(include: Vec<String>, lib: Vec<String>) -> CcPackageResolver {
        CcPackageResolver {
            env: env(),
            format: ObjectFormat::Elf,
            lang: Language::C,
            include_dirs: include,
            lib_dirs: lib,
        }
    }

    #[test]
    fn test_header_probe() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zlib.h"), "").unwrap();
        let base = dir.path().to_string_lossy().into_owned();
        let resolver = resolver_with_dirs(vec![base.clone()], Vec::new());

        let found = resolver.header("zlib.h", None).unwrap();
        assert!(found.system);
        assert_eq!(found.path, BuildPath::absolute(&base));

        assert!(matches!(
            resolver.header("missing.h", None),
            Err(PackageResolutionError::HeaderNotFound(_))
        ));
    }

    #[test]
    fn test_library_probe_prefers_shared() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libz.so"), "").unwrap();
        fs::write(dir.path().join("libz.a"), "").unwrap();
        let base = dir.path().to_string_lossy().into_owned();
        let resolver = resolver_with_dirs(Vec::new(), vec![base]);

        let found = resolver.library("z", PackageKind::Any, None).unwrap();
        assert!(matches!(found, Library::Shared(_)));

        let found = resolver.library("z", PackageKind::Static, None).unwrap();
        assert!(matches!(found, Library::Static(_)));
    }

    #[test]
    fn test_library_probe_static_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libfoo.a"), "").unwrap();
        let base = dir.path().to_string_lossy().into_owned();
        let resolver = resolver_with_dirs(Vec::new(), vec![base]);

        let found = resolver.library("foo", PackageKind::Any, None).unwrap();
        assert!(matches!(found, Library::Static(_)));
        assert!(matches!(
            resolver.library("foo", PackageKind::Shared, None),
            Err(PackageResolutionError::LibraryNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_pthread_special_case() {
        let resolver = resolver_with_dirs(Vec::new(), Vec::new());
        let names = vec!["pthread".to_string()];
        let pkg = resolver
            .resolve("pthread", None, PackageKind::Any, &[], Some(&names))
            .unwrap();
        let compile: Vec<_> = pkg.compile_options.iter().cloned().collect();
        let link: Vec<_> = pkg.link_options.iter().cloned().collect();
        assert_eq!(compile, vec![BuildOption::Pthread]);
        assert_eq!(link, vec![BuildOption::Pthread]);
    }

    #[test]
    fn test_resolve_fallback_probes_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zlib.h"), "").unwrap();
        fs::write(dir.path().join("libz.so"), "").unwrap();
        let base = dir.path().to_string_lossy().into_owned();
        let resolver = resolver_with_dirs(vec![base.clone()], vec![base]);

        // The platform package map turns `zlib` into `-lz`.
        let pkg = resolver
            .resolve(
                "zlib",
                None,
                PackageKind::Any,
                &["zlib.h".to_string()],
                None,
            )
            .unwrap();
        assert_eq!(pkg.compile_options.iter().count(), 1);
        let link: Vec<_> = pkg.link_options.iter().cloned().collect();
        assert!(matches!(
            link.as_slice(),
            [BuildOption::Lib(LibraryRef::File(Library::Shared(_)))]
        ));
    }

    #[test]
    fn test_resolve_missing_package() {
        let resolver = resolver_with_dirs(Vec::new(), Vec::new());
        assert!(resolver
            .resolve("nonexistent", None, PackageKind::Any, &[], None)
            .is_err());
    }

    #[test]
    fn test_jvm_settings_scrape() {
        let stderr = "Property settings:\n\
                      \x20   java.class.path = /opt/jars\n\
                      \x20   java.ext.dirs = /usr/java/ext\n\
                      \x20       /usr/lib/jvm/ext\n\
                      \x20   java.home = /usr/lib/jvm\n\
                      openjdk version \"1.8.0\"\n";
        let runner = ScriptedRunner::new().on("-version", "", stderr);
        let env = Env::with_runner(
            HostPlatform::posix(),
            TargetPlatform::posix(),
            Backend::Ninja,
            IndexMap::new(),
            Arc::new(runner),
        );
        let resolver = JvmPackageResolver::new(&env, Language::Java, &["java".to_string()]);
        assert_eq!(
            resolver.search_dirs,
            vec!["/opt/jars", "/usr/java/ext", "/usr/lib/jvm/ext"]
        );
    }

    #[test]
    fn test_jvm_probe_failure_degrades() {
        let resolver =
            JvmPackageResolver::new(&env(), Language::Java, &["java".to_string()]);
        assert!(resolver.search_dirs.is_empty());
        assert!(matches!(
            resolver.resolve("gson"),
            Err(PackageResolutionError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_jvm_resolve_finds_jar() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gson.jar"), "").unwrap();
        let resolver = JvmPackageResolver {
            lang: Language::Java,
            search_dirs: vec![dir.path().to_string_lossy().into_owned()],
        };
        let pkg = resolver.resolve("gson").unwrap();
        assert_eq!(pkg.format, ObjectFormat::Jvm);
        assert_eq!(pkg.compile_options.iter().count(), 1);
    }
}
