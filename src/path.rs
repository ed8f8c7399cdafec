//! Rooted build paths.
//!
//! Every path handled by the generator is tagged with the root it is
//! relative to: the source directory, the build directory, an install
//! directory, or the filesystem root. Paths stay symbolic until they are
//! realized against a [`RootVars`] mapping, which substitutes a build-file
//! variable reference for each root (the build directory maps to an empty
//! prefix, since generated files are resolved relative to it).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use crate::safe_str::Value;

/// Installation directory kinds, mirroring autotools-style install roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallRoot {
    Prefix,
    ExecPrefix,
    BinDir,
    LibDir,
    IncludeDir,
}

impl InstallRoot {
    /// All install roots, in declaration order.
    pub fn all() -> [InstallRoot; 5] {
        [
            InstallRoot::Prefix,
            InstallRoot::ExecPrefix,
            InstallRoot::BinDir,
            InstallRoot::LibDir,
            InstallRoot::IncludeDir,
        ]
    }

    /// The conventional variable name for this root.
    pub fn name(&self) -> &'static str {
        match self {
            InstallRoot::Prefix => "prefix",
            InstallRoot::ExecPrefix => "exec_prefix",
            InstallRoot::BinDir => "bindir",
            InstallRoot::LibDir => "libdir",
            InstallRoot::IncludeDir => "includedir",
        }
    }
}

/// The root a [`BuildPath`] is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// An absolute filesystem path.
    Absolute,
    /// Relative to the source directory.
    SrcDir,
    /// Relative to the build directory.
    BuildDir,
    /// Relative to an install directory.
    Install(InstallRoot),
}

/// Error produced by path operations.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("cannot relativize `{path}` against a different root")]
    DifferentRoots { path: String },
}

/// A path tagged with the root it is relative to.
///
/// The relative component always uses `/` separators and never contains
/// `.` or empty segments; `..` segments are collapsed where possible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildPath {
    root: Root,
    path: String,
}

impl BuildPath {
    /// Create a path under the given root, normalizing the relative part.
    pub fn new(root: Root, path: impl AsRef<str>) -> Self {
        BuildPath {
            root,
            path: normalize(path.as_ref()),
        }
    }

    /// A path relative to the source directory.
    pub fn src(path: impl AsRef<str>) -> Self {
        BuildPath::new(Root::SrcDir, path)
    }

    /// A path relative to the build directory.
    pub fn build(path: impl AsRef<str>) -> Self {
        BuildPath::new(Root::BuildDir, path)
    }

    /// An absolute filesystem path.
    pub fn absolute(path: impl AsRef<str>) -> Self {
        BuildPath::new(Root::Absolute, path)
    }

    /// A path under an install root.
    pub fn install(root: InstallRoot, path: impl AsRef<str>) -> Self {
        BuildPath::new(Root::Install(root), path)
    }

    /// The root this path is relative to.
    pub fn root(&self) -> Root {
        self.root
    }

    /// The normalized relative component.
    pub fn relative(&self) -> &str {
        &self.path
    }

    /// The path of the containing directory, under the same root.
    pub fn parent(&self) -> BuildPath {
        match self.path.rfind('/') {
            Some(idx) => BuildPath {
                root: self.root,
                path: self.path[..idx].to_string(),
            },
            None => BuildPath {
                root: self.root,
                path: String::new(),
            },
        }
    }

    /// The final path component.
    pub fn basename(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[idx + 1..],
            None => &self.path,
        }
    }

    /// Append a component, keeping the same root.
    pub fn append(&self, component: impl AsRef<str>) -> BuildPath {
        if self.path.is_empty() {
            BuildPath::new(self.root, component)
        } else {
            BuildPath::new(self.root, format!("{}/{}", self.path, component.as_ref()))
        }
    }

    /// The path with the basename's extension removed.
    pub fn strip_ext(&self) -> BuildPath {
        let base = self.basename();
        match base.rfind('.') {
            Some(idx) if idx > 0 => {
                let cut = self.path.len() - (base.len() - idx);
                BuildPath {
                    root: self.root,
                    path: self.path[..cut].to_string(),
                }
            }
            _ => self.clone(),
        }
    }

    /// Compute this path relative to `base`, prefixed with `prefix`.
    ///
    /// `prefix` is typically a runtime token such as `$ORIGIN` or
    /// `@loader_path`. Absolute paths are returned unchanged (the prefix
    /// does not apply); other roots must match `base`'s root.
    pub fn relpath(&self, base: &BuildPath, prefix: &str) -> Result<String, PathError> {
        if self.root == Root::Absolute {
            return Ok(self.to_string());
        }
        if self.root != base.root {
            return Err(PathError::DifferentRoots {
                path: self.to_string(),
            });
        }
        let rel = pathdiff::diff_paths(Path::new(&self.path), Path::new(&base.path))
            .unwrap_or_else(|| PathBuf::from(&self.path));
        let rel = rel.to_string_lossy();
        if rel.is_empty() || rel == "." {
            Ok(if prefix.is_empty() {
                ".".to_string()
            } else {
                prefix.to_string()
            })
        } else if prefix.is_empty() {
            Ok(rel.into_owned())
        } else {
            Ok(format!("{}/{}", prefix, rel))
        }
    }

    /// Realize this path into a value against the given root variables.
    ///
    /// The `shell` flag is part of the realization contract for platforms
    /// whose localized paths differ in shell context; POSIX paths localize
    /// identically either way.
    pub fn realize(&self, vars: &RootVars, _shell: bool) -> Value {
        if self.root == Root::Absolute {
            return Value::raw(format!("/{}", self.path));
        }
        match vars.prefix(self.root) {
            None => {
                // Build-dir root: paths are already relative to the output.
                if self.path.is_empty() {
                    Value::raw(".")
                } else {
                    Value::raw(self.path.clone())
                }
            }
            Some(prefix) => {
                if self.path.is_empty() {
                    prefix.clone()
                } else {
                    prefix.clone().concat(Value::raw(format!("/{}", self.path)))
                }
            }
        }
    }

    /// The host-filesystem location of an absolute path.
    pub fn as_host_path(&self) -> Option<PathBuf> {
        match self.root {
            Root::Absolute => Some(PathBuf::from(format!("/{}", self.path))),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.root {
            Root::Absolute => write!(f, "/{}", self.path),
            _ => write!(f, "{}", self.path),
        }
    }
}

/// Mapping from path roots to the value substituted for each at
/// realization time.
///
/// Constructed per graph writer so independent writers can coexist; the
/// build-dir root always maps to an empty prefix.
#[derive(Debug, Clone)]
pub struct RootVars {
    srcdir: Value,
    install: IndexMap<InstallRoot, Value>,
}

impl RootVars {
    /// Create the conventional mapping: `$srcdir` for the source root and
    /// one variable per install root, named after the root.
    pub fn new(srcdir: Value) -> Self {
        let install = InstallRoot::all()
            .into_iter()
            .map(|i| (i, Value::literal(format!("${}", i.name()))))
            .collect();
        RootVars { srcdir, install }
    }

    /// Override the value substituted for one install root.
    pub fn set_install(&mut self, root: InstallRoot, value: Value) {
        self.install.insert(root, value);
    }

    /// The prefix value for a root, or `None` for an empty prefix.
    fn prefix(&self, root: Root) -> Option<&Value> {
        match root {
            Root::BuildDir | Root::Absolute => None,
            Root::SrcDir => Some(&self.srcdir),
            // The constructor populates every install root.
            Root::Install(i) => self.install.get(&i),
        }
    }
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&"..")) || parts.is_empty() {
                    parts.push("..");
                } else {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
