//! File artifacts flowing between build steps.
//!
//! Artifacts are created by a compiler or linker's `output_file` and
//! consumed when later build edges are declared; nothing mutates them
//! after creation. Libraries carry enough structure for link-time
//! decisions: naming convention, object format, source language, and
//! (for shared libraries) the runtime dependencies walked for rpath-link
//! collection.

use std::sync::Arc;

use crate::languages::Language;
use crate::path::BuildPath;
use crate::platform::ObjectFormat;

/// A lone header file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub path: BuildPath,
}

/// A directory of headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDirectory {
    pub path: BuildPath,
    /// Whether the directory should be treated as a system include dir.
    pub system: bool,
}

/// A compiled object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    pub path: BuildPath,
    pub format: ObjectFormat,
    pub lang: Language,
}

/// A list of compiled class files, consumed via `@file` expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassList {
    pub object: ObjectFile,
}

/// A compiler-cached header parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompiledHeader {
    pub path: BuildPath,
    pub lang: Language,
}

/// A static archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticLibrary {
    pub path: BuildPath,
    pub format: ObjectFormat,
    pub lang: Language,
}

/// A shared library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLibrary {
    pub path: BuildPath,
    pub format: ObjectFormat,
    /// Shared libraries this one needs at load time.
    pub runtime_deps: Vec<Arc<SharedLibrary>>,
}

/// A shared library with version and soname variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSharedLibrary {
    /// The fully-versioned real file.
    pub path: BuildPath,
    pub format: ObjectFormat,
    /// The soname the runtime loader resolves.
    pub soname: BuildPath,
    /// The unversioned name used at link time.
    pub link: BuildPath,
    pub runtime_deps: Vec<Arc<SharedLibrary>>,
}

/// A DLL plus the import library used to link against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DllBinary {
    pub path: BuildPath,
    pub format: ObjectFormat,
    pub import_lib: BuildPath,
}

/// A library whose kind could not be classified from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericLibrary {
    pub path: BuildPath,
    pub format: ObjectFormat,
}

/// A macOS framework, referenced by name rather than path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framework {
    pub name: String,
    pub suffix: Option<String>,
}

impl Framework {
    pub fn new(name: impl Into<String>) -> Self {
        Framework {
            name: name.into(),
            suffix: None,
        }
    }

    /// The full name, including the suffix when present.
    pub fn full_name(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{},{}", self.name, suffix),
            None => self.name.clone(),
        }
    }
}

/// A linked executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub path: BuildPath,
    pub format: ObjectFormat,
    pub lang: Language,
}

/// A library that can also be executed (a jar with an entry point).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLibrary {
    pub path: BuildPath,
    pub format: ObjectFormat,
    pub lang: Language,
}

/// Anything that can appear in a link line's library position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Library {
    Static(StaticLibrary),
    Shared(SharedLibrary),
    VersionedShared(VersionedSharedLibrary),
    Dll(DllBinary),
    Generic(GenericLibrary),
    Framework(Framework),
    /// A static library whose every member must be pulled into the link.
    WholeArchive(StaticLibrary),
}

impl Library {
    /// The on-disk path, when the library has one.
    pub fn path(&self) -> Option<&BuildPath> {
        match self {
            Library::Static(l) => Some(&l.path),
            Library::Shared(l) => Some(&l.path),
            Library::VersionedShared(l) => Some(&l.path),
            Library::Dll(l) => Some(&l.import_lib),
            Library::Generic(l) => Some(&l.path),
            Library::Framework(_) => None,
            Library::WholeArchive(l) => Some(&l.path),
        }
    }

    /// The file loaded at run time, if linking this pulls one in.
    pub fn runtime_file(&self) -> Option<&BuildPath> {
        match self {
            Library::Shared(l) => Some(&l.path),
            Library::VersionedShared(l) => Some(&l.path),
            Library::Dll(l) => Some(&l.path),
            _ => None,
        }
    }

    /// Runtime dependencies of the library itself.
    pub fn runtime_deps(&self) -> &[Arc<SharedLibrary>] {
        match self {
            Library::Shared(l) => &l.runtime_deps,
            Library::VersionedShared(l) => &l.runtime_deps,
            _ => &[],
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Library::Static(_) | Library::WholeArchive(_))
    }
}

/// Any artifact a compiler or linker can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileArtifact {
    Header(Header),
    HeaderDirectory(HeaderDirectory),
    Object(ObjectFile),
    ClassList(ClassList),
    PrecompiledHeader(PrecompiledHeader),
    Static(StaticLibrary),
    Shared(SharedLibrary),
    VersionedShared(VersionedSharedLibrary),
    Dll(DllBinary),
    Executable(Executable),
    ExecutableLibrary(ExecutableLibrary),
    Generic(GenericLibrary),
}

impl FileArtifact {
    /// The primary path of the artifact.
    pub fn path(&self) -> &BuildPath {
        match self {
            FileArtifact::Header(f) => &f.path,
            FileArtifact::HeaderDirectory(f) => &f.path,
            FileArtifact::Object(f) => &f.path,
            FileArtifact::ClassList(f) => &f.object.path,
            FileArtifact::PrecompiledHeader(f) => &f.path,
            FileArtifact::Static(f) => &f.path,
            FileArtifact::Shared(f) => &f.path,
            FileArtifact::VersionedShared(f) => &f.path,
            FileArtifact::Dll(f) => &f.path,
            FileArtifact::Executable(f) => &f.path,
            FileArtifact::ExecutableLibrary(f) => &f.path,
            FileArtifact::Generic(f) => &f.path,
        }
    }

    /// View the artifact as a linkable library, when it is one.
    pub fn as_library(&self) -> Option<Library> {
        match self {
            FileArtifact::Static(f) => Some(Library::Static(f.clone())),
            FileArtifact::Shared(f) => Some(Library::Shared(f.clone())),
            FileArtifact::VersionedShared(f) => Some(Library::VersionedShared(f.clone())),
            FileArtifact::Dll(f) => Some(Library::Dll(f.clone())),
            FileArtifact::Generic(f) => Some(Library::Generic(f.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_full_name() {
        assert_eq!(Framework::new("OpenGL").full_name(), "OpenGL");
        let f = Framework {
            name: "OpenGL".to_string(),
            suffix: Some("suffix".to_string()),
        };
        assert_eq!(f.full_name(), "OpenGL,suffix");
    }

    #[test]
    fn test_runtime_file() {
        let shared = Library::Shared(SharedLibrary {
            path: BuildPath::build("libfoo.so"),
            format: ObjectFormat::Elf,
            runtime_deps: Vec::new(),
        });
        assert!(shared.runtime_file().is_some());

        let static_ = Library::Static(StaticLibrary {
            path: BuildPath::build("libfoo.a"),
            format: ObjectFormat::Elf,
            lang: Language::C,
        });
        assert!(static_.runtime_file().is_none());
        assert!(static_.is_static());
    }

    #[test]
    fn test_dll_link_path_is_import_lib() {
        let dll = Library::Dll(DllBinary {
            path: BuildPath::build("libfoo.dll"),
            format: ObjectFormat::Coff,
            import_lib: BuildPath::build("libfoo.dll.a"),
        });
        assert_eq!(dll.path().unwrap().basename(), "libfoo.dll.a");
        assert_eq!(dll.runtime_file().unwrap().basename(), "libfoo.dll");
    }
}
