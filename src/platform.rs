//! Host and target platform descriptions.
//!
//! Toolchain builders and package resolvers never consult `cfg!` directly;
//! everything platform-specific (object format, library naming, default
//! search directories, capability flags) comes from these value types so a
//! single process can configure for any platform, which is also what makes
//! the translators testable.

use indexmap::IndexMap;

use crate::path::{BuildPath, InstallRoot};

/// Binary object format of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectFormat {
    Elf,
    MachO,
    Coff,
    Jvm,
}

impl ObjectFormat {
    /// The format name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectFormat::Elf => "elf",
            ObjectFormat::MachO => "mach-o",
            ObjectFormat::Coff => "coff",
            ObjectFormat::Jvm => "jvm",
        }
    }
}

/// The operating-system flavor of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformName {
    Linux,
    Darwin,
    Windows,
}

/// How a package name maps to a linkable on this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageMapEntry {
    /// Link a convention-named library.
    Library(String),
    /// Link a framework (Darwin only).
    Framework(String),
}

/// Properties of the machine the build runs on.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    pub name: PlatformName,
    /// Standard system include directories.
    pub include_dirs: Vec<String>,
    /// Standard system library directories.
    pub lib_dirs: Vec<String>,
}

impl HostPlatform {
    /// A POSIX host (Linux and similar).
    pub fn posix() -> Self {
        HostPlatform {
            name: PlatformName::Linux,
            include_dirs: vec!["/usr/local/include".into(), "/usr/include".into()],
            lib_dirs: vec!["/usr/local/lib".into(), "/lib".into(), "/usr/lib".into()],
        }
    }

    /// A Darwin host.
    pub fn darwin() -> Self {
        HostPlatform {
            name: PlatformName::Darwin,
            ..HostPlatform::posix()
        }
    }
}

/// Properties of the machine the build output runs on.
#[derive(Debug, Clone)]
pub struct TargetPlatform {
    pub name: PlatformName,
    pub object_format: ObjectFormat,
    pub executable_ext: &'static str,
    pub shared_library_ext: &'static str,
    pub has_import_library: bool,
    pub has_versioned_library: bool,
    pub has_frameworks: bool,
    package_map: IndexMap<&'static str, PackageMapEntry>,
    install_dirs: IndexMap<InstallRoot, BuildPath>,
}

impl TargetPlatform {
    /// A generic POSIX/ELF target.
    pub fn posix() -> Self {
        let package_map = IndexMap::from([
            ("gl", PackageMapEntry::Library("GL".into())),
            ("glu", PackageMapEntry::Library("GLU".into())),
            ("zlib", PackageMapEntry::Library("z".into())),
        ]);
        TargetPlatform {
            name: PlatformName::Linux,
            object_format: ObjectFormat::Elf,
            executable_ext: "",
            shared_library_ext: ".so",
            has_import_library: false,
            has_versioned_library: true,
            has_frameworks: false,
            package_map,
            install_dirs: default_install_dirs(),
        }
    }

    /// A Darwin/Mach-O target.
    pub fn darwin() -> Self {
        let package_map = IndexMap::from([
            ("gl", PackageMapEntry::Framework("OpenGL".into())),
            ("glu", PackageMapEntry::Framework("OpenGL".into())),
            ("glut", PackageMapEntry::Framework("GLUT".into())),
        ]);
        TargetPlatform {
            name: PlatformName::Darwin,
            object_format: ObjectFormat::MachO,
            shared_library_ext: ".dylib",
            has_frameworks: true,
            package_map,
            ..TargetPlatform::posix()
        }
    }

    /// A Windows/COFF target.
    pub fn windows() -> Self {
        TargetPlatform {
            name: PlatformName::Windows,
            object_format: ObjectFormat::Coff,
            executable_ext: ".exe",
            shared_library_ext: ".dll",
            has_import_library: true,
            has_versioned_library: false,
            package_map: IndexMap::new(),
            ..TargetPlatform::posix()
        }
    }

    /// Translate a package name into the linkable it conventionally
    /// provides on this platform.
    pub fn transform_package(&self, name: &str) -> PackageMapEntry {
        self.package_map
            .get(name)
            .cloned()
            .unwrap_or_else(|| PackageMapEntry::Library(name.to_string()))
    }

    /// The install directory layout, in declaration order.
    pub fn install_dirs(&self) -> &IndexMap<InstallRoot, BuildPath> {
        &self.install_dirs
    }
}

fn default_install_dirs() -> IndexMap<InstallRoot, BuildPath> {
    IndexMap::from([
        (InstallRoot::Prefix, BuildPath::absolute("/usr/local")),
        (
            InstallRoot::ExecPrefix,
            BuildPath::install(InstallRoot::Prefix, ""),
        ),
        (
            InstallRoot::BinDir,
            BuildPath::install(InstallRoot::ExecPrefix, "bin"),
        ),
        (
            InstallRoot::LibDir,
            BuildPath::install(InstallRoot::ExecPrefix, "lib"),
        ),
        (
            InstallRoot::IncludeDir,
            BuildPath::install(InstallRoot::Prefix, "include"),
        ),
    ])
}
