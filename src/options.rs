//! Abstract build options.
//!
//! An [`OptionList`] is the universal argument to every flag translator:
//! an ordered sequence of typed options that each family renders into its
//! own command-line syntax. The variant set is closed; translators match
//! exhaustively and reject variants that make no sense for their role.

use crate::file_types::{HeaderDirectory, Library, PrecompiledHeader};
use crate::path::BuildPath;
use crate::safe_str::Value;

/// A reference to something linkable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryRef {
    /// A bare name resolved by the linker's own search (`-lname`).
    Named(String),
    /// A concrete library artifact.
    File(Library),
}

impl From<Library> for LibraryRef {
    fn from(lib: Library) -> Self {
        LibraryRef::File(lib)
    }
}

impl From<&str> for LibraryRef {
    fn from(name: &str) -> Self {
        LibraryRef::Named(name.to_string())
    }
}

/// One abstract build option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOption {
    /// Add a header search directory.
    IncludeDir(HeaderDirectory),
    /// Define a preprocessor symbol, optionally with a value.
    Define(String, Option<String>),
    /// Add a library search directory.
    LibDir(BuildPath),
    /// Link a library.
    Lib(LibraryRef),
    /// Embed a runtime search path.
    RpathDir(BuildPath),
    /// Add a link-time-only runtime search path.
    RpathLinkDir(BuildPath),
    /// Select a language standard.
    Std(String),
    /// Enable thread support.
    Pthread,
    /// Generate position-independent code.
    Pic,
    /// Use a precompiled header.
    Pch(PrecompiledHeader),
    /// Set the program entry point.
    EntryPoint(String),
    /// A raw flag passed through verbatim.
    Raw(String),
    /// A raw token emitted in the library position.
    LibLiteral(Value),
}

impl BuildOption {
    /// The variant name, for "unknown option type" diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildOption::IncludeDir(_) => "include_dir",
            BuildOption::Define(..) => "define",
            BuildOption::LibDir(_) => "lib_dir",
            BuildOption::Lib(_) => "lib",
            BuildOption::RpathDir(_) => "rpath_dir",
            BuildOption::RpathLinkDir(_) => "rpath_link_dir",
            BuildOption::Std(_) => "std",
            BuildOption::Pthread => "pthread",
            BuildOption::Pic => "pic",
            BuildOption::Pch(_) => "pch",
            BuildOption::EntryPoint(_) => "entry_point",
            BuildOption::Raw(_) => "raw",
            BuildOption::LibLiteral(_) => "lib_literal",
        }
    }
}

/// An ordered list of build options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    options: Vec<BuildOption>,
}

impl OptionList {
    pub fn new() -> Self {
        OptionList::default()
    }

    pub fn push(&mut self, option: BuildOption) {
        self.options.push(option);
    }

    pub fn extend(&mut self, options: impl IntoIterator<Item = BuildOption>) {
        self.options.extend(options);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildOption> {
        self.options.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// The libraries referenced by `lib` options, in order.
    pub fn libs(&self) -> impl Iterator<Item = &LibraryRef> {
        self.options.iter().filter_map(|opt| match opt {
            BuildOption::Lib(lib) => Some(lib),
            _ => None,
        })
    }

    /// The entry point, if one was requested.
    pub fn entry_point(&self) -> Option<&str> {
        self.options.iter().find_map(|opt| match opt {
            BuildOption::EntryPoint(main) => Some(main.as_str()),
            _ => None,
        })
    }
}

impl FromIterator<BuildOption> for OptionList {
    fn from_iter<I: IntoIterator<Item = BuildOption>>(iter: I) -> Self {
        OptionList {
            options: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OptionList {
    type Item = BuildOption;
    type IntoIter = std::vec::IntoIter<BuildOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.into_iter()
    }
}

impl<'a> IntoIterator for &'a OptionList {
    type Item = &'a BuildOption;
    type IntoIter = std::slice::Iter<'a, BuildOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let mut opts = OptionList::new();
        opts.push(BuildOption::Define("A".into(), None));
        opts.push(BuildOption::Pthread);
        opts.push(BuildOption::Define("B".into(), Some("1".into())));
        let kinds: Vec<_> = opts.iter().map(BuildOption::kind).collect();
        assert_eq!(kinds, vec!["define", "pthread", "define"]);
    }

    #[test]
    fn test_entry_point() {
        let mut opts = OptionList::new();
        assert_eq!(opts.entry_point(), None);
        opts.push(BuildOption::EntryPoint("com.example.Main".into()));
        assert_eq!(opts.entry_point(), Some("com.example.Main"));
    }
}
