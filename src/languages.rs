//! Language descriptors and environment-variable tables.

use indexmap::IndexMap;

/// A source language the generator can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cxx,
    Java,
    Scala,
}

impl Language {
    /// The language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
            Language::Java => "java",
            Language::Scala => "scala",
        }
    }

    /// Whether the language belongs to the JVM family.
    pub fn is_jvm(&self) -> bool {
        matches!(self, Language::Java | Language::Scala)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment-variable names and defaults for one language.
#[derive(Debug, Clone)]
pub struct LanguageInfo {
    pub lang: Language,
    /// Variable naming the compiler command (e.g. `CC`).
    pub compiler_var: &'static str,
    /// Variable holding extra compile flags (e.g. `CFLAGS`).
    pub cflags_var: &'static str,
    /// Variable naming the runner command, for families that have one.
    pub runner_var: Option<&'static str>,
    /// Fallback compiler command when the variable is unset.
    pub default_compiler: &'static str,
}

impl LanguageInfo {
    /// The rule-name stem for this language's compiler (lowercased
    /// compiler variable, matching the convention for build-file rules).
    pub fn rule_stem(&self) -> String {
        self.compiler_var.to_lowercase()
    }
}

/// The table of known languages.
///
/// Built once and passed into toolchain builders explicitly so multiple
/// configurations can coexist in one process.
#[derive(Debug, Clone)]
pub struct Languages {
    table: IndexMap<Language, LanguageInfo>,
}

impl Languages {
    /// The default language table.
    pub fn defaults() -> Self {
        let mut table = IndexMap::new();
        for info in [
            LanguageInfo {
                lang: Language::C,
                compiler_var: "CC",
                cflags_var: "CFLAGS",
                runner_var: None,
                default_compiler: "cc",
            },
            LanguageInfo {
                lang: Language::Cxx,
                compiler_var: "CXX",
                cflags_var: "CXXFLAGS",
                runner_var: None,
                default_compiler: "c++",
            },
            LanguageInfo {
                lang: Language::Java,
                compiler_var: "JAVAC",
                cflags_var: "JAVAFLAGS",
                runner_var: Some("JAVACMD"),
                default_compiler: "javac",
            },
            LanguageInfo {
                lang: Language::Scala,
                compiler_var: "SCALAC",
                cflags_var: "SCALAFLAGS",
                runner_var: Some("SCALACMD"),
                default_compiler: "scalac",
            },
        ] {
            table.insert(info.lang, info);
        }
        Languages { table }
    }

    /// Look up a language's descriptor.
    pub fn get(&self, lang: Language) -> &LanguageInfo {
        // The default table covers every Language variant.
        &self.table[&lang]
    }
}
