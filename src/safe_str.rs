//! Composite string values with escaping provenance.
//!
//! Build-file emission needs to distinguish text that must be escaped for
//! the target syntax from text that is already safe (variable references
//! like `$cflags`) and from paths, which are realized against the writer's
//! root variables before escaping. A [`Value`] is an ordered concatenation
//! of such fragments; translators and the graph writer pass `Value`s around
//! instead of bare strings so the decision of how to escape each piece is
//! deferred to serialization time.

use crate::path::BuildPath;

/// One piece of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Raw text, escaped according to the syntactic context at write time.
    Raw(String),
    /// Pre-escaped text emitted verbatim (e.g. a `$var` reference).
    Literal(String),
    /// A rooted path, realized and then escaped recursively.
    Path(BuildPath),
}

/// An ordered concatenation of fragments forming one emitted token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Value {
    fragments: Vec<Fragment>,
}

impl Value {
    /// A value consisting of a single raw fragment.
    pub fn raw(s: impl Into<String>) -> Self {
        Value {
            fragments: vec![Fragment::Raw(s.into())],
        }
    }

    /// A value consisting of a single pre-escaped fragment.
    pub fn literal(s: impl Into<String>) -> Self {
        Value {
            fragments: vec![Fragment::Literal(s.into())],
        }
    }

    /// A value consisting of a single path fragment.
    pub fn path(p: BuildPath) -> Self {
        Value {
            fragments: vec![Fragment::Path(p)],
        }
    }

    /// The fragments of this value, in emission order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Append another value, concatenating with no separator.
    pub fn concat(mut self, other: impl Into<Value>) -> Self {
        self.fragments.extend(other.into().fragments);
        self
    }

    /// Join values with a raw separator between each pair.
    pub fn join<I>(values: I, sep: &str) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut out = Value::default();
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                out.fragments.push(Fragment::Raw(sep.to_string()));
            }
            out.fragments.extend(v.fragments);
        }
        out
    }

    /// Whether the value has no fragments at all.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl std::fmt::Display for Value {
    /// Diagnostic rendering only; emission goes through the graph writer.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for frag in &self.fragments {
            match frag {
                Fragment::Raw(s) | Fragment::Literal(s) => f.write_str(s)?,
                Fragment::Path(p) => write!(f, "{}", p)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::raw(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::raw(s)
    }
}

impl From<BuildPath> for Value {
    fn from(p: BuildPath) -> Self {
        Value::path(p)
    }
}
