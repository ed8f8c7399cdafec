//! Context-sensitive escaping for the Ninja dialect.
//!
//! Ninja assigns different meanings to `$`, `:`, and space depending on
//! where a token appears. Output positions must escape all three; input
//! positions only `$` and space; everything that reaches a shell doubles
//! `$` so the shell sees a single one. Shell positions additionally quote
//! the token when it contains shell metacharacters, while "clean" values
//! (paths in variable blocks) double `$` but are never shell-quoted.

use std::io::Write;

use crate::path::RootVars;
use crate::safe_str::{Fragment, Value};
use crate::shell;

use super::GraphError;

/// The syntactic context a string is being written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Output,
    Input,
    Shell,
    Clean,
}

/// How raw text in shell context gets protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    /// Quote as a standalone shell word.
    Quote,
    /// Escape for later wrapping (used inside realized paths).
    Escape,
    /// Leave as-is (scalar variable values).
    None,
}

/// Escape a raw string for the given context.
///
/// A literal newline can never be represented and is rejected.
pub fn escape_str(s: &str, syntax: Syntax) -> Result<String, GraphError> {
    if s.contains('\n') {
        return Err(GraphError::IllegalNewline);
    }
    let escaped = match syntax {
        Syntax::Output => {
            let mut out = String::with_capacity(s.len());
            for c in s.chars() {
                if c == ':' || c == '$' || c == ' ' {
                    out.push('$');
                }
                out.push(c);
            }
            out
        }
        Syntax::Input => {
            let mut out = String::with_capacity(s.len());
            for c in s.chars() {
                if c == '$' || c == ' ' {
                    out.push('$');
                }
                out.push(c);
            }
            out
        }
        Syntax::Shell | Syntax::Clean => s.replace('$', "$$"),
    };
    Ok(escaped)
}

/// Serializes values into a stream, one escaping decision per fragment.
pub struct Writer<'a, W: Write> {
    stream: W,
    root_vars: &'a RootVars,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(stream: W, root_vars: &'a RootVars) -> Self {
        Writer { stream, root_vars }
    }

    /// Write pre-formatted text verbatim.
    pub fn write_literal(&mut self, s: &str) -> Result<(), GraphError> {
        self.stream.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Write one value in the given context.
    ///
    /// Returns whether any part of the output was shell-escaped, which
    /// drives whole-token re-quoting of realized paths.
    pub fn write_value(
        &mut self,
        value: &Value,
        syntax: Syntax,
        quote: QuoteMode,
    ) -> Result<bool, GraphError> {
        let mut escaped = false;
        for frag in value.fragments() {
            escaped |= self.write_fragment(frag, syntax, quote)?;
        }
        Ok(escaped)
    }

    fn write_fragment(
        &mut self,
        frag: &Fragment,
        syntax: Syntax,
        quote: QuoteMode,
    ) -> Result<bool, GraphError> {
        match frag {
            Fragment::Literal(s) => {
                self.write_literal(s)?;
                Ok(true)
            }
            Fragment::Raw(s) => {
                let (text, was_quoted) = if syntax == Syntax::Shell {
                    match quote {
                        QuoteMode::Quote => shell::quote_info(s),
                        QuoteMode::Escape => shell::escape(s),
                        QuoteMode::None => (s.clone(), false),
                    }
                } else {
                    (s.clone(), false)
                };
                self.write_literal(&escape_str(&text, syntax)?)?;
                Ok(was_quoted)
            }
            Fragment::Path(p) => {
                let shelly = syntax == Syntax::Shell;
                let realized = p.realize(self.root_vars, shelly);

                // Realize into a buffer first: if any piece needed shell
                // escaping, the assembled token is re-quoted as a whole.
                let mut buf = Vec::new();
                let mut sub = Writer::new(&mut buf, self.root_vars);
                let escaped = sub.write_value(&realized, syntax, QuoteMode::Escape)?;

                let text = String::from_utf8(buf).map_err(|_| GraphError::IllegalNewline)?;
                let text = if shelly && escaped {
                    shell::quote_escaped(&text, true)
                } else {
                    text
                };
                self.write_literal(&text)?;
                Ok(escaped)
            }
        }
    }

    /// Write values separated by `delim`, with an optional prefix emitted
    /// only when the list is non-empty.
    pub fn write_each(
        &mut self,
        values: &[Value],
        syntax: Syntax,
        delim: &str,
        prefix: Option<&str>,
    ) -> Result<(), GraphError> {
        for (i, v) in values.iter().enumerate() {
            if i == 0 {
                if let Some(p) = prefix {
                    self.write_literal(p)?;
                }
            } else {
                self.write_literal(delim)?;
            }
            self.write_value(v, syntax, QuoteMode::Quote)?;
        }
        Ok(())
    }
}
