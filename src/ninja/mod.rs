//! The Ninja build-file model and serializer.
//!
//! A [`NinjaFile`] accumulates variables, rules, build edges, and default
//! targets, enforcing the graph invariants (unique rule names, globally
//! unique build outputs, well-formed identifiers) as entries are declared.
//! Serialization is deterministic: variable sections in a fixed order with
//! entries in declaration order, then rules, then edges, then defaults.

use std::io::Write;
use std::sync::OnceLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use thiserror::Error;

use crate::path::RootVars;
use crate::safe_str::Value;

pub mod syntax;

pub use syntax::{escape_str, QuoteMode, Syntax, Writer};

/// The reserved no-op rule for alias edges.
pub const PHONY: &str = "phony";

/// Error raised for graph-invariant violations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("variable `{0}` already exists")]
    DuplicateVariable(String),

    #[error("rule name `{0}` contains invalid characters")]
    InvalidRuleName(String),

    #[error("rule `{0}` already exists")]
    DuplicateRule(String),

    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    #[error("build for `{0}` already exists")]
    DuplicateBuild(String),

    #[error("illegal newline")]
    IllegalNewline,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\W").expect("static regex"))
}

/// A declared variable, identified by its sanitized name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Create a variable handle, replacing non-word characters with `_`.
    pub fn new(name: &str) -> Self {
        Variable {
            name: non_word().replace_all(name, "_").into_owned(),
        }
    }

    /// The sanitized variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A reference to this variable, usable inside values.
    pub fn use_(&self) -> Value {
        Value::literal(format!("${}", self.name))
    }
}

/// The value bound to a variable.
///
/// Lists are emitted space-separated with each element shell-quoted;
/// scalars are emitted as-is (only `$`-doubled), since they are either
/// whole command text or plain data.
#[derive(Debug, Clone)]
pub enum VarValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl From<Value> for VarValue {
    fn from(v: Value) -> Self {
        VarValue::Scalar(v)
    }
}

impl From<Vec<Value>> for VarValue {
    fn from(v: Vec<Value>) -> Self {
        VarValue::List(v)
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Scalar(Value::raw(s))
    }
}

/// Emission buckets for variables; each bucket is flushed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Path,
    Command,
    Flags,
    Other,
}

impl Section {
    fn all() -> [Section; 4] {
        [Section::Path, Section::Command, Section::Flags, Section::Other]
    }
}

/// The dependency-file format a rule advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsStyle {
    Gcc,
    Msvc,
}

impl DepsStyle {
    fn as_str(&self) -> &'static str {
        match self {
            DepsStyle::Gcc => "gcc",
            DepsStyle::Msvc => "msvc",
        }
    }
}

/// A named command template.
#[derive(Debug, Clone)]
pub struct Rule {
    command: VarValue,
    depfile: Option<Value>,
    deps: Option<DepsStyle>,
    generator: bool,
    restat: bool,
}

impl Rule {
    /// Create a rule with the given command.
    pub fn new(command: impl Into<VarValue>) -> Self {
        Rule {
            command: command.into(),
            depfile: None,
            deps: None,
            generator: false,
            restat: false,
        }
    }

    /// Set the dependency file the command writes.
    pub fn depfile(mut self, depfile: impl Into<Value>) -> Self {
        self.depfile = Some(depfile.into());
        self
    }

    /// Set the dependency-file format.
    pub fn deps(mut self, deps: DepsStyle) -> Self {
        self.deps = Some(deps);
        self
    }

    /// Mark the rule as regenerating the build file itself.
    pub fn generator(mut self, generator: bool) -> Self {
        self.generator = generator;
        self
    }

    /// Mark the rule as restat.
    pub fn restat(mut self, restat: bool) -> Self {
        self.restat = restat;
        self
    }
}

/// One build edge.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    pub inputs: Vec<Value>,
    pub implicit: Vec<Value>,
    pub order_only: Vec<Value>,
    pub variables: IndexMap<String, VarValue>,
}

#[derive(Debug, Clone)]
struct BuildEdge {
    outputs: Vec<Value>,
    rule: String,
    inputs: Vec<Value>,
    implicit: Vec<Value>,
    order_only: Vec<Value>,
    variables: IndexMap<Variable, VarValue>,
}

/// An in-memory Ninja file.
#[derive(Debug)]
pub struct NinjaFile {
    root_vars: RootVars,
    var_table: IndexSet<Variable>,
    variables: IndexMap<Section, Vec<(Variable, VarValue)>>,
    rules: IndexMap<String, Rule>,
    builds: Vec<BuildEdge>,
    build_outputs: IndexSet<Value>,
    defaults: Vec<Value>,
}

impl NinjaFile {
    /// Create an empty file with the conventional root variables
    /// (`$srcdir` plus one variable per install root).
    pub fn new() -> Self {
        NinjaFile::with_root_vars(RootVars::new(Value::literal("$srcdir")))
    }

    /// Create an empty file with an explicit root-variable mapping.
    pub fn with_root_vars(root_vars: RootVars) -> Self {
        NinjaFile {
            root_vars,
            var_table: IndexSet::new(),
            variables: Section::all().into_iter().map(|s| (s, Vec::new())).collect(),
            rules: IndexMap::new(),
            builds: Vec::new(),
            build_outputs: IndexSet::new(),
            defaults: Vec::new(),
        }
    }

    /// The root-variable mapping paths are realized against.
    pub fn root_vars(&self) -> &RootVars {
        &self.root_vars
    }

    /// Declare a variable, returning its handle.
    ///
    /// Redeclaring keeps the first binding; with `exist_ok` false it is an
    /// error instead.
    pub fn variable(
        &mut self,
        name: &str,
        value: impl Into<VarValue>,
        section: Section,
        exist_ok: bool,
    ) -> Result<Variable, GraphError> {
        let var = Variable::new(name);
        if self.has_variable(&var) {
            if !exist_ok {
                return Err(GraphError::DuplicateVariable(var.name.clone()));
            }
        } else {
            self.var_table.insert(var.clone());
            // Section buckets are created up front for every section.
            if let Some(bucket) = self.variables.get_mut(&section) {
                bucket.push((var.clone(), value.into()));
            }
        }
        Ok(var)
    }

    /// Whether a variable with this (sanitized) name is declared.
    pub fn has_variable(&self, var: &Variable) -> bool {
        self.var_table.contains(var)
    }

    /// Declare a rule.
    pub fn rule(&mut self, name: &str, rule: Rule) -> Result<(), GraphError> {
        if non_word().is_match(name) {
            return Err(GraphError::InvalidRuleName(name.to_string()));
        }
        if self.has_rule(name) {
            return Err(GraphError::DuplicateRule(name.to_string()));
        }
        self.rules.insert(name.to_string(), rule);
        Ok(())
    }

    /// Whether a rule with this name is declared.
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Declare a build edge.
    pub fn build(
        &mut self,
        outputs: Vec<Value>,
        rule: &str,
        args: BuildArgs,
    ) -> Result<(), GraphError> {
        if rule != PHONY && !self.has_rule(rule) {
            return Err(GraphError::UnknownRule(rule.to_string()));
        }

        for output in &outputs {
            if self.has_build(output) {
                return Err(GraphError::DuplicateBuild(output.to_string()));
            }
        }
        for output in &outputs {
            self.build_outputs.insert(output.clone());
        }

        let variables = args
            .variables
            .into_iter()
            .map(|(k, v)| (Variable::new(&k), v))
            .collect();
        self.builds.push(BuildEdge {
            outputs,
            rule: rule.to_string(),
            inputs: args.inputs,
            implicit: args.implicit,
            order_only: args.order_only,
            variables,
        });
        Ok(())
    }

    /// Whether an edge already produces this output.
    pub fn has_build(&self, output: &Value) -> bool {
        self.build_outputs.contains(output)
    }

    /// Append default targets.
    pub fn default(&mut self, targets: impl IntoIterator<Item = Value>) {
        self.defaults.extend(targets);
    }

    /// Serialize the whole graph.
    pub fn write(&self, stream: &mut dyn Write) -> Result<(), GraphError> {
        let mut out = Writer::new(stream, &self.root_vars);

        for section in Section::all() {
            // Paths are inherently clean: variable expansion only, no
            // shell quoting.
            let clean = section == Section::Path;
            let bucket = &self.variables[&section];
            for (var, value) in bucket {
                write_variable(&mut out, var, value, clean, 0)?;
            }
            if !bucket.is_empty() {
                out.write_literal("\n")?;
            }
        }

        for (name, rule) in &self.rules {
            write_rule(&mut out, name, rule)?;
            out.write_literal("\n")?;
        }

        for build in &self.builds {
            write_build(&mut out, build)?;
        }

        if !self.defaults.is_empty() {
            out.write_literal("\ndefault ")?;
            out.write_each(&self.defaults, Syntax::Input, " ", None)?;
            out.write_literal("\n")?;
        }
        Ok(())
    }
}

impl Default for NinjaFile {
    fn default() -> Self {
        NinjaFile::new()
    }
}

fn write_variable<W: Write>(
    out: &mut Writer<'_, W>,
    var: &Variable,
    value: &VarValue,
    clean: bool,
    indent: usize,
) -> Result<(), GraphError> {
    let syntax = if clean { Syntax::Clean } else { Syntax::Shell };
    out.write_literal(&"  ".repeat(indent))?;
    out.write_literal(var.name())?;
    out.write_literal(" = ")?;
    match value {
        VarValue::Scalar(v) => {
            out.write_value(v, syntax, QuoteMode::None)?;
        }
        VarValue::List(vs) => {
            out.write_each(vs, syntax, " ", None)?;
        }
    }
    out.write_literal("\n")?;
    Ok(())
}

fn write_rule<W: Write>(
    out: &mut Writer<'_, W>,
    name: &str,
    rule: &Rule,
) -> Result<(), GraphError> {
    out.write_literal("rule ")?;
    out.write_literal(name)?;
    out.write_literal("\n")?;

    write_variable(out, &Variable::new("command"), &rule.command, false, 1)?;
    if let Some(depfile) = &rule.depfile {
        write_variable(
            out,
            &Variable::new("depfile"),
            &VarValue::Scalar(depfile.clone()),
            false,
            1,
        )?;
    }
    if let Some(deps) = rule.deps {
        write_variable(
            out,
            &Variable::new("deps"),
            &VarValue::Scalar(Value::raw(deps.as_str())),
            false,
            1,
        )?;
    }
    if rule.generator {
        write_variable(out, &Variable::new("generator"), &"1".into(), false, 1)?;
    }
    if rule.restat {
        write_variable(out, &Variable::new("restat"), &"1".into(), false, 1)?;
    }
    Ok(())
}

fn write_build<W: Write>(out: &mut Writer<'_, W>, build: &BuildEdge) -> Result<(), GraphError> {
    out.write_literal("build ")?;
    out.write_each(&build.outputs, Syntax::Output, " ", None)?;
    out.write_literal(": ")?;
    out.write_literal(&build.rule)?;

    out.write_each(&build.inputs, Syntax::Input, " ", Some(" "))?;
    out.write_each(&build.implicit, Syntax::Input, " ", Some(" | "))?;
    out.write_each(&build.order_only, Syntax::Input, " ", Some(" || "))?;
    out.write_literal("\n")?;

    for (var, value) in &build.variables {
        write_variable(out, var, value, false, 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(file: &NinjaFile) -> String {
        let mut buf = Vec::new();
        file.write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_empty_graph_empty_stream() {
        assert_eq!(render(&NinjaFile::new()), "");
    }

    #[test]
    fn test_variable_sanitizes_name() {
        let mut file = NinjaFile::new();
        let var = file
            .variable("my-flags", "x", Section::Flags, false)
            .unwrap();
        assert_eq!(var.name(), "my_flags");
        assert_eq!(render(&file), "my_flags = x\n\n");
    }

    #[test]
    fn test_duplicate_variable() {
        let mut file = NinjaFile::new();
        file.variable("cflags", "a", Section::Flags, false).unwrap();
        // Redeclaration keeps the first binding when allowed.
        file.variable("cflags", "b", Section::Flags, true).unwrap();
        assert!(matches!(
            file.variable("cflags", "c", Section::Flags, false),
            Err(GraphError::DuplicateVariable(_))
        ));
        assert_eq!(render(&file), "cflags = a\n\n");
    }

    #[test]
    fn test_section_order() {
        let mut file = NinjaFile::new();
        file.variable("other", "o", Section::Other, false).unwrap();
        file.variable("srcdir", "/src", Section::Path, false)
            .unwrap();
        file.variable("cc", "gcc", Section::Command, false).unwrap();
        assert_eq!(
            render(&file),
            "srcdir = /src\n\ncc = gcc\n\nother = o\n\n"
        );
    }

    #[test]
    fn test_invalid_rule_name() {
        let mut file = NinjaFile::new();
        assert!(matches!(
            file.rule("bad name", Rule::new("cmd")),
            Err(GraphError::InvalidRuleName(_))
        ));
        assert!(matches!(
            file.rule("bad.name", Rule::new("cmd")),
            Err(GraphError::InvalidRuleName(_))
        ));
    }

    #[test]
    fn test_duplicate_rule() {
        let mut file = NinjaFile::new();
        file.rule("cc", Rule::new("gcc")).unwrap();
        assert!(matches!(
            file.rule("cc", Rule::new("clang")),
            Err(GraphError::DuplicateRule(_))
        ));
    }

    #[test]
    fn test_unknown_rule_reference() {
        let mut file = NinjaFile::new();
        assert!(matches!(
            file.build(vec!["a.o".into()], "cc", BuildArgs::default()),
            Err(GraphError::UnknownRule(_))
        ));
        // The alias rule needs no declaration.
        file.build(vec!["all".into()], PHONY, BuildArgs::default())
            .unwrap();
    }

    #[test]
    fn test_duplicate_output() {
        let mut file = NinjaFile::new();
        file.rule("cc", Rule::new("gcc")).unwrap();
        file.rule("cxx", Rule::new("g++")).unwrap();
        file.build(vec!["a.o".into()], "cc", BuildArgs::default())
            .unwrap();
        let again = file.build(
            vec!["a.o".into()],
            "cxx",
            BuildArgs {
                inputs: vec!["other.c".into()],
                ..BuildArgs::default()
            },
        );
        assert!(matches!(again, Err(GraphError::DuplicateBuild(_))));
    }

    #[test]
    fn test_build_line_layout() {
        let mut file = NinjaFile::new();
        file.rule("cc", Rule::new("gcc")).unwrap();
        file.build(
            vec!["a.o".into(), "b.o".into()],
            "cc",
            BuildArgs {
                inputs: vec!["a.c".into()],
                implicit: vec!["header.h".into()],
                ..BuildArgs::default()
            },
        )
        .unwrap();
        let text = render(&file);
        assert!(text.contains("build a.o b.o: cc a.c | header.h\n"));
    }

    #[test]
    fn test_build_edge_variables() {
        let mut file = NinjaFile::new();
        file.rule("cc", Rule::new("gcc")).unwrap();
        let mut variables = IndexMap::new();
        variables.insert("cflags".to_string(), VarValue::from("-O2"));
        file.build(
            vec!["a.o".into()],
            "cc",
            BuildArgs {
                inputs: vec!["a.c".into()],
                variables,
                ..BuildArgs::default()
            },
        )
        .unwrap();
        assert!(render(&file).contains("build a.o: cc a.c\n  cflags = -O2\n"));
    }

    #[test]
    fn test_default_line() {
        let mut file = NinjaFile::new();
        file.rule("cc", Rule::new("gcc")).unwrap();
        file.build(vec!["a.o".into()], "cc", BuildArgs::default())
            .unwrap();
        file.default(vec!["a.o".into()]);
        assert!(render(&file).ends_with("build a.o: cc\n\ndefault a.o\n"));
    }

    #[test]
    fn test_rule_fields() {
        let mut file = NinjaFile::new();
        file.rule(
            "cc",
            Rule::new(VarValue::List(vec![
                Value::literal("$cc"),
                "-c".into(),
                Value::literal("$in"),
                "-o".into(),
                Value::literal("$out"),
            ]))
            .depfile(Value::literal("$out.d"))
            .deps(DepsStyle::Gcc),
        )
        .unwrap();
        let text = render(&file);
        assert!(text.contains("rule cc\n"));
        assert!(text.contains("  command = $cc -c $in -o $out\n"));
        assert!(text.contains("  depfile = $out.d\n"));
        assert!(text.contains("  deps = gcc\n"));
        assert!(!text.contains("generator"));
        assert!(!text.contains("restat"));
    }
}
