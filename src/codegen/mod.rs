//! Python unittest generation.
//!
//! The generator renders a [`SpecTree`] as one Python module. Every [`GenerationUnit`] becomes a
//! `unittest.TestCase` subclass holding:
//!
//! - the class-level code of its describe/context chain,
//! - one partial `_set_up_*` method per applicable `before` and `let`,
//! - one partial `_tear_down_*` method per applicable `after`,
//! - `setUp` (always) and `tearDown` (only with teardowns) calling the partials in order,
//! - one `test_*` method per `it`.
//!
//! Code bodies are copied as text: dedented from their first line, then reindented to the
//! depth of the method or class they land in.

pub mod units;

use std::collections::HashSet;

use crate::ast::{Block, BlockId, BlockKind, SpecTree};
use crate::errors::{CarinataError, ErrorReporting, SourceContext, SpecContext};
use crate::naming::{camelify, dedent, snakify};

pub use units::{partition, resolve, GenerationUnit, Resolution};

const CLASS_INDENT: usize = 4;
const METHOD_INDENT: usize = 8;

/// Provenance comment written at the top of generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Hex SHA-256 of the spec source, used to skip regeneration.
    pub hash: Option<String>,
    pub source_path: String,
}

impl FileHeader {
    pub const HASH_PREFIX: &'static str = "# sha256: ";

    /// Extracts the digest from the first line of a generated file.
    pub fn read_hash(generated: &str) -> Option<&str> {
        generated
            .lines()
            .next()?
            .strip_prefix(Self::HASH_PREFIX)
            .map(str::trim)
            .filter(|hash| !hash.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Dotted path of the class every generated test class derives from.
    pub base_class: String,
    /// Append `  # L:<n>` to every copied code line.
    pub line_markers: bool,
    pub header: Option<FileHeader>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            base_class: "unittest.TestCase".to_string(),
            line_markers: false,
            header: None,
        }
    }
}

/// Generates a Python module from a parsed spec with default options.
pub fn generate(tree: &SpecTree) -> Result<String, CarinataError> {
    CodeGenerator::new(tree, GeneratorOptions::default()).generate()
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct CodeGenerator<'a> {
    tree: &'a SpecTree,
    options: GeneratorOptions,
    ctx: SpecContext,
    out: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(tree: &'a SpecTree, options: GeneratorOptions) -> Self {
        Self::with_source(tree, options, SourceContext::anonymous(""))
    }

    /// Uses `source` to point diagnostics at lines of the spec file.
    pub fn with_source(tree: &'a SpecTree, options: GeneratorOptions, source: SourceContext) -> Self {
        Self {
            tree,
            options,
            ctx: SpecContext::new(source, "codegen"),
            out: String::new(),
        }
    }

    pub fn generate(mut self) -> Result<String, CarinataError> {
        self.module_prologue();

        let mut class_names = Vec::new();
        let mut seen = HashSet::new();
        for unit in partition(self.tree) {
            let name = self.class_name(unit.parent);
            if !seen.insert(name.clone()) {
                tracing::warn!(class = %name, "duplicate test class name; the later class shadows the earlier one");
            }
            self.class(&name, &unit)?;
            class_names.push(name);
        }

        self.module_epilogue(&class_names);
        Ok(self.out)
    }

    fn module_prologue(&mut self) {
        if let Some(header) = self.options.header.clone() {
            if let Some(hash) = &header.hash {
                self.line(&format!("{}{}", FileHeader::HASH_PREFIX, hash));
            }
            self.line("# This file was auto-generated by carinata");
            self.line("# It may be overwritten at any time, so please refer to the original:");
            self.line(&format!("# {}", header.source_path));
            self.line("#");
        }
        self.line("import unittest");
        let base_class = self.options.base_class.clone();
        if let Some((module, _)) = base_class.rsplit_once('.') {
            if module != "unittest" {
                self.line(&format!("import {}", module));
            }
        }
        let tree = self.tree;
        let root = tree.root();
        if root.has_code() {
            self.code(root, 0);
        }
    }

    fn module_epilogue(&mut self, class_names: &[String]) {
        let quoted: Vec<String> = class_names.iter().map(|n| format!("'{}'", n)).collect();
        self.line("");
        self.line(&format!("__all__ = [{}]", quoted.join(", ")));
        self.line("");
        self.line("if __name__ == '__main__':");
        self.line("    unittest.main()");
    }

    /// `Test` followed by the camel-cased labels of the describe/context chain.
    pub fn class_name(&self, parent: BlockId) -> String {
        let mut name = String::from("Test");
        for id in units::scope_chain(self.tree, parent) {
            name.push_str(&camelify(&self.tree.get(id).label));
        }
        name
    }

    fn class(&mut self, name: &str, unit: &GenerationUnit) -> Result<(), CarinataError> {
        let tree = self.tree;
        tracing::debug!(class = name, tests = unit.tests.len(), "emitting test class");

        self.line("");
        self.line("");
        // describe/context decorators wrap every class generated inside them
        for id in units::scope_chain(tree, unit.parent) {
            self.decorators(tree.get(id), 0);
        }
        self.line(&format!("class {}({}):", name, self.options.base_class));

        for id in units::scope_chain(tree, unit.parent) {
            let scope = tree.get(id);
            if scope.has_code() {
                self.code(scope, CLASS_INDENT);
                self.line("");
            }
        }

        let resolution = resolve(tree, unit.parent);
        let mut methods = HashSet::new();

        let mut set_up_calls = Vec::new();
        for (index, &id) in resolution.setups.iter().enumerate() {
            let block = tree.get(id);
            let method = self.set_up_name(block, index, &mut methods);
            self.method(&method, block);
            set_up_calls.push(self.setup_call(block, &method)?);
        }

        let mut tear_down_calls = Vec::new();
        for (index, &id) in resolution.teardowns.iter().enumerate() {
            let block = tree.get(id);
            let method = partial_name("_tear_down", block, index);
            methods.insert(method.clone());
            self.method(&method, block);
            tear_down_calls.push(format!("self.{}()", method));
        }

        self.dispatcher("setUp", &set_up_calls);
        if !tear_down_calls.is_empty() {
            self.dispatcher("tearDown", &tear_down_calls);
        }

        for &id in &unit.tests {
            let block = tree.get(id);
            let method = self.test_name(block, &mut methods);
            self.method(&method, block);
        }
        Ok(())
    }

    /// `_set_up_<label>` for a let, numbered from its position when that is taken.
    fn set_up_name(&self, block: &Block, index: usize, taken: &mut HashSet<String>) -> String {
        let mut name = match block.kind {
            BlockKind::Let => format!("_set_up_{}", snakify(&block.label)),
            _ => partial_name("_set_up", block, index),
        };
        let base = name.clone();
        let mut n = index;
        while taken.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        taken.insert(name.clone());
        name
    }

    fn test_name(&self, block: &Block, taken: &mut HashSet<String>) -> String {
        let base = format!("test_{}", snakify(&block.label));
        let mut name = base.clone();
        let mut n = 2;
        while taken.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        if name != base {
            tracing::warn!(test = %base, line = block.line, renamed = %name, "duplicate test name");
        }
        taken.insert(name.clone());
        name
    }

    /// The `setUp` statement for one partial setup method.
    pub(crate) fn setup_call(&self, block: &Block, method: &str) -> Result<String, CarinataError> {
        match block.kind {
            BlockKind::Before => Ok(format!("self.{}()", method)),
            BlockKind::Let => Ok(format!("self.{} = self.{}()", snakify(&block.label), method)),
            other => Err(self.ctx.invalid_setup(other, block.line)),
        }
    }

    fn method(&mut self, name: &str, block: &Block) {
        self.decorators(block, CLASS_INDENT);
        let params = match &block.args {
            Some(args) => format!("self, {}", args),
            None => "self".to_string(),
        };
        self.line(&format!("{}def {}({}):", pad(CLASS_INDENT), name, params));
        if block.has_code() {
            self.code(block, METHOD_INDENT);
        } else {
            self.line(&format!("{}pass", pad(METHOD_INDENT)));
        }
        self.line("");
    }

    fn dispatcher(&mut self, name: &str, calls: &[String]) {
        self.line(&format!("{}def {}(self):", pad(CLASS_INDENT), name));
        if calls.is_empty() {
            self.line(&format!("{}pass", pad(METHOD_INDENT)));
        }
        for call in calls {
            self.line(&format!("{}{}", pad(METHOD_INDENT), call));
        }
        self.line("");
    }

    fn decorators(&mut self, block: &Block, indent: usize) {
        for decorator in &block.decorators {
            self.marked(indent, &decorator.text, decorator.line);
        }
    }

    /// Writes a block's code, dedented and then indented by `indent` columns.
    fn code(&mut self, block: &Block, indent: usize) {
        let texts: Vec<&str> = block.body.iter().map(|c| c.text.as_str()).collect();
        for (code_line, text) in block.body.iter().zip(dedent(&texts)) {
            if text.trim().is_empty() {
                self.line("");
            } else {
                self.marked(indent, &text, code_line.line);
            }
        }
    }

    /// One copied line, with its spec line number appended when markers are on.
    fn marked(&mut self, indent: usize, text: &str, source_line: usize) {
        if self.options.line_markers {
            self.line(&format!("{}{}  # L:{}", pad(indent), text, source_line));
        } else {
            self.line(&format!("{}{}", pad(indent), text));
        }
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// `<prefix>_<label>_<index><suffix>` for before/after partials.
fn partial_name(prefix: &str, block: &Block, index: usize) -> String {
    let stem = snakify(&block.label);
    let suffix = block.suffix.as_deref().unwrap_or("");
    if stem.is_empty() {
        format!("{}_{}{}", prefix, index, suffix)
    } else {
        format!("{}_{}_{}{}", prefix, stem, index, suffix)
    }
}

fn pad(width: usize) -> String {
    " ".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::parser::{parse, parse_seeded};

    #[test]
    fn header_hash_round_trips() {
        assert_eq!(FileHeader::read_hash("# sha256: abc123\n# rest"), Some("abc123"));
        assert_eq!(FileHeader::read_hash("import unittest\n"), None);
        assert_eq!(FileHeader::read_hash("# sha256: \n"), None);
    }

    #[test]
    fn class_name_concatenates_chain() {
        let tree = parse(
            "describe \"a calculator\":\n    context \"with no_input\":\n        it \"x\": pass\n",
        )
        .unwrap();
        let unit = &partition(&tree)[0];
        let generator = CodeGenerator::new(&tree, GeneratorOptions::default());
        assert_eq!(generator.class_name(unit.parent), "TestACalculatorWithNoInput");
    }

    #[test]
    fn setup_call_rejects_non_setup_blocks() {
        let tree = parse("describe \"A\":\n    it \"x\": pass\n").unwrap();
        let generator = CodeGenerator::new(&tree, GeneratorOptions::default());
        let it = Block::new(BlockKind::It, 4, "x", 2);
        let err = generator.setup_call(&it, "_set_up_x").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidSetup { found: BlockKind::It, line: 2 }));
    }

    #[test]
    fn before_partials_carry_index_and_suffix() {
        let tree = parse_seeded(
            SourceContext::anonymous("describe \"A\":\n    before \"open db\": pass\n    it \"x\": pass\n"),
            [1; 32],
        )
        .unwrap();
        let before = tree.blocks.iter().find(|b| b.kind == BlockKind::Before).unwrap();
        let suffix = before.suffix.clone().unwrap();
        let output = generate(&tree).unwrap();
        assert!(output.contains(&format!("    def _set_up_open_db_0{}(self):", suffix)));
        assert!(output.contains(&format!("        self._set_up_open_db_0{}()", suffix)));
    }

    #[test]
    fn line_markers_annotate_code() {
        let tree = parse("describe \"A\":\n    it \"x\":\n        assert True\n").unwrap();
        let options = GeneratorOptions {
            line_markers: true,
            ..GeneratorOptions::default()
        };
        let output = CodeGenerator::new(&tree, options).generate().unwrap();
        assert!(output.contains("        assert True  # L:3\n"));
    }

    #[test]
    fn empty_bodies_get_pass() {
        let tree = parse("describe \"A\":\n    it \"is pending\":\n").unwrap();
        let output = generate(&tree).unwrap();
        assert!(output.contains("    def test_is_pending(self):\n        pass\n"));
        assert!(output.contains("    def setUp(self):\n        pass\n"));
        assert!(!output.contains("tearDown"));
    }

    #[test]
    fn foreign_base_class_is_imported() {
        let tree = parse("describe \"A\":\n    it \"x\": pass\n").unwrap();
        let options = GeneratorOptions {
            base_class: "django.test.TestCase".into(),
            ..GeneratorOptions::default()
        };
        let output = CodeGenerator::new(&tree, options).generate().unwrap();
        assert!(output.contains("import unittest\nimport django.test\n"));
        assert!(output.contains("class TestA(django.test.TestCase):"));
    }

    #[test]
    fn duplicate_test_names_are_renamed() {
        let tree = parse("describe \"A\":\n    it \"x\": pass\n    it \"X\": pass\n").unwrap();
        let output = generate(&tree).unwrap();
        assert!(output.contains("def test_x(self):"));
        assert!(output.contains("def test_x_2(self):"));
    }
}
