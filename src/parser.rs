//! Carinata block parser.
//!
//! Turns spec-file text into a [`SpecTree`]. Header lines open blocks and the indentation of
//! each header decides which open block it belongs to; every other non-blank line is code for
//! the most recently opened block. Embedded code is never looked at beyond its indentation.

use once_cell::sync::Lazy;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use regex::{Captures, Regex};

use crate::ast::{Block, BlockId, BlockKind, CodeLine, SpecTree};
use crate::errors::{CarinataError, ErrorReporting, SourceContext, SpecContext};
use crate::naming::{is_identifier, snakify};

// Seedable so that a given input always produces the same suffixes.
type SuffixRng = Xoshiro256StarStar;

/// `<indent><keyword>[ (]["]label["][ (args)][)]: [inline code]`
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<indent>\s*)(?P<keyword>describe|context|before|after|let|it)[\s(]"?(?P<label>[^"]*?)"?(?P<args>\s?\([^)]*\))?\)?:\s?(?P<rest>.*)$"#,
    )
    .expect("header pattern is valid")
});

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses spec text with entropy-seeded before/after suffixes.
pub fn parse(source: &str) -> Result<SpecTree, CarinataError> {
    BlockParser::new(SourceContext::anonymous(source)).parse()
}

/// Parses a named spec source with suffixes drawn from `seed`.
pub fn parse_seeded(source: SourceContext, seed: [u8; 32]) -> Result<SpecTree, CarinataError> {
    BlockParser::with_seed(source, seed).parse()
}

/// A header line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub indent: usize,
    pub kind: BlockKind,
    pub label: &'a str,
    /// Extra test method parameters, without the parentheses.
    pub args: Option<&'a str>,
    pub inline_code: Option<&'a str>,
}

/// Matches `line` against the header grammar.
pub fn match_header(line: &str) -> Option<Header<'_>> {
    let caps = HEADER.captures(line)?;
    header_from_captures(&caps)
}

fn header_from_captures<'a>(caps: &Captures<'a>) -> Option<Header<'a>> {
    let kind = BlockKind::from_keyword(caps.name("keyword")?.as_str())?;
    let indent = caps.name("indent").map_or(0, |m| m.as_str().chars().count());
    let label = caps.name("label").map_or("", |m| m.as_str());
    let args = caps
        .name("args")
        .map(|m| m.as_str().trim().trim_start_matches('(').trim_end_matches(')').trim())
        .filter(|args| !args.is_empty());
    let inline_code = caps
        .name("rest")
        .map(|m| m.as_str())
        .filter(|rest| !rest.trim().is_empty());
    Some(Header {
        indent,
        kind,
        label,
        args,
        inline_code,
    })
}

// ============================================================================
// PARSER
// ============================================================================

pub struct BlockParser {
    ctx: SpecContext,
    tree: SpecTree,
    current: BlockId,
    rng: SuffixRng,
    /// `@decorator` lines (and comments among them) waiting for the next header, as written.
    pending: Vec<CodeLine>,
}

impl BlockParser {
    pub fn new(source: SourceContext) -> Self {
        Self::with_rng(source, SuffixRng::from_entropy())
    }

    pub fn with_seed(source: SourceContext, seed: [u8; 32]) -> Self {
        Self::with_rng(source, SuffixRng::from_seed(seed))
    }

    fn with_rng(source: SourceContext, rng: SuffixRng) -> Self {
        Self {
            ctx: SpecContext::new(source, "parse"),
            tree: SpecTree::new(),
            current: SpecTree::ROOT,
            rng,
            pending: Vec::new(),
        }
    }

    /// Consumes the parser and builds the tree. The first structural error aborts.
    pub fn parse(mut self) -> Result<SpecTree, CarinataError> {
        let content = self.ctx.source.content.clone();
        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            match match_header(line) {
                Some(header) => self.open_block(line_number, header)?,
                None if is_decorator(line) || (is_comment(line) && !self.pending.is_empty()) => {
                    self.pending.push(CodeLine {
                        line: line_number,
                        text: line.to_string(),
                    })
                }
                None => {
                    self.flush_pending();
                    self.tree.push_code(self.current, line_number, line);
                }
            }
        }
        self.flush_pending();
        tracing::trace!(blocks = self.tree.len(), source = %self.ctx.source.name, "parsed spec");
        Ok(self.tree)
    }

    fn open_block(&mut self, line: usize, header: Header<'_>) -> Result<(), CarinataError> {
        let indent = header.indent as isize;
        let parent = self.scope_for(indent);
        let parent_kind = self.tree.get(parent).kind;
        if !parent_kind.accepts(header.kind) {
            return Err(self
                .ctx
                .invalid_nesting(parent_kind, header.kind, line, header.indent));
        }
        if header.kind == BlockKind::Let && !is_identifier(&snakify(header.label)) {
            return Err(self.ctx.invalid_label(header.label, line));
        }

        let mut block = Block::new(header.kind, indent, header.label, line);
        if header.kind.takes_suffix() {
            block.suffix = Some(self.next_suffix());
        }
        match header.args {
            Some(args) if header.kind == BlockKind::It => block.args = Some(args.to_string()),
            Some(args) => {
                tracing::warn!(kind = %header.kind, line, args, "parameters only apply to `it` blocks; ignored")
            }
            None => {}
        }
        block.decorators = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|pending| CodeLine {
                line: pending.line,
                text: pending.text.trim().to_string(),
            })
            .collect();
        let id = self.tree.attach(parent, block);
        if let Some(code) = header.inline_code {
            let code = if header.kind == BlockKind::Let && !is_return(code) {
                format!("return {}", code)
            } else {
                code.to_string()
            };
            self.tree.push_code(id, line, code);
        }
        tracing::trace!(kind = %header.kind, label = header.label, line, "opened block");

        self.current = id;
        Ok(())
    }

    /// The open block a header at `indent` belongs to.
    ///
    /// A block stays open only for headers indented strictly deeper than itself; the root
    /// never closes.
    fn scope_for(&self, indent: isize) -> BlockId {
        let mut node = self.current;
        while node != SpecTree::ROOT && self.tree.get(node).indent >= indent {
            node = self.tree.parent(node).unwrap_or(SpecTree::ROOT);
        }
        node
    }

    /// Decorator-looking lines that no header claimed are ordinary code after all.
    fn flush_pending(&mut self) {
        for pending in std::mem::take(&mut self.pending) {
            self.tree.push_code(self.current, pending.line, pending.text);
        }
    }

    fn next_suffix(&mut self) -> String {
        format!("_x{:06x}", self.rng.next_u32() & 0x00ff_ffff)
    }
}

fn is_decorator(line: &str) -> bool {
    line.trim_start().starts_with('@')
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_return(code: &str) -> bool {
    code == "return" || code.starts_with("return ") || code.starts_with("return(")
}
