//! Block tree for carinata spec files.
//!
//! The tree is an arena: every [`Block`] lives in [`SpecTree::blocks`] and refers to its parent
//! and children by [`BlockId`]. Block 0 is always the synthetic file root.

use std::fmt;

use serde::Serialize;

/// The kinds of block a spec file can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Synthetic root of a spec file
    Group,
    Describe,
    Context,
    Before,
    After,
    Let,
    It,
}

const GROUP_CHILDREN: &[BlockKind] = &[BlockKind::Describe];
const DESCRIBE_CHILDREN: &[BlockKind] = &[
    BlockKind::Describe,
    BlockKind::Context,
    BlockKind::Before,
    BlockKind::After,
    BlockKind::Let,
    BlockKind::It,
];
const CONTEXT_CHILDREN: &[BlockKind] = &[
    BlockKind::Context,
    BlockKind::Before,
    BlockKind::After,
    BlockKind::Let,
    BlockKind::It,
];

impl BlockKind {
    /// Looks up the keyword that opens a block of this kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "describe" => Some(Self::Describe),
            "context" => Some(Self::Context),
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            "let" => Some(Self::Let),
            "it" => Some(Self::It),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Group => "file",
            Self::Describe => "describe",
            Self::Context => "context",
            Self::Before => "before",
            Self::After => "after",
            Self::Let => "let",
            Self::It => "it",
        }
    }

    /// Kinds that may be nested directly inside this one.
    pub fn valid_children(&self) -> &'static [BlockKind] {
        match self {
            Self::Group => GROUP_CHILDREN,
            Self::Describe => DESCRIBE_CHILDREN,
            Self::Context => CONTEXT_CHILDREN,
            Self::Before | Self::After | Self::Let | Self::It => &[],
        }
    }

    pub fn accepts(&self, child: BlockKind) -> bool {
        self.valid_children().contains(&child)
    }

    /// Describe and context blocks give their names to generated classes.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Describe | Self::Context)
    }

    /// Before and after blocks carry a random suffix so repeats never collide.
    pub fn takes_suffix(&self) -> bool {
        matches!(self, Self::Before | Self::After)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Index of a block inside its [`SpecTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BlockId(pub usize);

/// One raw line of embedded code, with its 1-based source line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeLine {
    pub line: usize,
    pub text: String,
}

/// A single spec construct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Column count of the header's leading whitespace; -1 for the root.
    pub indent: isize,
    pub label: String,
    /// Disambiguating token for before/after blocks, e.g. `_x3fa9c1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Header line number; 0 for the root.
    pub line: usize,
    /// Extra parameters of a test method, e.g. `mock_open` from `it "reads" (mock_open):`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    /// `@decorator` lines written directly above the header, stripped of indentation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<CodeLine>,
    /// Code lines as written, inline code first. Not yet dedented.
    pub body: Vec<CodeLine>,
    pub children: Vec<BlockId>,
    #[serde(skip)]
    pub parent: Option<BlockId>,
}

impl Block {
    pub fn new(kind: BlockKind, indent: isize, label: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            indent,
            label: label.into(),
            suffix: None,
            line,
            args: None,
            decorators: Vec::new(),
            body: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// The synthetic root every spec file hangs from.
    pub fn root() -> Self {
        Self::new(BlockKind::Group, -1, "", 0)
    }

    /// Label with the disambiguating suffix appended, if any.
    pub fn unique_label(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}{}", self.label, suffix),
            None => self.label.clone(),
        }
    }

    pub fn has_code(&self) -> bool {
        !self.body.is_empty()
    }
}

/// A parsed spec file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecTree {
    pub blocks: Vec<Block>,
}

impl Default for SpecTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecTree {
    pub const ROOT: BlockId = BlockId(0);

    pub fn new() -> Self {
        Self {
            blocks: vec![Block::root()],
        }
    }

    pub fn root(&self) -> &Block {
        &self.blocks[Self::ROOT.0]
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when the file has no blocks besides the root.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() == 1
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).parent
    }

    pub fn children(&self, id: BlockId) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.get(id)
            .children
            .iter()
            .map(move |&child| (child, self.get(child)))
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: BlockId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Appends `block` under `parent` without checking the nesting table.
    ///
    /// The parser validates nesting before calling this.
    pub(crate) fn attach(&mut self, parent: BlockId, mut block: Block) -> BlockId {
        let id = BlockId(self.blocks.len());
        block.parent = Some(parent);
        self.blocks.push(block);
        self.get_mut(parent).children.push(id);
        id
    }

    pub(crate) fn push_code(&mut self, id: BlockId, line: usize, text: impl Into<String>) {
        self.get_mut(id).body.push(CodeLine {
            line,
            text: text.into(),
        });
    }

    /// Renders the tree as indented text, one block per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(Self::ROOT, 0, &mut out);
        out
    }

    fn pretty_into(&self, id: BlockId, depth: usize, out: &mut String) {
        let block = self.get(id);
        if id != Self::ROOT {
            out.push_str(&"  ".repeat(depth - 1));
            out.push_str(&format!(
                "{} {:?} (line {}, {} code line{})\n",
                block.kind,
                block.unique_label(),
                block.line,
                block.body.len(),
                if block.body.len() == 1 { "" } else { "s" }
            ));
        }
        for &child in &block.children {
            self.pretty_into(child, depth + 1, out);
        }
    }
}

/// Iterator over the ancestors of a block. See [`SpecTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a SpecTree,
    next: Option<BlockId>,
}

impl Iterator for Ancestors<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_table() {
        assert!(BlockKind::Group.accepts(BlockKind::Describe));
        assert!(!BlockKind::Group.accepts(BlockKind::Context));
        assert!(BlockKind::Describe.accepts(BlockKind::Describe));
        assert!(!BlockKind::Context.accepts(BlockKind::Describe));
        assert!(BlockKind::Context.accepts(BlockKind::After));
        assert!(BlockKind::It.valid_children().is_empty());
    }

    #[test]
    fn ancestors_walk_to_root() {
        let mut tree = SpecTree::new();
        let outer = tree.attach(SpecTree::ROOT, Block::new(BlockKind::Describe, 0, "A", 1));
        let inner = tree.attach(outer, Block::new(BlockKind::Context, 4, "B", 2));
        let leaf = tree.attach(inner, Block::new(BlockKind::It, 8, "c", 3));

        let chain: Vec<BlockId> = tree.ancestors(leaf).collect();
        assert_eq!(chain, vec![inner, outer, SpecTree::ROOT]);
        assert!(tree.ancestors(SpecTree::ROOT).next().is_none());
    }

    #[test]
    fn unique_label_appends_suffix() {
        let mut block = Block::new(BlockKind::Before, 4, "connect", 2);
        assert_eq!(block.unique_label(), "connect");
        block.suffix = Some("_xabc123".into());
        assert_eq!(block.unique_label(), "connect_xabc123");
    }
}
