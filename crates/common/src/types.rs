// Core domain types shared across all folio crates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parsed ADL document: front-matter plus an ordered sequence of blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Logical path within the managed tree, e.g. `genesis/example.md`.
    pub path: String,
    /// Front-matter mapping. Empty when the document has none or it is
    /// malformed; the parser degrades, it never fails.
    #[serde(default)]
    pub front_matter: Map<String, Value>,
    /// Free text between the front-matter and the first anchored heading.
    #[serde(default)]
    pub preamble: String,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Look up a block by anchor.
    ///
    /// Duplicate anchors are kept in document order; lookup returns the
    /// last matching block (last-write-wins within a single parse).
    pub fn block(&self, anchor: &str) -> Option<&Block> {
        self.blocks.iter().rev().find(|block| block.anchor == anchor)
    }

    /// Mutable variant of [`Document::block`]. Same last-write-wins rule.
    pub fn block_mut(&mut self, anchor: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().rev().find(|block| block.anchor == anchor)
    }

    /// Position of the last block with this anchor, if any.
    pub fn block_position(&self, anchor: &str) -> Option<usize> {
        self.blocks.iter().rposition(|block| block.anchor == anchor)
    }

    /// Anchors in document order, duplicates included.
    pub fn anchors(&self) -> Vec<String> {
        self.blocks.iter().map(|block| block.anchor.clone()).collect()
    }
}

/// The atomic addressable unit inside a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    /// Stable identifier, unique within the document, `[A-Za-z0-9_-]+`.
    pub anchor: String,
    /// Display text of the heading line.
    pub heading: String,
    /// Heading depth (1-6).
    pub level: u8,
    /// The block's machine-readable record.
    pub machine: MachineRecord,
    /// Free text, separator lines removed and blank edges trimmed.
    pub body: String,
    /// Start line in the source text (1-based).
    pub start_line: u32,
    /// End line in the source text (1-based, exclusive).
    pub end_line: u32,
}

/// Required machine-record fields and their parse-time defaults.
pub const MACHINE_REQUIRED_FIELDS: [&str; 3] = ["type", "id", "status"];

/// Default status back-filled when a block's payload omits it.
pub const DEFAULT_STATUS: &str = "draft";

/// A block's structured record: four required fields plus arbitrary extras.
///
/// Built by overlaying the parsed fence payload onto the defaults record
/// (`type: "", id: "", status: "draft", title: ""`), so the required
/// fields are plain `String`s after parsing, never absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub status: String,
    pub title: String,
    /// Every payload key other than the required four, in source order.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Default for MachineRecord {
    fn default() -> Self {
        Self {
            kind: String::new(),
            id: String::new(),
            status: DEFAULT_STATUS.to_string(),
            title: String::new(),
            extra: Map::new(),
        }
    }
}
