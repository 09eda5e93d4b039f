// Proposal records: immutable, author-attributed change sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who requested a change. Drives commit attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub kind: ActorKind,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    #[default]
    Human,
    Agent,
}

/// Lifecycle of a proposal. Execution is the only state-changing
/// transition; validation is advisory and repeatable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Executed,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Rejected => "rejected",
        }
    }
}

/// One requested mutation against a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Set a dotted field path inside a block's machine record.
    UpdateYaml {
        anchor: String,
        path: String,
        value: Value,
        /// Optimistic compare: when present, the current value must equal it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_value: Option<Value>,
    },
    /// Insert a whole new block after an existing anchor.
    InsertBlock { after: String, block: NewBlock },
    /// Append an event-typed block after an existing anchor.
    AppendEvent { after: String, event: NewBlock },
    /// Replace a block's body text.
    UpdateBody { anchor: String, body: String },
}

impl Operation {
    /// Short tag for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateYaml { .. } => "update_yaml",
            Self::InsertBlock { .. } => "insert_block",
            Self::AppendEvent { .. } => "append_event",
            Self::UpdateBody { .. } => "update_body",
        }
    }

    /// The anchor this operation addresses (target or insert-after).
    pub fn anchor(&self) -> &str {
        match self {
            Self::UpdateYaml { anchor, .. } | Self::UpdateBody { anchor, .. } => anchor,
            Self::InsertBlock { after, .. } | Self::AppendEvent { after, .. } => after,
        }
    }
}

/// Payload for `insert_block` / `append_event`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBlock {
    pub anchor: String,
    pub heading: String,
    #[serde(default = "default_block_level")]
    pub level: u8,
    /// Machine payload; merged onto the defaults record when applied.
    #[serde(default)]
    pub machine: Map<String, Value>,
    #[serde(default)]
    pub body: String,
}

fn default_block_level() -> u8 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted change request. Created once; only its terminal status,
/// commit reference, and error detail ever change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub id: String,
    pub target_file: String,
    pub ops: Vec<Operation>,
    pub author: Actor,
    pub message: String,
    pub status: ProposalStatus,
    /// Commit reference attached when the proposal executes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    /// Failure detail attached when the proposal is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "_meta")]
    pub meta: ProposalMeta,
}
