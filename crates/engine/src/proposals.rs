// Proposal store: one JSON file per proposal under `.folio/proposals/`.
//
// Records are created once and never rewritten except to flip their
// terminal status. The store is the only component allowed to do that,
// and it refuses to flip anything twice.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::warn;

use folio_common::proposal::{Actor, Operation, Proposal, ProposalMeta, ProposalStatus};

#[derive(Debug)]
pub enum StoreError {
    NotFound { id: String },
    /// Terminal-status flip attempted on a non-pending proposal.
    Conflict { id: String, status: ProposalStatus },
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "proposal `{id}` not found"),
            Self::Conflict { id, status } => {
                write!(f, "proposal `{id}` is already {}", status.as_str())
            }
            Self::Io(error) => write!(f, "proposal store I/O error: {error}"),
            Self::Serde(error) => write!(f, "proposal record error: {error}"),
        }
    }
}

impl Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serde(error)
    }
}

/// Process-local sequence guaranteeing monotonic ids within a process.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Timestamp-derived proposal id: `p-<unix-millis>-<seq>`.
pub fn next_proposal_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0);
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("p-{millis}-{seq:04}")
}

fn is_valid_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("p-") else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit() || ch == '-')
}

pub struct ProposalStore {
    dir: PathBuf,
}

impl ProposalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist a new pending proposal and return the stored record.
    pub fn create(
        &self,
        target_file: &str,
        ops: Vec<Operation>,
        author: Actor,
        message: &str,
    ) -> Result<Proposal, StoreError> {
        let now = Utc::now();
        let proposal = Proposal {
            id: next_proposal_id(),
            target_file: target_file.to_string(),
            ops,
            author,
            message: message.to_string(),
            status: ProposalStatus::Pending,
            commit_id: None,
            error: None,
            meta: ProposalMeta { created_at: now, updated_at: now },
        };
        self.persist(&proposal)?;
        Ok(proposal)
    }

    pub fn get(&self, id: &str) -> Result<Option<Proposal>, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// All proposals sorted by id (and therefore by creation time).
    pub fn list(&self) -> Result<Vec<Proposal>, StoreError> {
        let mut proposals = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<Proposal>(&raw) {
                Ok(proposal) => proposals.push(proposal),
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable proposal record");
                }
            }
        }
        proposals.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(proposals)
    }

    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Flip a pending proposal to `executed`, attaching the commit it
    /// produced.
    pub fn mark_executed(&self, id: &str, commit_id: &str) -> Result<Proposal, StoreError> {
        self.finalize(id, |proposal| {
            proposal.status = ProposalStatus::Executed;
            proposal.commit_id = Some(commit_id.to_string());
        })
    }

    /// Flip a pending proposal to `rejected`, preserving the failure
    /// detail for operator visibility.
    pub fn mark_rejected(&self, id: &str, error: &str) -> Result<Proposal, StoreError> {
        self.finalize(id, |proposal| {
            proposal.status = ProposalStatus::Rejected;
            proposal.error = Some(error.to_string());
        })
    }

    fn finalize(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Proposal),
    ) -> Result<Proposal, StoreError> {
        let mut proposal = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if proposal.status != ProposalStatus::Pending {
            return Err(StoreError::Conflict { id: id.to_string(), status: proposal.status });
        }
        apply(&mut proposal);
        proposal.meta.updated_at = Utc::now();
        self.persist(&proposal)?;
        Ok(proposal)
    }

    fn persist(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let path = self.dir.join(format!("{}.json", proposal.id));
        let mut raw = serde_json::to_string_pretty(proposal)?;
        raw.push('\n');
        fs::write(path, raw)?;
        Ok(())
    }

    /// Record path for a well-formed id; malformed ids never touch disk.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        if !is_valid_id(id) {
            return None;
        }
        Some(self.dir.join(format!("{id}.json")))
    }
}
