// Executor: applies a pending proposal to its target document and
// commits the result as a single git transaction.
//
// The parse/apply/serialize/write/commit sequence is serialized per
// target path. Nothing is retried; any failure discards the working
// copy, restores the prior bytes, and marks the proposal rejected, so
// the on-disk document and the repository stay exactly as they were.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use folio_common::adl::{self, machine};
use folio_common::proposal::{NewBlock, Operation, Proposal, ProposalStatus};
use folio_common::types::{Block, Document, MACHINE_REQUIRED_FIELDS};
use folio_common::value::{get_path, set_path};

use crate::git::{commit_author, commit_message, CommandExecutor, GitWorker};
use crate::proposals::{ProposalStore, StoreError};
use crate::registry::DocumentTree;

/// Per-path mutual exclusion around the read-modify-write-commit
/// sequence. A table rather than one global lock, so writes to distinct
/// documents never queue behind each other.
pub struct LockTable {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn for_path(&self, path: &str) -> Arc<Mutex<()>> {
        let mut table = self.inner.lock().expect("lock table poisoned");
        Arc::clone(table.entry(path.to_string()).or_default())
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum ExecuteError {
    /// No such proposal.
    NotFound { id: String },
    /// The proposal is not pending; execution runs at most once.
    Conflict { id: String, status: ProposalStatus },
    /// The attempt failed and the proposal was marked rejected.
    Rejected { id: String, reason: String },
    /// Store bookkeeping failed; the caller should inspect the record.
    Store(StoreError),
}

impl Display for ExecuteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "proposal `{id}` not found"),
            Self::Conflict { id, status } => {
                write!(f, "proposal `{id}` is already {}", status.as_str())
            }
            Self::Rejected { id, reason } => write!(f, "proposal `{id}` rejected: {reason}"),
            Self::Store(error) => write!(f, "{error}"),
        }
    }
}

impl Error for ExecuteError {}

/// Outcome of a successful execution.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Executed {
    pub commit_id: String,
}

pub struct Executor<'a, E: CommandExecutor> {
    pub tree: &'a dyn DocumentTree,
    pub git: &'a GitWorker<E>,
    pub store: &'a ProposalStore,
    pub locks: &'a LockTable,
}

impl<'a, E: CommandExecutor> Executor<'a, E> {
    /// Execute a pending proposal. At most once per proposal: a
    /// non-pending record yields a conflict, never a retry.
    pub fn execute(&self, id: &str) -> Result<Executed, ExecuteError> {
        let proposal = self.fetch_pending(id)?;

        let path_lock = self.locks.for_path(&proposal.target_file);
        let _guard = path_lock.lock().expect("path lock poisoned");

        // Re-check under the lock: a concurrent execution may have won.
        let proposal = self.fetch_pending(id)?;

        let prior = match self.tree.read(&proposal.target_file) {
            Ok(Some(text)) => text,
            Ok(None) => {
                return self.reject(
                    &proposal,
                    format!("target file `{}` does not exist", proposal.target_file),
                );
            }
            Err(error) => return self.reject(&proposal, format!("read failed: {error}")),
        };

        // Apply against an in-memory working copy; the persisted file is
        // untouched until every operation has succeeded.
        let mut working = adl::parse(&prior, &proposal.target_file);
        for (index, op) in proposal.ops.iter().enumerate() {
            if let Err(reason) = apply_operation(&mut working, op) {
                return self.reject(
                    &proposal,
                    format!("op {index} ({}): {reason}", op.kind()),
                );
            }
        }
        let rendered = adl::serialize(&working);

        if let Err(error) = self.tree.write(&proposal.target_file, &rendered) {
            self.restore(&proposal, &prior, false);
            return self.reject(&proposal, format!("write failed: {error}"));
        }

        if let Err(error) = self.git.add(&[proposal.target_file.as_str()]) {
            self.restore(&proposal, &prior, false);
            return self.reject(&proposal, format!("stage failed: {error}"));
        }

        let (author_name, author_email) = commit_author(&proposal.author);
        let message = commit_message(&proposal);
        let commit_id = match self.git.commit_as(&author_name, &author_email, &message) {
            Ok(commit_id) => commit_id,
            Err(error) => {
                self.restore(&proposal, &prior, true);
                return self.reject(&proposal, format!("commit failed: {error}"));
            }
        };

        let executed = self
            .store
            .mark_executed(id, &commit_id)
            .map_err(ExecuteError::Store)?;
        info!(
            proposal = %executed.id,
            commit = %commit_id,
            target = %executed.target_file,
            "proposal executed"
        );
        Ok(Executed { commit_id })
    }

    fn fetch_pending(&self, id: &str) -> Result<Proposal, ExecuteError> {
        let proposal = self
            .store
            .get(id)
            .map_err(ExecuteError::Store)?
            .ok_or_else(|| ExecuteError::NotFound { id: id.to_string() })?;
        if proposal.status != ProposalStatus::Pending {
            return Err(ExecuteError::Conflict { id: id.to_string(), status: proposal.status });
        }
        Ok(proposal)
    }

    /// Put the prior bytes back after a failed attempt. With `restage`,
    /// also re-add the restored content so the git index holds no trace
    /// of the discarded working copy.
    fn restore(&self, proposal: &Proposal, prior: &str, restage: bool) {
        if let Err(error) = self.tree.write(&proposal.target_file, prior) {
            warn!(
                proposal = %proposal.id,
                %error,
                "failed to restore prior document content"
            );
            return;
        }
        if restage {
            if let Err(error) = self.git.add(&[proposal.target_file.as_str()]) {
                warn!(proposal = %proposal.id, %error, "failed to restage restored content");
            }
        }
    }

    fn reject(&self, proposal: &Proposal, reason: String) -> Result<Executed, ExecuteError> {
        if let Err(error) = self.store.mark_rejected(&proposal.id, &reason) {
            warn!(proposal = %proposal.id, %error, "failed to record rejection");
        }
        Err(ExecuteError::Rejected { id: proposal.id.clone(), reason })
    }
}

/// Apply one operation to the working copy, using the same anchor and
/// field-path resolution as the validator.
fn apply_operation(document: &mut Document, op: &Operation) -> Result<(), String> {
    match op {
        Operation::UpdateYaml { anchor, path, value, old_value } => {
            let block = document
                .block_mut(anchor)
                .ok_or_else(|| format!("anchor `{anchor}` does not exist"))?;

            if MACHINE_REQUIRED_FIELDS.contains(&path.as_str()) && is_null_or_empty(value) {
                return Err(format!("required field `{path}` may not be set to null/empty"));
            }

            let mut record = machine::to_value(&block.machine);
            if let Some(expected) = old_value {
                let current = get_path(&record, path);
                if current != Some(expected) {
                    return Err(format!("field `{path}` no longer holds the expected value"));
                }
            }
            set_path(&mut record, path, value.clone()).map_err(|error| error.to_string())?;
            block.machine = machine::from_value(&record);
            Ok(())
        }

        Operation::InsertBlock { after, block } => {
            let position = document
                .block_position(after)
                .ok_or_else(|| format!("anchor `{after}` does not exist"))?;
            document.blocks.insert(position + 1, materialize(block));
            Ok(())
        }

        Operation::AppendEvent { after, event } => {
            let position = document
                .block_position(after)
                .ok_or_else(|| format!("anchor `{after}` does not exist"))?;
            let block = materialize(event);
            if block.machine.kind != "event" {
                return Err(format!(
                    "appended record type must be `event`, got `{}`",
                    block.machine.kind
                ));
            }
            document.blocks.insert(position + 1, block);
            Ok(())
        }

        Operation::UpdateBody { anchor, body } => {
            let block = document
                .block_mut(anchor)
                .ok_or_else(|| format!("anchor `{anchor}` does not exist"))?;
            block.body = body.clone();
            Ok(())
        }
    }
}

fn materialize(payload: &NewBlock) -> Block {
    Block {
        anchor: payload.anchor.clone(),
        heading: payload.heading.clone(),
        level: payload.level.clamp(1, 6),
        machine: machine::overlay_defaults(Some(&Value::Object(payload.machine.clone()))),
        body: payload.body.clone(),
        start_line: 0,
        end_line: 0,
    }
}

fn is_null_or_empty(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(|text| text.trim().is_empty())
}
