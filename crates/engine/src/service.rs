// Service facade: the API-level operations the outer layers call.
//
// Thin composition over the registry, proposal store, validator,
// executor, index, and git worker. The HTTP layer (out of tree) owns
// request/response shapes; the contracts here are the fixed ones.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use folio_common::proposal::{Actor, Operation, Proposal};

use crate::config::{PushPolicy, WorkspaceConfig};
use crate::executor::{Executed, ExecuteError, Executor, LockTable};
use crate::git::{GitWorker, ProcessCommandExecutor};
use crate::index::{IndexSnapshot, IndexTotals, WorkspaceIndex};
use crate::mirror::{self, MirrorHandle};
use crate::proposals::ProposalStore;
use crate::registry::{DocumentTree, PathRegistry};
use crate::validate::{self, ValidationReport};

pub struct Engine {
    registry: PathRegistry,
    store: ProposalStore,
    index: WorkspaceIndex,
    git: GitWorker<ProcessCommandExecutor>,
    config: WorkspaceConfig,
    locks: LockTable,
}

impl Engine {
    /// Open an engine over a managed root. The root must exist and be a
    /// git working directory for execution to succeed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let registry = PathRegistry::open(root)?;
        let config = WorkspaceConfig::load(registry.root());
        let store = ProposalStore::new(registry.root().join(".folio").join("proposals"))
            .context("failed to open proposal store")?;
        let git = GitWorker::new(registry.root());
        Ok(Self {
            registry,
            store,
            index: WorkspaceIndex::empty(),
            git,
            config,
            locks: LockTable::new(),
        })
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn store(&self) -> &ProposalStore {
        &self.store
    }

    /// The registry as the abstract gateway; callers never get the raw
    /// root for document access.
    pub fn tree(&self) -> &dyn DocumentTree {
        &self.registry
    }

    // ── proposals ───────────────────────────────────────────────────

    /// Create a pending proposal. Creation is unconditional; call
    /// [`Engine::validate`] for the advisory check.
    pub fn create_proposal(
        &self,
        target_file: &str,
        ops: Vec<Operation>,
        author: Actor,
        reason: &str,
    ) -> Result<Proposal> {
        let proposal = self
            .store
            .create(target_file, ops, author, reason)
            .context("failed to persist proposal")?;
        info!(proposal = %proposal.id, target = %proposal.target_file, "proposal created");
        Ok(proposal)
    }

    /// Validate a stored proposal against the live document. Pure and
    /// repeatable; `Ok(None)` when the proposal does not exist.
    pub fn validate(&self, id: &str) -> Result<Option<ValidationReport>> {
        let Some(proposal) = self.store.get(id).map_err(anyhow::Error::from)? else {
            return Ok(None);
        };
        validate::validate(&self.registry, &proposal).map(Some)
    }

    /// Execute a pending proposal: apply, serialize, write, commit.
    pub fn execute(&self, id: &str) -> Result<Executed, ExecuteError> {
        let executor = Executor {
            tree: &self.registry,
            git: &self.git,
            store: &self.store,
            locks: &self.locks,
        };
        let executed = executor.execute(id)?;

        // Incremental index refresh for the one touched document.
        if let Ok(Some(proposal)) = self.store.get(id) {
            match self.registry.read(&proposal.target_file) {
                Ok(Some(text)) => self.index.update_document(
                    &proposal.target_file,
                    &text,
                    Some(executed.commit_id.clone()),
                ),
                Ok(None) => {}
                Err(error) => {
                    warn!(proposal = %id, %error, "index refresh skipped")
                }
            }
        }

        if self.config.git.push_policy == PushPolicy::OnExecute {
            mirror::push_once(&self.git, &self.config.git.remote, &self.config.git.branch);
        }
        Ok(executed)
    }

    pub fn get_proposal(&self, id: &str) -> Result<Option<Proposal>> {
        self.store.get(id).map_err(anyhow::Error::from)
    }

    pub fn list_proposals(&self) -> Result<Vec<Proposal>> {
        self.store.list().map_err(anyhow::Error::from)
    }

    pub fn delete_proposal(&self, id: &str) -> Result<bool> {
        self.store.delete(id).map_err(anyhow::Error::from)
    }

    // ── paths and index ─────────────────────────────────────────────

    /// Resolve a logical path to its verified real location. Unsafe and
    /// missing paths are both `None`.
    pub fn resolve(&self, logical: &str) -> Option<PathBuf> {
        self.registry.resolve(logical)
    }

    /// Full index rebuild: scan, parse, install catalogue and snapshot.
    pub fn rebuild_index(&self) -> Result<IndexTotals> {
        let head = self.git.head().unwrap_or_else(|error| {
            warn!(%error, "could not read git head for index");
            None
        });
        let snapshot = self.index.rebuild(&self.registry, head)?;
        Ok(snapshot.totals)
    }

    pub fn index_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.index.snapshot()
    }

    /// Is the cached index behind the current git head?
    pub fn index_is_stale(&self) -> bool {
        let head = self.git.head().ok().flatten();
        self.index.is_stale(head.as_deref())
    }

    /// Start the periodic mirror loop when the workspace asks for one.
    /// Requires a running tokio runtime.
    pub fn spawn_mirror(&self) -> Option<MirrorHandle> {
        if self.config.git.push_policy != PushPolicy::Periodic {
            return None;
        }
        Some(mirror::spawn_periodic(
            self.git.clone(),
            self.config.git.remote.clone(),
            self.config.git.branch.clone(),
            Duration::from_secs(u64::from(self.config.git.push_interval_sec)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::process::Command;

    use folio_common::proposal::ActorKind;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const DOC: &str = "## Cat X {#cat-x}\n\n```adl\ntype: category\nid: c-1\nstatus: active\ntitle: Cat X\n```\n\nBody.\n";

    fn git(root: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .expect("git should be runnable");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// A real git repository seeded with one document and one commit.
    fn seeded_repo() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("genesis")).unwrap();
        fs::write(root.join("genesis/example.md"), DOC).unwrap();

        git(root, &["init", "--quiet"]);
        git(root, &["config", "user.name", "seed"]);
        git(root, &["config", "user.email", "seed@example.com"]);
        git(root, &["add", "."]);
        git(root, &["commit", "--quiet", "-m", "seed"]);

        let engine = Engine::open(root).unwrap();
        (dir, engine)
    }

    fn author() -> Actor {
        Actor { name: "dana".to_string(), email: None, kind: ActorKind::Human }
    }

    fn demote_op() -> Operation {
        Operation::UpdateYaml {
            anchor: "cat-x".to_string(),
            path: "status".to_string(),
            value: json!("draft"),
            old_value: Some(json!("active")),
        }
    }

    #[test]
    fn propose_validate_execute_scenario() {
        let (dir, engine) = seeded_repo();

        let proposal = engine
            .create_proposal("genesis/example.md", vec![demote_op()], author(), "demote cat-x")
            .unwrap();

        // Validates clean.
        let report = engine.validate(&proposal.id).unwrap().expect("proposal exists");
        assert!(report.valid, "unexpected errors: {:?}", report.errors);

        // Executes and commits.
        let executed = engine.execute(&proposal.id).expect("execution should succeed");
        assert!(!executed.commit_id.is_empty());

        // The commit message embeds the proposal id.
        let output = Command::new("git")
            .args(["log", "-1", "--format=%B%n%an"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        let log = String::from_utf8_lossy(&output.stdout).into_owned();
        assert!(log.contains(&proposal.id), "commit message should cite the proposal: {log}");
        assert!(log.contains("dana"), "author derived from the actor: {log}");

        // Re-parsing the document shows the new status.
        let text = fs::read_to_string(dir.path().join("genesis/example.md")).unwrap();
        let doc = folio_common::adl::parse(&text, "genesis/example.md");
        assert_eq!(doc.block("cat-x").unwrap().machine.status, "draft");

        // Executing again is a conflict, not a retry.
        assert!(matches!(
            engine.execute(&proposal.id).unwrap_err(),
            ExecuteError::Conflict { .. }
        ));
    }

    #[test]
    fn rejected_validation_does_not_change_status() {
        let (_dir, engine) = seeded_repo();
        let proposal = engine
            .create_proposal(
                "genesis/example.md",
                vec![Operation::UpdateBody { anchor: "ghost".into(), body: "x".into() }],
                author(),
                "bad anchor",
            )
            .unwrap();

        let report = engine.validate(&proposal.id).unwrap().unwrap();
        assert!(!report.valid);

        // Validation is advisory: the proposal stays pending and a second
        // run returns the identical report.
        let stored = engine.get_proposal(&proposal.id).unwrap().unwrap();
        assert_eq!(stored.status, folio_common::proposal::ProposalStatus::Pending);
        assert_eq!(engine.validate(&proposal.id).unwrap().unwrap(), report);
    }

    #[test]
    fn validate_unknown_proposal_is_none() {
        let (_dir, engine) = seeded_repo();
        assert!(engine.validate("p-1-0000").unwrap().is_none());
    }

    #[test]
    fn resolve_rejects_traversal_and_absolute_paths() {
        let (_dir, engine) = seeded_repo();
        assert!(engine.resolve("genesis/example.md").is_some());
        assert!(engine.resolve("../etc/passwd").is_none());
        assert!(engine.resolve("/etc/passwd").is_none());
    }

    #[test]
    fn rebuild_index_counts_and_tracks_head() {
        let (_dir, engine) = seeded_repo();

        let totals = engine.rebuild_index().unwrap();
        assert_eq!(totals.document_count, 1);
        assert_eq!(totals.block_count, 1);
        assert_eq!(totals.anchor_count, 1);
        assert!(!engine.index_is_stale(), "fresh rebuild matches the head");

        // A new commit makes the index stale; execution refreshes it.
        let proposal = engine
            .create_proposal("genesis/example.md", vec![demote_op()], author(), "demote")
            .unwrap();
        engine.execute(&proposal.id).unwrap();
        assert!(!engine.index_is_stale(), "incremental refresh keeps the head current");

        let snapshot = engine.index_snapshot().unwrap();
        assert_eq!(snapshot.documents["genesis/example.md"].block_count, 1);
    }

    #[test]
    fn execute_failure_leaves_repository_clean() {
        let (dir, engine) = seeded_repo();
        let proposal = engine
            .create_proposal(
                "genesis/example.md",
                vec![Operation::UpdateYaml {
                    anchor: "cat-x".into(),
                    path: "status".into(),
                    value: json!("draft"),
                    old_value: Some(json!("archived")),
                }],
                author(),
                "stale",
            )
            .unwrap();

        let error = engine.execute(&proposal.id).unwrap_err();
        assert!(matches!(error, ExecuteError::Rejected { .. }));

        // Document untouched, no new commit.
        let text = fs::read_to_string(dir.path().join("genesis/example.md")).unwrap();
        assert_eq!(text, DOC);
        let output = Command::new("git")
            .args(["rev-list", "--count", "HEAD"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1");
    }

    #[test]
    fn spawn_mirror_is_none_unless_periodic() {
        let (_dir, engine) = seeded_repo();
        assert!(engine.spawn_mirror().is_none());
    }
}
