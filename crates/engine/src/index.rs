// Workspace index: cached catalogue of documents, blocks and anchors.
//
// A rebuild scans the whole tree through the registry, then atomically
// installs both the snapshot and the registry's existence catalogue.
// Between rebuilds the snapshot is read-only; staleness is a cheap
// comparison against the version-control head recorded at build time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use folio_common::adl;

use crate::registry::DocumentTree;

/// Summary metadata for one document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub path: String,
    /// Front-matter `type` key, when declared.
    pub declared_type: Option<String>,
    pub block_count: usize,
    /// Distinct anchors in document order.
    pub anchors: Vec<String>,
    /// SHA-256 of the document text at index time.
    pub content_hash: String,
}

/// Aggregate counts across the managed tree.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IndexTotals {
    pub document_count: usize,
    pub block_count: usize,
    pub anchor_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexSnapshot {
    pub documents: BTreeMap<String, DocumentSummary>,
    pub totals: IndexTotals,
    /// Version-control head at the time of the rebuild.
    pub head: Option<String>,
    pub built_at: DateTime<Utc>,
}

pub struct WorkspaceIndex {
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl WorkspaceIndex {
    pub fn empty() -> Self {
        Self { snapshot: RwLock::new(None) }
    }

    /// Full scan and parse of the managed tree. The new snapshot and the
    /// registry catalogue are installed only once the scan completes, so
    /// concurrent readers keep the previous consistent view throughout.
    pub fn rebuild(
        &self,
        tree: &dyn DocumentTree,
        head: Option<String>,
    ) -> Result<Arc<IndexSnapshot>> {
        let paths = tree.scan()?;

        let mut documents = BTreeMap::new();
        for path in &paths {
            let Some(text) = tree.read(path)? else {
                continue;
            };
            documents.insert(path.clone(), summarize(path, &text));
        }

        let totals = totals_of(&documents);
        let snapshot = Arc::new(IndexSnapshot {
            documents,
            totals,
            head,
            built_at: Utc::now(),
        });

        tree.install_catalog(snapshot.documents.keys().cloned().collect::<BTreeSet<_>>());
        *self.snapshot.write().expect("index lock poisoned") = Some(Arc::clone(&snapshot));
        info!(
            documents = totals.document_count,
            blocks = totals.block_count,
            anchors = totals.anchor_count,
            "workspace index rebuilt"
        );
        Ok(snapshot)
    }

    /// Refresh one document's entry after an executor commit, keeping the
    /// rest of the snapshot untouched.
    pub fn update_document(&self, path: &str, text: &str, head: Option<String>) {
        let mut guard = self.snapshot.write().expect("index lock poisoned");
        let Some(previous) = guard.as_ref() else {
            return;
        };

        let mut documents = previous.documents.clone();
        documents.insert(path.to_string(), summarize(path, text));
        let totals = totals_of(&documents);
        *guard = Some(Arc::new(IndexSnapshot {
            documents,
            totals,
            head: head.or_else(|| previous.head.clone()),
            built_at: previous.built_at,
        }));
        debug!(%path, "index entry refreshed");
    }

    /// The current snapshot, if any rebuild has completed.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot.read().expect("index lock poisoned").clone()
    }

    /// Cheap staleness probe: does the recorded head differ from the
    /// current one? An index that never built is always stale.
    pub fn is_stale(&self, current_head: Option<&str>) -> bool {
        match self.snapshot() {
            None => true,
            Some(snapshot) => snapshot.head.as_deref() != current_head,
        }
    }
}

fn summarize(path: &str, text: &str) -> DocumentSummary {
    let document = adl::parse(text, path);

    let mut seen = BTreeSet::new();
    let mut anchors = Vec::new();
    for block in &document.blocks {
        if seen.insert(block.anchor.clone()) {
            anchors.push(block.anchor.clone());
        }
    }

    DocumentSummary {
        path: path.to_string(),
        declared_type: document
            .front_matter
            .get("type")
            .and_then(|value| value.as_str())
            .map(str::to_string),
        block_count: document.blocks.len(),
        anchors,
        content_hash: hex_digest(text),
    }
}

fn totals_of(documents: &BTreeMap<String, DocumentSummary>) -> IndexTotals {
    IndexTotals {
        document_count: documents.len(),
        block_count: documents.values().map(|doc| doc.block_count).sum(),
        anchor_count: documents.values().map(|doc| doc.anchors.len()).sum(),
    }
}

fn hex_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
