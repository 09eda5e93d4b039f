// `folio propose` — create a pending proposal.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use folio_common::proposal::{Actor, ActorKind, Operation};
use folio_engine::config::GlobalConfig;
use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ProposeArgs {
    /// Target document (logical path inside the managed tree).
    #[arg(long)]
    file: String,

    /// Operations as a JSON array, inline or `@path` to read a file.
    #[arg(long)]
    ops: String,

    /// Author name (defaults to the global config identity).
    #[arg(long)]
    author: Option<String>,

    /// Author email for commit attribution.
    #[arg(long)]
    email: Option<String>,

    /// Mark the author as an automated agent.
    #[arg(long)]
    agent: bool,

    /// Reason recorded on the proposal; becomes the commit subject.
    #[arg(long)]
    reason: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ProposeArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let ops = parse_ops(&args.ops)?;
    let actor = resolve_actor(args.author, args.email, args.agent);

    let engine = Engine::open(&args.root)?;
    match engine.create_proposal(&args.file, ops, actor, &args.reason) {
        Ok(proposal) => {
            output::print_output(format, &proposal, |p| {
                format!("Created {} ({} op(s) against {})", p.id, p.ops.len(), p.target_file)
            })?;
            Ok(())
        }
        Err(error) => {
            output::print_error(format, "PROPOSE_FAILED", &format!("{error:#}"));
            Err(error)
        }
    }
}

/// Parse the `--ops` argument: a JSON array, or `@file` holding one.
fn parse_ops(raw: &str) -> anyhow::Result<Vec<Operation>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ops file `{path}`"))?,
        None => raw.to_string(),
    };
    let ops: Vec<Operation> =
        serde_json::from_str(&text).context("ops must be a JSON array of operations")?;
    anyhow::ensure!(!ops.is_empty(), "a proposal needs at least one operation");
    Ok(ops)
}

fn resolve_actor(name: Option<String>, email: Option<String>, agent: bool) -> Actor {
    let defaults = GlobalConfig::load().default_actor();
    Actor {
        name: name.unwrap_or(defaults.name),
        email: email.or(defaults.email),
        kind: if agent { ActorKind::Agent } else { defaults.kind },
    }
}
