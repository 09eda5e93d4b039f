// `folio list` — stored proposals, oldest first.

use std::path::PathBuf;

use clap::Args;

use folio_common::proposal::Proposal;
use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show proposals with this status (pending/executed/rejected).
    #[arg(long)]
    status: Option<String>,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ListArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    let mut proposals = engine.list_proposals()?;
    if let Some(filter) = &args.status {
        proposals.retain(|proposal| proposal.status.as_str() == filter);
    }

    output::print_output(format, &proposals, format_human)?;
    Ok(())
}

fn format_human(proposals: &Vec<Proposal>) -> String {
    if proposals.is_empty() {
        return "no proposals".to_string();
    }
    proposals
        .iter()
        .map(|proposal| {
            format!(
                "{}  {:<9} {}  {}",
                proposal.id,
                proposal.status.as_str(),
                proposal.target_file,
                proposal.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
