// `folio show` — one proposal record in full.

use std::path::PathBuf;

use clap::Args;

use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Proposal id.
    id: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ShowArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    match engine.get_proposal(&args.id)? {
        Some(proposal) => {
            output::print_output(format, &proposal, |p| {
                serde_json::to_string_pretty(p).unwrap_or_else(|_| p.id.clone())
            })?;
            Ok(())
        }
        None => {
            output::print_error(format, "NOT_FOUND", &format!("proposal `{}` not found", args.id));
            anyhow::bail!("proposal `{}` not found", args.id);
        }
    }
}
