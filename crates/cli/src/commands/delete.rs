// `folio delete` — remove a proposal record.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Proposal id.
    id: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: DeleteArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    let deleted = engine.delete_proposal(&args.id)?;
    if !deleted {
        output::print_error(format, "NOT_FOUND", &format!("proposal `{}` not found", args.id));
        anyhow::bail!("proposal `{}` not found", args.id);
    }

    output::print_output(format, &json!({"deleted": args.id}), |_| {
        format!("Deleted {}", args.id)
    })?;
    Ok(())
}
