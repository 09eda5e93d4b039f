// `folio index` — full rebuild of the workspace index.

use std::path::PathBuf;

use clap::Args;

use folio_engine::index::IndexTotals;
use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: IndexArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    let totals = engine.rebuild_index()?;
    output::print_output(format, &totals, format_human)?;
    Ok(())
}

fn format_human(totals: &IndexTotals) -> String {
    format!(
        "{} document(s), {} block(s), {} anchor(s)",
        totals.document_count, totals.block_count, totals.anchor_count
    )
}
