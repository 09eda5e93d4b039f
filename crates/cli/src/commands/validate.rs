// `folio validate` — advisory check of a proposal against the live tree.

use std::path::PathBuf;

use clap::Args;

use folio_engine::service::Engine;
use folio_engine::validate::ValidationReport;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Proposal id.
    id: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    match engine.validate(&args.id)? {
        Some(report) => {
            output::print_output(format, &report, format_human)?;
            Ok(())
        }
        None => {
            output::print_error(format, "NOT_FOUND", &format!("proposal `{}` not found", args.id));
            anyhow::bail!("proposal `{}` not found", args.id);
        }
    }
}

fn format_human(report: &ValidationReport) -> String {
    if report.valid {
        return "valid (0 errors)".to_string();
    }
    let mut lines = vec![format!("invalid ({} error(s))", report.errors.len())];
    for error in &report.errors {
        let op = error
            .op_index
            .map(|index| format!("op {index}"))
            .unwrap_or_else(|| "proposal".to_string());
        lines.push(format!("  {op} [{}]: {}", error.rule, error.message));
    }
    lines.join("\n")
}
