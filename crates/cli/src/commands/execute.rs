// `folio execute` — apply a pending proposal and commit the result.

use std::path::PathBuf;

use clap::Args;

use folio_engine::executor::ExecuteError;
use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ExecuteArgs {
    /// Proposal id.
    id: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ExecuteArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    match engine.execute(&args.id) {
        Ok(executed) => {
            output::print_output(format, &executed, |e| {
                format!("Executed {} (commit {})", args.id, e.commit_id)
            })?;
            Ok(())
        }
        Err(error) => {
            let code = match &error {
                ExecuteError::NotFound { .. } => "NOT_FOUND",
                ExecuteError::Conflict { .. } => "CONFLICT",
                ExecuteError::Rejected { .. } => "REJECTED",
                ExecuteError::Store(_) => "STORE_ERROR",
            };
            output::print_error(format, code, &error.to_string());
            Err(error.into())
        }
    }
}
