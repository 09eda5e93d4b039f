// `folio resolve` — verified path for a logical document path.
//
// Unsafe and missing paths are indistinguishable: both are "not found".

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use folio_engine::service::Engine;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Logical document path.
    path: String,

    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ResolveArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let engine = Engine::open(&args.root)?;

    match engine.resolve(&args.path) {
        Some(real) => {
            let payload = json!({"path": args.path, "resolved": real.display().to_string()});
            output::print_output(format, &payload, |_| real.display().to_string())?;
            Ok(())
        }
        None => {
            output::print_error(format, "NOT_FOUND", &format!("`{}` not found", args.path));
            anyhow::bail!("`{}` not found", args.path);
        }
    }
}
