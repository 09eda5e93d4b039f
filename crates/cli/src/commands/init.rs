// `folio init` — write a default workspace configuration.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use folio_engine::config::{workspace_config_path, WorkspaceConfig};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Managed root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let config_path = workspace_config_path(&args.root);

    if config_path.exists() {
        output::print_error(
            format,
            "ALREADY_INITIALIZED",
            &format!("`{}` already exists", config_path.display()),
        );
        anyhow::bail!("`{}` already exists", config_path.display());
    }

    WorkspaceConfig::default().save(&args.root)?;
    let payload = json!({"config": config_path.display().to_string()});
    output::print_output(format, &payload, |_| {
        format!("Wrote {}", config_path.display())
    })?;
    Ok(())
}
