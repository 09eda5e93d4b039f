// CLI subcommand dispatch.

use clap::Subcommand;

pub mod delete;
pub mod execute;
pub mod index;
pub mod init;
pub mod list;
pub mod propose;
pub mod resolve;
pub mod show;
pub mod validate;

#[derive(Subcommand)]
pub enum Command {
    /// Create a pending proposal against a document
    Propose(propose::ProposeArgs),
    /// Check a proposal against the live document
    Validate(validate::ValidateArgs),
    /// Apply a pending proposal and commit the result
    Execute(execute::ExecuteArgs),
    /// List stored proposals
    List(list::ListArgs),
    /// Show one proposal record
    Show(show::ShowArgs),
    /// Delete a proposal record
    Delete(delete::DeleteArgs),
    /// Resolve a logical path through the registry
    Resolve(resolve::ResolveArgs),
    /// Rebuild the workspace index
    Index(index::IndexArgs),
    /// Write a default workspace configuration
    Init(init::InitArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Propose(args) => propose::run(args),
        Command::Validate(args) => validate::run(args),
        Command::Execute(args) => execute::run(args),
        Command::List(args) => list::run(args),
        Command::Show(args) => show::run(args),
        Command::Delete(args) => delete::run(args),
        Command::Resolve(args) => resolve::run(args),
        Command::Index(args) => index::run(args),
        Command::Init(args) => init::run(args),
    }
}
