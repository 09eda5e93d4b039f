// Git plumbing for proposal commits.
//
// Every executed proposal becomes one commit. Author identity is derived
// from the requesting actor (agent actors get an `[AI]` marker prefix),
// and the message embeds the proposal id so the commit is traceable back
// to the authorizing record. Command execution is abstracted behind
// `CommandExecutor` for testing.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

use folio_common::proposal::{Actor, ActorKind, Proposal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    EmptyAddPaths,
    SpawnFailed { command: String, message: String },
    CommandFailed { command: String, code: Option<i32>, stderr: String },
}

impl Display for GitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::EmptyAddPaths => write!(f, "git add requires at least one path"),
            GitError::SpawnFailed { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitError::CommandFailed { command, code, stderr } => {
                write!(f, "`{command}` failed with code {:?}: {}", code, stderr.trim())
            }
        }
    }
}

impl Error for GitError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor }
    }

    pub fn add<S: AsRef<str>>(&self, paths: &[S]) -> Result<GitCommandOutput, GitError> {
        if paths.is_empty() {
            return Err(GitError::EmptyAddPaths);
        }

        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|path| path.as_ref().to_string()));
        self.run(args)
    }

    /// Commit staged changes as the given identity and return the new
    /// commit id.
    pub fn commit_as(
        &self,
        author_name: &str,
        author_email: &str,
        message: &str,
    ) -> Result<String, GitError> {
        self.run(vec![
            "-c".to_string(),
            format!("user.name={author_name}"),
            "-c".to_string(),
            format!("user.email={author_email}"),
            "commit".to_string(),
            "-m".to_string(),
            message.to_string(),
        ])?;

        let output = self.run(vec!["rev-parse".to_string(), "HEAD".to_string()])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Current history head, or `None` on an unborn branch.
    pub fn head(&self) -> Result<Option<String>, GitError> {
        match self.run(vec!["rev-parse".to_string(), "HEAD".to_string()]) {
            Ok(output) => Ok(Some(output.stdout.trim().to_string())),
            Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<GitCommandOutput, GitError> {
        self.run(vec!["push".to_string(), remote.to_string(), branch.to_string()])
    }

    fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitError> {
        let command = format!("git {}", args.join(" "));
        let result = self.executor.execute("git", &args, &self.repo_path).map_err(|error| {
            GitError::SpawnFailed { command: command.clone(), message: error.to_string() }
        })?;

        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitError::CommandFailed { command, code: result.code, stderr })
    }
}

// ── Attribution ─────────────────────────────────────────────────────

/// Marker prefixed to the author name when the actor is automated.
pub const AI_MARKER: &str = "[AI]";

/// Derive the commit author identity from the requesting actor.
///
/// Agent actors carry the `[AI]` marker; actors without an email get a
/// stable fallback under `folio.local`.
pub fn commit_author(actor: &Actor) -> (String, String) {
    let trimmed = actor.name.trim();
    let base = if trimmed.is_empty() { "unknown" } else { trimmed };
    let name = match actor.kind {
        ActorKind::Agent => format!("{AI_MARKER} {base}"),
        ActorKind::Human => base.to_string(),
    };
    let email = match actor.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => format!("{}@folio.local", slugify(base)),
    };
    (name, email)
}

/// Commit message for an executed proposal: the author's reason as the
/// subject, the proposal id as a trailer.
pub fn commit_message(proposal: &Proposal) -> String {
    let reason = proposal.message.trim();
    let subject = if reason.is_empty() {
        format!("Apply proposal to {}", proposal.target_file)
    } else {
        reason.to_string()
    };
    format!("{}\n\nProposal: {}", enforce_first_line_limit(&subject, 72), proposal.id)
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Truncate the first line of a commit message to `max_len` characters,
/// breaking at a word boundary when possible.
fn enforce_first_line_limit(message: &str, max_len: usize) -> String {
    let mut lines = message.lines();
    let first_line = match lines.next() {
        Some(line) => line,
        None => return message.to_string(),
    };

    if first_line.chars().count() <= max_len {
        return message.to_string();
    }

    let truncated: String = first_line.chars().take(max_len).collect();
    let truncated = match truncated.rfind(' ') {
        Some(pos) if pos > max_len / 2 => truncated[..pos].to_string(),
        _ => truncated,
    };

    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        truncated
    } else {
        format!("{truncated}\n{}", rest.join("\n"))
    }
}
