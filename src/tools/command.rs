use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandError;

/// Runs an external program and hands back its standard output.
/// Tools that shell out depend on this instead of spawning processes directly.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<String, CommandError>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    async fn run(&self, args: &[String]) -> Result<String, CommandError> {
        (**self).run(args).await
    }
}

/// Spawns `program` with `base_args` followed by the per-call arguments.
///
/// The call fails if the process can't be spawned, exits non-zero, or writes
/// anything to stderr.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> Result<String, CommandError> {
        debug!(program = %self.program.display(), ?args, "spawning command");

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandError::Spawn {
                program: self.program_name(),
                reason: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(CommandError::Exit {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            return Err(CommandError::Stderr {
                program: self.program_name(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
