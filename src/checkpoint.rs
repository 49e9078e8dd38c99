use std::path::PathBuf;

use tokio::process::Command;
use tracing::info;

use crate::error::CheckpointError;

/// External snapshot of persisted state after each batch. Failures are
/// reported to the caller, which logs and continues.
pub trait Checkpointer {
    async fn checkpoint(&self, description: &str) -> Result<(), CheckpointError>;
}

pub struct NoCheckpoint;

impl Checkpointer for NoCheckpoint {
    async fn checkpoint(&self, _description: &str) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// `git add <paths>`, `git commit -m <description>`, optionally `git push`.
pub struct GitCheckpointer {
    paths: Vec<PathBuf>,
    push: bool,
}

impl GitCheckpointer {
    pub fn new(paths: Vec<PathBuf>, push: bool) -> Self {
        GitCheckpointer { paths, push }
    }

    async fn git(&self, args: &[&str]) -> Result<(), CheckpointError> {
        let output = Command::new("git")
            .args(args)
            .output()
            .await
            .map_err(|e| CheckpointError(format!("git {}: {}", args[0], e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CheckpointError(format!(
                "git {} exited with {}: {}",
                args[0],
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Checkpointer for GitCheckpointer {
    async fn checkpoint(&self, description: &str) -> Result<(), CheckpointError> {
        let paths: Vec<String> = self
            .paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let mut add = vec!["add", "--"];
        add.extend(paths.iter().map(String::as_str));
        self.git(&add).await?;
        self.git(&["commit", "-m", description]).await?;
        if self.push {
            self.git(&["push"]).await?;
        }
        info!("Checkpoint: {}", description);
        Ok(())
    }
}
