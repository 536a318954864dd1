//! Best-effort publishing of the rendered feed.
//!
//! Nothing in the core depends on a publish succeeding. Callers go through
//! `publish_best_effort`, which logs failures and carries on.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::PublishError;

/// Something that can make an artifact available elsewhere.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&self, artifact: &Path) -> Result<(), PublishError>;
}

/// Commits the artifact to the git repository it lives in and pushes.
pub struct GitPublisher {
    remote: Option<String>,
    message: String,
}

impl GitPublisher {
    pub fn new(remote: Option<String>, message: impl Into<String>) -> Self {
        GitPublisher {
            remote,
            message: message.into(),
        }
    }

    async fn git(&self, dir: &Path, step: &'static str, args: &[&str]) -> Result<(), PublishError> {
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .await
            .map_err(|source| PublishError::Spawn { step, source })?;

        if !output.status.success() {
            return Err(PublishError::Git {
                step,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Publisher for GitPublisher {
    async fn publish(&self, artifact: &Path) -> Result<(), PublishError> {
        let dir: PathBuf = artifact
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| PublishError::NoParent(artifact.display().to_string()))?;
        let file = artifact
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .ok_or_else(|| PublishError::NoParent(artifact.display().to_string()))?;

        self.git(&dir, "add", &["add", &file]).await?;
        self.git(&dir, "commit", &["commit", "-m", &self.message]).await?;

        match &self.remote {
            Some(remote) => self.git(&dir, "push", &["push", remote]).await?,
            None => self.git(&dir, "push", &["push"]).await?,
        }

        Ok(())
    }
}

/// Publish `artifact`, logging instead of failing. Returns whether it worked.
pub async fn publish_best_effort<P: Publisher>(publisher: &P, artifact: &Path) -> bool {
    match publisher.publish(artifact).await {
        Ok(()) => {
            log::info!("Published {}", artifact.display());
            true
        }
        Err(e) => {
            // "nothing to commit" lands here too
            log::warn!("Publishing {} skipped: {}", artifact.display(), e);
            false
        }
    }
}
