//! Infrastructure implementation of the `ContextStore` port.
//!
//! `JsonContextStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so a crash mid-write never leaves a
//! truncated context behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ContextStore;
use crate::domain::PipelineContext;

/// Environment variable overriding the context file location.
pub const CONTEXT_ENV: &str = "FLOTILLA_CONTEXT";

/// Context file relative to the working directory.
pub const DEFAULT_CONTEXT_PATH: &str = ".flotilla/context.json";

/// Pipeline context file — implements `ContextStore` for the infra layer.
pub struct JsonContextStore {
    path: PathBuf,
}

impl JsonContextStore {
    /// Pick the context path: explicit flag, then `$FLOTILLA_CONTEXT`, then
    /// `./.flotilla/context.json`.
    #[must_use]
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let path = explicit.map_or_else(
            || {
                std::env::var_os(CONTEXT_ENV)
                    .map_or_else(|| PathBuf::from(DEFAULT_CONTEXT_PATH), PathBuf::from)
            },
            Path::to_path_buf,
        );
        Self::with_path(path)
    }

    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(path: &Path) -> Result<Option<PipelineContext>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading context file {}", path.display()))?;
        let ctx = serde_json::from_str(&content)
            .with_context(|| format!("parsing context file {}", path.display()))?;
        Ok(Some(ctx))
    }

    fn save_sync(path: &Path, ctx: &PipelineContext) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(ctx).context("serializing context")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing context file {}", path.display()))?;
        Ok(())
    }
}

impl ContextStore for JsonContextStore {
    async fn load_async(&self) -> Result<Option<PipelineContext>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("context load task panicked")?
    }

    async fn save_async(&self, ctx: &PipelineContext) -> Result<()> {
        let path = self.path.clone();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &ctx))
            .await
            .context("context save task panicked")?
    }
}
