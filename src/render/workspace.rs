/*!
 * Rendering workspace: the directory holding job sources, the shared build
 * script and produced artifacts.
 */

use log::debug;
use std::path::{Path, PathBuf};

use super::job::{Artifact, JobId};
use crate::errors::RenderError;
use crate::file_utils::FileManager;

/// Name of the shared build script inside the workspace root
pub const BUILD_SCRIPT_NAME: &str = "build.sh";

/// Workspace layout and file operations
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    engine: String,
    source_extension: String,
}

impl Workspace {
    /// Workspace under `root` driving the given typesetting engine
    pub fn new(root: impl Into<PathBuf>, engine: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            engine: engine.into(),
            source_extension: "tex".to_string(),
        }
    }

    /// Override the source file extension
    pub fn with_source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Path of a job's source file
    pub fn source_path(&self, job_id: &JobId) -> PathBuf {
        self.root.join(format!("{}.{}", job_id, self.source_extension))
    }

    /// Path of the shared build script
    pub fn build_script_path(&self) -> PathBuf {
        self.root.join(BUILD_SCRIPT_NAME)
    }

    /// Artifact a job produces on success
    pub fn artifact(&self, job_id: &JobId) -> Artifact {
        Artifact::for_job(&self.root, job_id)
    }

    /// Content of the build script: two sequential engine passes over the
    /// job named by the first argument
    pub fn build_script(&self) -> String {
        let pass = format!(
            "{} -interaction=nonstopmode -halt-on-error \"$1.{}\"",
            self.engine, self.source_extension
        );
        format!("#!/bin/sh\n{} && {}\n", pass, pass)
    }

    /// Write a job's source file
    pub fn write_source(&self, job_id: &JobId, source: &str) -> Result<PathBuf, RenderError> {
        let path = self.source_path(job_id);
        FileManager::ensure_dir(&self.root).map_err(|e| workspace_error(job_id, &self.root, e))?;
        std::fs::write(&path, source).map_err(|e| RenderError::WorkspaceIo {
            job_id: job_id.to_string(),
            path: path.clone(),
            source: e,
        })?;
        debug!("Wrote {} bytes of source for job {} to {:?}", source.len(), job_id, path);
        Ok(path)
    }

    /// Write the build script unless it already has the expected content.
    ///
    /// Returns whether the file was written.
    pub fn ensure_build_script(&self, job_id: &JobId) -> Result<bool, RenderError> {
        let path = self.build_script_path();
        let written = FileManager::write_if_changed(&path, &self.build_script()).map_err(|e| {
            RenderError::WorkspaceIo {
                job_id: job_id.to_string(),
                path: path.clone(),
                source: e,
            }
        })?;

        if written {
            make_executable(&path).map_err(|e| RenderError::WorkspaceIo {
                job_id: job_id.to_string(),
                path: path.clone(),
                source: e,
            })?;
            debug!("Wrote build script {:?}", path);
        }
        Ok(written)
    }
}

fn workspace_error(job_id: &JobId, path: &Path, error: anyhow::Error) -> RenderError {
    let source = match error.downcast::<std::io::Error>() {
        Ok(io) => io,
        Err(other) => std::io::Error::other(other.to_string()),
    };
    RenderError::WorkspaceIo {
        job_id: job_id.to_string(),
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
