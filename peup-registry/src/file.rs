//! Directory-backed manifest registry.
//!
//! Each scope lives in its own `<scope>_manifest.json` file. Files are read
//! on every lookup; caching is the resolution service's job.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument, warn};

use peup_core::constants::MANIFEST_FILE_SUFFIX;
use peup_core::error::{PeupError, Result};
use peup_core::traits::ManifestRegistry;
use peup_core::types::{Deadline, Manifest};

/// Registry reading manifests from a directory.
///
/// # Layout
///
/// ```text
/// manifests/
///   repositories_manifest.json
///   svc1_manifest.json
/// ```
#[derive(Clone, Debug)]
pub struct FileRegistry {
    dir: PathBuf,
}

impl FileRegistry {
    /// Creates a registry over `dir`. The directory does not have to exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the manifest directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file that holds the manifest for `scope`.
    pub fn path_for(&self, scope: &str) -> Result<PathBuf> {
        let scope = scope.trim();
        if scope.is_empty()
            || scope.starts_with('.')
            || scope.chars().any(|c| c.is_control() || c == '/' || c == '\\')
        {
            return Err(PeupError::InvalidInput(format!(
                "scope cannot be used as a file name: {:?}",
                scope
            )));
        }
        Ok(self.dir.join(format!("{}{}", scope, MANIFEST_FILE_SUFFIX)))
    }

    /// Writes the manifest for `scope`, replacing any existing file.
    #[instrument(skip(self, manifest))]
    pub async fn store(&self, scope: &str, manifest: &Manifest) -> Result<PathBuf> {
        manifest.validate()?;
        let path = self.path_for(scope)?;
        fs::create_dir_all(&self.dir).await?;

        // Write to a temp file, then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(manifest)?).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(path = ?path, "Stored manifest");
        Ok(path)
    }

    /// Lists the scopes that have a manifest file.
    pub async fn scopes(&self) -> Result<Vec<String>> {
        let mut scopes = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(scopes),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if let Some(scope) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(MANIFEST_FILE_SUFFIX))
            {
                scopes.push(scope.to_string());
            }
        }

        scopes.sort();
        Ok(scopes)
    }
}

#[async_trait]
impl ManifestRegistry for FileRegistry {
    #[instrument(skip(self, _deadline))]
    async fn lookup(&self, scope: &str, _deadline: Deadline) -> Result<Manifest> {
        let path = self.path_for(scope)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "No manifest file");
                return Err(PeupError::NotFound(scope.trim().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Manifest::from_json(&bytes).map_err(|e| {
            warn!(path = ?path, error = %e, "Unreadable manifest file");
            PeupError::UpstreamError(format!("{}: {}", path.display(), e))
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}
