//! Filesystem fixtures.

use anyhow::Result;
use tempfile::TempDir;

/// Create a self-cleaning scratch directory under the system temp root.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub fn scratch_dir(prefix: &str) -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_uses_prefix_and_cleans_up() -> Result<()> {
        let dir = scratch_dir("comfypod-fixture-")?;
        let path = dir.path().to_path_buf();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        assert!(name.starts_with("comfypod-fixture-"));
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
        Ok(())
    }
}
