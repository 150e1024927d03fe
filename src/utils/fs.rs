use crate::errors::Result;
use std::io::ErrorKind;
use std::path::Path;

/// Remove a file or directory tree.
///
/// Returns `Ok(false)` when nothing exists at `path`.
pub async fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// [`remove_path`] for contexts that cannot await, such as `Drop`.
pub fn remove_path_blocking(path: &Path) -> Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let removed = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let metadata_dir = dir.path().join("saml-md");
        std::fs::create_dir_all(metadata_dir.join("nested")).unwrap();
        std::fs::write(metadata_dir.join("nested/idp.xml"), "<xml/>").unwrap();

        assert!(remove_path(&metadata_dir).await.unwrap());
        assert!(!metadata_dir.exists());
    }

    #[tokio::test]
    async fn test_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sp-metadata.xml");
        std::fs::write(&file, "<xml/>").unwrap();

        assert!(remove_path(&file).await.unwrap());
        assert!(!file.exists());
    }

    #[test]
    fn test_blocking_remove_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let metadata_dir = dir.path().join("saml-md");
        std::fs::create_dir_all(metadata_dir.join("nested")).unwrap();

        assert!(remove_path_blocking(&metadata_dir).unwrap());
        assert!(!metadata_dir.exists());
        assert!(!remove_path_blocking(&metadata_dir).unwrap());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_path(&dir.path().join("absent")).await.unwrap());
    }
}
