//! Values that may be given either literally or as a path to a file.

use crate::{ProviderError, Result};
use std::path::PathBuf;
use tokio::fs;

/// Result of [`read`]: the resolved contents and where they came from.
#[derive(Clone, PartialEq, Eq)]
pub struct PathOrContents {
    /// Literal value, or the file's contents
    pub contents: String,
    /// True if `contents` was read from a file
    pub from_file: bool,
}

// Contents are usually credentials; keep them out of logs.
impl std::fmt::Debug for PathOrContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathOrContents")
            .field("contents", &"[REDACTED]")
            .field("from_file", &self.from_file)
            .finish()
    }
}

/// Resolves a value that is either a file path or the contents themselves.
///
/// A leading `~` is expanded to the current user's home directory. If the
/// resulting path names an existing file, its contents are returned;
/// otherwise the value is returned unchanged.
///
/// # Errors
///
/// - [`ProviderError::Credentials`] if `~` is used but the home directory
///   cannot be determined
/// - [`ProviderError::Io`] if the file exists but cannot be read
pub async fn read(value: &str) -> Result<PathOrContents> {
    if value.is_empty() {
        return Ok(PathOrContents {
            contents: String::new(),
            from_file: false,
        });
    }

    let path = expand_home(value)?;

    if fs::metadata(&path).await.is_ok() {
        let contents = fs::read_to_string(&path).await?;
        return Ok(PathOrContents {
            contents,
            from_file: true,
        });
    }

    Ok(PathOrContents {
        contents: value.to_string(),
        from_file: false,
    })
}

fn expand_home(value: &str) -> Result<PathBuf> {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(value)),
    };

    let home = dirs::home_dir().ok_or_else(|| {
        ProviderError::Credentials(format!("cannot expand {value:?}: home directory unknown"))
    })?;

    Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_literal() {
        let result = read("ya29.literal-token").await.unwrap();
        assert_eq!(result.contents, "ya29.literal-token");
        assert!(!result.from_file);
    }

    #[tokio::test]
    async fn test_read_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"type\": \"service_account\"}}").unwrap();

        let path = file.path().to_str().unwrap();
        let result = read(path).await.unwrap();

        assert_eq!(result.contents, "{\"type\": \"service_account\"}");
        assert!(result.from_file);
    }

    #[tokio::test]
    async fn test_read_empty() {
        let result = read("").await.unwrap();
        assert!(result.contents.is_empty());
        assert!(!result.from_file);
    }

    #[tokio::test]
    async fn test_read_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = read(dir.path().to_str().unwrap()).await;
        assert!(matches!(result, Err(ProviderError::Io(_))));
    }

    #[test]
    fn test_expand_home_leaves_other_values() {
        assert_eq!(expand_home("/etc/creds.json").unwrap(), PathBuf::from("/etc/creds.json"));
        assert_eq!(expand_home("~other/x").unwrap(), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_debug_redacts_contents() {
        let value = PathOrContents {
            contents: "secret".to_string(),
            from_file: false,
        };
        assert!(!format!("{value:?}").contains("secret"));
    }
}
