use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the per-user root.
pub const HOME_ENV: &str = "SWEEP_HOME";

/// Return the per-user store root.
/// `$SWEEP_HOME` if set, else `<data_dir>/sweep`, else `~/.sweep`.
pub fn store_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        PathBuf::from(dir)
    } else if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("sweep")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".sweep")
    } else {
        PathBuf::from(".sweep-store")
    }
}

/// Resolved file layout under one store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub root: PathBuf,
    pub hooks_json: PathBuf,
    pub config_json: PathBuf,
    pub logs_dir: PathBuf,
    pub status_json: PathBuf,
}

impl StorePaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            hooks_json: root.join("hooks.json"),
            config_json: root.join("config.json"),
            logs_dir: root.join("logs"),
            status_json: root.join("status.json"),
        }
    }

    /// Layout under [`store_root`].
    pub fn discover() -> Self {
        Self::new(&store_root())
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_root_is_not_empty() {
        let root = store_root();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn paths_layout() {
        let paths = StorePaths::new(Path::new("/home/u/.sweep"));
        assert!(paths.hooks_json.ends_with("hooks.json"));
        assert!(paths.config_json.ends_with("config.json"));
        assert!(paths.logs_dir.ends_with("logs"));
        assert!(paths.status_json.ends_with("status.json"));
        assert_eq!(paths.root, Path::new("/home/u/.sweep"));
    }

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("status.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn write_atomic_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }
}
