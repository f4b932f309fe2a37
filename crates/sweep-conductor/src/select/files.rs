use anyhow::Result;
use std::path::{Path, PathBuf};

/// Files chosen for a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub files: Vec<PathBuf>,
    /// Entries that were dropped, one human-readable line each.
    pub warnings: Vec<String>,
}

/// Produces the ordered list of files for a run.
#[async_trait::async_trait]
pub trait FileSelector: Send + Sync {
    async fn select(&self) -> Result<Selection>;
}

/// A fixed list of files.
pub struct StaticSelection(pub Vec<PathBuf>);

#[async_trait::async_trait]
impl FileSelector for StaticSelection {
    async fn select(&self) -> Result<Selection> {
        Ok(Selection {
            files: self.0.clone(),
            warnings: vec![],
        })
    }
}

/// Expands user-given files and directories under a project root.
///
/// Directories are walked recursively. Dot-prefixed entries are skipped,
/// as is anything outside the project root. Ignore files are not consulted:
/// the user picked these paths explicitly.
pub struct PathSelector {
    project_root: PathBuf,
    paths: Vec<PathBuf>,
}

impl PathSelector {
    pub fn new(project_root: PathBuf, paths: Vec<PathBuf>) -> Self {
        Self {
            project_root,
            paths,
        }
    }

    fn absolute(&self, p: &Path) -> PathBuf {
        let joined = if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        };
        joined.canonicalize().unwrap_or(joined)
    }
}

/// True when any component of `path` below `root` starts with a dot.
fn is_hidden_under(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root).is_ok_and(|rel| {
        rel.components()
            .any(|c| c.as_os_str().to_str().is_some_and(|n| n.starts_with('.')))
    })
}

#[async_trait::async_trait]
impl FileSelector for PathSelector {
    async fn select(&self) -> Result<Selection> {
        let root = self
            .project_root
            .canonicalize()
            .unwrap_or_else(|_| self.project_root.clone());
        let mut selection = Selection::default();

        for given in &self.paths {
            let path = self.absolute(given);
            if !path.starts_with(&root) {
                selection.warnings.push(format!(
                    "skipping {}: outside project root {}",
                    given.display(),
                    root.display()
                ));
                continue;
            }
            if is_hidden_under(&path, &root) {
                selection
                    .warnings
                    .push(format!("skipping {}: hidden entry", given.display()));
                continue;
            }
            if !path.exists() {
                selection
                    .warnings
                    .push(format!("skipping {}: not found", given.display()));
                continue;
            }

            let walker = ignore::WalkBuilder::new(&path)
                .standard_filters(false)
                .hidden(true)
                .follow_links(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build();
            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_some_and(|t| t.is_file()) {
                            let file = entry.into_path();
                            if !selection.files.contains(&file) {
                                selection.files.push(file);
                            }
                        }
                    }
                    Err(e) => selection.warnings.push(format!("skipping entry: {e}")),
                }
            }
        }

        for warning in &selection.warnings {
            tracing::warn!("{warning}");
        }
        Ok(selection)
    }
}
