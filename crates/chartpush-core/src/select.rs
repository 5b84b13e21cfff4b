//! Candidate selection
//!
//! Resolves which directories to package. Exactly one [`Selection`] mode is
//! active per run, chosen with the precedence explicit path > revision pair
//! > directory scan.

use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::error::{CoreError, Result};
use crate::filter::{
    filter_by_extension, parent_directories, remove_blank, strip_root, ExtensionSet,
};

/// How candidates are chosen for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A single chart directory given by the user
    Explicit(PathBuf),
    /// Charts touched between two revisions
    Diff { previous: String, current: String },
    /// Every immediate subdirectory of the chart root
    Scan,
}

impl Selection {
    /// Pick the active mode from the optional inputs
    ///
    /// A revision pair only counts when both ids are non-blank.
    pub fn resolve(
        explicit: Option<PathBuf>,
        previous: Option<String>,
        current: Option<String>,
    ) -> Self {
        if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            return Selection::Explicit(path);
        }

        let previous = previous.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let current = current.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match (previous, current) {
            (Some(previous), Some(current)) => Selection::Diff { previous, current },
            _ => Selection::Scan,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Selection::Explicit(_) => "explicit",
            Selection::Diff { .. } => "diff",
            Selection::Scan => "scan",
        }
    }
}

/// Lists files changed between two revisions
pub trait ChangeLister {
    /// Paths changed between `previous` and `current`, relative to `repo`
    ///
    /// `repo` may be a subdirectory of the repository; changes outside it
    /// are left out.
    fn changed_files(&self, repo: &Path, previous: &str, current: &str) -> Result<Vec<String>>;
}

/// [`ChangeLister`] backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self, repo: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-C").arg(repo);
        cmd
    }

    fn open_repository(&self, repo: &Path) -> Result<()> {
        let output = self
            .git(repo)
            .args(["rev-parse", "--git-dir"])
            .output()
            .map_err(|e| CoreError::NotARepository {
                path: format!("{} ({})", repo.display(), e),
            })?;

        if !output.status.success() {
            return Err(CoreError::NotARepository {
                path: repo.display().to_string(),
            });
        }
        Ok(())
    }

    fn resolve_commit(&self, repo: &Path, revision: &str) -> Result<String> {
        let output = self
            .git(repo)
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", revision))
            .output()?;

        if !output.status.success() {
            return Err(CoreError::UnknownRevision {
                revision: revision.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ChangeLister for GitCli {
    fn changed_files(&self, repo: &Path, previous: &str, current: &str) -> Result<Vec<String>> {
        tracing::info!("Getting diff between {} and {}", previous, current);

        self.open_repository(repo)?;
        let from = self.resolve_commit(repo, previous)?;
        let to = self.resolve_commit(repo, current)?;

        // -z keeps non-ASCII names unquoted
        let output = self
            .git(repo)
            .args(["-c", "core.quotePath=false"])
            .args(["diff", "--name-only", "--no-renames", "--relative", "-z"])
            .arg(&from)
            .arg(&to)
            .output()?;

        if !output.status.success() {
            return Err(CoreError::Diff {
                previous: previous.to_string(),
                current: current.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let files: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .split('\0')
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!("{} file(s) changed", files.len());
        Ok(files)
    }
}

/// Resolves candidate directories for a [`Selection`]
pub struct ChangeSource<'a, L> {
    lister: &'a L,
    /// Repository working tree
    workspace: &'a Path,
    /// Chart root, relative to the workspace or absolute
    chart_dir: &'a Path,
    extensions: &'a ExtensionSet,
}

impl<'a, L: ChangeLister> ChangeSource<'a, L> {
    pub fn new(
        lister: &'a L,
        workspace: &'a Path,
        chart_dir: &'a Path,
        extensions: &'a ExtensionSet,
    ) -> Self {
        Self {
            lister,
            workspace,
            chart_dir,
            extensions,
        }
    }

    /// Filesystem path of the chart root
    pub fn chart_root(&self) -> PathBuf {
        if self.chart_dir.is_absolute() {
            self.chart_dir.to_path_buf()
        } else {
            self.workspace.join(self.chart_dir)
        }
    }

    /// Resolve the candidate set, failing only on configuration errors
    pub fn candidates(&self, selection: &Selection) -> Result<Vec<PathBuf>> {
        match selection {
            Selection::Explicit(path) => Ok(vec![path.clone()]),
            Selection::Diff { previous, current } => self.diff_candidates(previous, current),
            Selection::Scan => self.scan_candidates(),
        }
    }

    fn diff_candidates(&self, previous: &str, current: &str) -> Result<Vec<PathBuf>> {
        let files = self.lister.changed_files(self.workspace, previous, current)?;
        let files = remove_blank(files);
        let files = filter_by_extension(files, self.extensions);
        let files = strip_root(files, &self.workspace_relative_chart_dir()?);
        Ok(parent_directories(&files, &self.chart_root()))
    }

    /// Chart root as seen from the workspace, for matching diff paths
    fn workspace_relative_chart_dir(&self) -> Result<PathBuf> {
        let lexical = !self.chart_dir.is_absolute()
            && !self
                .chart_dir
                .components()
                .any(|c| matches!(c, Component::ParentDir));
        if lexical {
            return Ok(self.chart_dir.to_path_buf());
        }

        let root = self.chart_root();
        let canonical = |path: &Path| {
            path.canonicalize()
                .map_err(|e| CoreError::ChartRootUnreadable {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
        };
        let workspace = canonical(self.workspace)?;
        let root = canonical(root.as_path())?;

        root.strip_prefix(&workspace)
            .map(Path::to_path_buf)
            .map_err(|_| CoreError::ChartRootOutsideWorkspace {
                chart_root: root.display().to_string(),
                workspace: workspace.display().to_string(),
            })
    }

    fn scan_candidates(&self) -> Result<Vec<PathBuf>> {
        let root = self.chart_root();
        let unreadable = |e: std::io::Error| CoreError::ChartRootUnreadable {
            path: root.display().to_string(),
            message: e.to_string(),
        };

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }

        dirs.sort();
        Ok(dirs)
    }
}
