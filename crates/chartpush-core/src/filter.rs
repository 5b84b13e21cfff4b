//! Path filtering for changed-file lists
//!
//! Pure helpers that reduce the raw output of a diff to the set of
//! directories that may hold a chart. Only [`parent_directories`] touches
//! the filesystem, and only to check that a directory exists.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Component, Path, PathBuf};

/// Extensions recognised as chart definition files by default
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Set of recognised file extensions, stored dot-inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<String>,
}

impl ExtensionSet {
    /// Build a set from a list of extensions
    ///
    /// Entries may be given with or without the leading dot. Blank entries
    /// are ignored and duplicates collapse.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty() && e != ".")
            .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
            .collect::<Vec<_>>();

        Self {
            extensions: deduplicate(normalized),
        }
    }

    /// Check whether a path's extension is in the set (case-sensitive)
    pub fn matches(&self, path: &str) -> bool {
        match extension_of(path) {
            Some(ext) => self.extensions.iter().any(|e| e == ext),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Extension of the last path segment, dot-inclusive
///
/// Dotfiles such as `.helmignore` have no extension.
fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let idx = name.rfind('.')?;
    if idx == 0 {
        return None;
    }
    Some(&name[idx..])
}

/// Drop empty entries, keeping the order of the rest
pub fn remove_blank(paths: Vec<String>) -> Vec<String> {
    paths.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Remove later duplicates, keeping first-seen order
pub fn deduplicate<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Keep paths whose extension is in `extensions`, in input order
pub fn filter_by_extension(paths: Vec<String>, extensions: &ExtensionSet) -> Vec<String> {
    paths.into_iter().filter(|p| extensions.matches(p)).collect()
}

/// Restrict repository-relative paths to those under `root`
///
/// Returned paths are relative to `root`. A root of `.` or `""` keeps
/// everything unchanged.
pub fn strip_root(paths: Vec<String>, root: &Path) -> Vec<String> {
    let prefix = normalize_root(root);
    if prefix.is_empty() {
        return paths;
    }

    paths
        .into_iter()
        .filter_map(|p| {
            let rest = p.strip_prefix(prefix.as_str())?;
            let rest = rest.strip_prefix('/')?;
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}

/// Root as a `/`-joined string without `.` components
fn normalize_root(root: &Path) -> String {
    root.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Map each path to its top-level directory under `base`
///
/// The first segment of every path is joined to `base` and kept only when
/// it is an existing directory at call time. Result is deduplicated.
pub fn parent_directories(paths: &[String], base: &Path) -> Vec<PathBuf> {
    let dirs = paths
        .iter()
        .filter_map(|p| {
            let top = p.trim_start_matches("./").split('/').next()?;
            if top.is_empty() || top == "." || top == ".." {
                return None;
            }
            let dir = base.join(top);
            dir.is_dir().then_some(dir)
        })
        .collect();

    deduplicate(dirs)
}
