//! Chart definition and loading

use glob::{MatchOptions, Pattern};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// File holding the chart metadata
pub const CHART_FILE: &str = "Chart.yaml";

/// File holding packaging exclusion rules
pub const IGNORE_FILE: &str = ".helmignore";

/// Helm Chart.yaml structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// API version (v1 or v2)
    pub api_version: String,

    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    /// Kubernetes version constraint
    #[serde(default)]
    pub kube_version: Option<String>,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Chart type
    #[serde(default, rename = "type")]
    pub chart_type: ChartType,

    /// Keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Home URL
    #[serde(default)]
    pub home: Option<String>,

    /// Source URLs
    #[serde(default)]
    pub sources: Vec<String>,

    /// Maintainers
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    /// Icon URL
    #[serde(default)]
    pub icon: Option<String>,

    /// Application version
    #[serde(default)]
    pub app_version: Option<String>,

    /// Whether the chart is deprecated
    #[serde(default)]
    pub deprecated: bool,

    /// Annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Chart type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Application,
    Library,
}

/// Maintainer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Chart {
    /// Parse and validate Chart.yaml content
    pub fn parse(content: &str) -> Result<Self> {
        let chart: Chart = serde_yaml::from_str(content)?;
        chart.validate()?;
        Ok(chart)
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.api_version.as_str(), "v1" | "v2") {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "Unsupported apiVersion: '{}'. Expected: v1 or v2",
                    self.api_version
                ),
            });
        }

        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidChart {
                message: "name is required".to_string(),
            });
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(CoreError::InvalidChart {
                message: format!("name '{}' is not a valid file name", self.name),
            });
        }

        Ok(())
    }

    /// Read and validate `Chart.yaml` from a chart directory
    pub fn from_dir(root: &Path) -> Result<Self> {
        let chart_file = root.join(CHART_FILE);
        if !chart_file.is_file() {
            return Err(CoreError::InvalidChart {
                message: format!("{} not found in {}", CHART_FILE, root.display()),
            });
        }

        Self::parse(&std::fs::read_to_string(&chart_file)?)
    }
}

/// Loaded chart with resolved paths
#[derive(Debug, Clone)]
pub struct LoadedChart {
    /// Chart definition
    pub chart: Chart,

    /// Root directory of the chart
    pub root: PathBuf,

    /// Exclusion rules from .helmignore
    pub ignore: IgnoreRules,
}

impl LoadedChart {
    /// Load a chart from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let chart = Chart::from_dir(&root)?;

        let ignore_file = root.join(IGNORE_FILE);
        let ignore = if ignore_file.is_file() {
            IgnoreRules::parse(&std::fs::read_to_string(&ignore_file)?)?
        } else {
            IgnoreRules::default()
        };

        Ok(Self {
            chart,
            root,
            ignore,
        })
    }

    /// Files to package, relative to the chart root, sorted
    ///
    /// Chart.yaml is always included; .helmignore rules apply to the rest.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = walkdir::WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let Ok(rel) = e.path().strip_prefix(&self.root) else {
                    return true;
                };
                rel.as_os_str().is_empty() || !self.ignore.is_ignored(rel, e.file_type().is_dir())
            });

        for entry in walker {
            let entry = entry.map_err(|e| CoreError::Archive {
                message: format!("Failed to walk {}: {}", self.root.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(rel);
        }

        if !files.iter().any(|f| f == Path::new(CHART_FILE)) {
            files.push(PathBuf::from(CHART_FILE));
        }

        files.sort();
        Ok(files)
    }
}

/// Check whether a directory holds a valid `Chart.yaml`
///
/// Other chart files are not read; problems with them surface when the
/// chart is loaded for packaging.
pub fn is_chart_dir(path: &Path) -> bool {
    if !path.is_dir() {
        tracing::debug!("{} is not a directory", path.display());
        return false;
    }
    match Chart::from_dir(path) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{} is not a chart: {}", path.display(), e);
            false
        }
    }
}

/// A single .helmignore rule
#[derive(Debug, Clone)]
struct IgnoreRule {
    pattern: Pattern,
    negate: bool,
    dir_only: bool,
    /// Pattern contains a separator and matches the full relative path
    anchored: bool,
}

/// Parsed .helmignore rules
///
/// Later rules win, `!` negates, a trailing `/` matches only directories,
/// and patterns without `/` match against the file name.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn parse(content: &str) -> Result<Self> {
        let mut rules = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negate, rest) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let (dir_only, rest) = match rest.strip_suffix('/') {
                Some(rest) => (true, rest),
                None => (false, rest),
            };
            let rest = rest.trim_start_matches("./").trim_start_matches('/');
            if rest.is_empty() {
                continue;
            }

            let pattern = Pattern::new(rest).map_err(|e| CoreError::IgnorePattern {
                pattern: line.to_string(),
                message: e.msg.to_string(),
            })?;

            rules.push(IgnoreRule {
                pattern,
                negate,
                dir_only,
                anchored: rest.contains('/'),
            });
        }

        Ok(Self { rules })
    }

    /// Whether a chart-relative path is excluded from packaging
    pub fn is_ignored(&self, rel: &Path, is_dir: bool) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let full = rel.to_string_lossy().replace('\\', "/");
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut ignored = false;
        for rule in &self.rules {
            if rule.dir_only && !is_dir {
                continue;
            }
            let target = if rule.anchored { &full } else { &name };
            if rule.pattern.matches_with(target, options) {
                ignored = !rule.negate;
            }
        }
        ignored
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Custom serde for semver::Version
mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Chart.yaml versions are often written unquoted, e.g. `version: 1.0`
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let s = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "version must be a string, got {:?}",
                    other
                )));
            }
        };
        Version::parse(s.trim().trim_start_matches('v')).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_chart(dir: &Path, chart_yaml: &str) {
        std::fs::create_dir_all(dir.join("templates")).unwrap();
        std::fs::write(dir.join(CHART_FILE), chart_yaml).unwrap();
        std::fs::write(dir.join("values.yaml"), "replicas: 1\n").unwrap();
        std::fs::write(
            dir.join("templates").join("deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\n",
        )
        .unwrap();
    }

    #[test]
    fn test_chart_deserialize() {
        let yaml = r#"
apiVersion: v2
name: myapp
version: 1.2.3
description: My application
appVersion: "2.0"
"#;
        let chart = Chart::parse(yaml).unwrap();
        assert_eq!(chart.name, "myapp");
        assert_eq!(chart.version.to_string(), "1.2.3");
        assert_eq!(chart.chart_type, ChartType::Application);
        assert_eq!(chart.app_version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_chart_v_prefixed_version() {
        let chart = Chart::parse("apiVersion: v1\nname: a\nversion: v0.3.0\n").unwrap();
        assert_eq!(chart.version, Version::new(0, 3, 0));
    }

    #[test]
    fn test_chart_rejects_bad_api_version() {
        let err = Chart::parse("apiVersion: v3\nname: a\nversion: 1.0.0\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_chart_rejects_missing_name() {
        assert!(Chart::parse("apiVersion: v2\nversion: 1.0.0\n").is_err());
        assert!(Chart::parse("apiVersion: v2\nname: ''\nversion: 1.0.0\n").is_err());
        assert!(Chart::parse("apiVersion: v2\nname: a/b\nversion: 1.0.0\n").is_err());
    }

    #[test]
    fn test_chart_rejects_non_semver() {
        assert!(Chart::parse("apiVersion: v2\nname: a\nversion: latest\n").is_err());
    }

    #[test]
    fn test_load_and_is_chart_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("foo");
        write_chart(&dir, "apiVersion: v2\nname: foo\nversion: 0.1.0\n");

        let loaded = LoadedChart::load(&dir).unwrap();
        assert_eq!(loaded.chart.name, "foo");
        assert!(is_chart_dir(&dir));
        assert!(!is_chart_dir(temp.path()));
        assert!(!is_chart_dir(&temp.path().join("missing")));
    }

    #[test]
    fn test_is_chart_dir_reads_only_chart_file() {
        let temp = TempDir::new().unwrap();
        write_chart(temp.path(), "apiVersion: v2\nname: foo\nversion: 0.1.0\n");
        std::fs::write(temp.path().join(IGNORE_FILE), "[\n").unwrap();

        assert!(is_chart_dir(temp.path()));
        let err = LoadedChart::load(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::IgnorePattern { .. }));
    }

    #[test]
    fn test_files_sorted_and_ignored() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        write_chart(dir, "apiVersion: v2\nname: foo\nversion: 0.1.0\n");
        std::fs::write(dir.join(IGNORE_FILE), "# comment\n*.bak\nci/\n").unwrap();
        std::fs::write(dir.join("values.yaml.bak"), "old").unwrap();
        std::fs::create_dir_all(dir.join("ci")).unwrap();
        std::fs::write(dir.join("ci").join("values.yaml"), "ci: true").unwrap();

        let loaded = LoadedChart::load(dir).unwrap();
        let files = loaded.files().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.to_string_lossy().to_string()).collect();

        assert!(names.contains(&"Chart.yaml".to_string()));
        assert!(names.contains(&"values.yaml".to_string()));
        assert!(names.contains(&"templates/deployment.yaml".to_string()));
        assert!(!names.iter().any(|n| n.ends_with(".bak")));
        assert!(!names.iter().any(|n| n.starts_with("ci")));
    }

    #[test]
    fn test_ignore_rules() {
        let rules = IgnoreRules::parse("*.tgz\n!keep.tgz\ntemplates/*.txt\nsecrets/\n").unwrap();

        assert!(rules.is_ignored(Path::new("old.tgz"), false));
        assert!(rules.is_ignored(Path::new("nested/old.tgz"), false));
        assert!(!rules.is_ignored(Path::new("keep.tgz"), false));
        assert!(rules.is_ignored(Path::new("templates/NOTES.txt"), false));
        assert!(!rules.is_ignored(Path::new("NOTES.txt"), false));
        assert!(rules.is_ignored(Path::new("secrets"), true));
        assert!(!rules.is_ignored(Path::new("secrets"), false));
    }

    #[test]
    fn test_ignore_rules_empty() {
        let rules = IgnoreRules::parse("\n# only comments\n").unwrap();
        assert!(rules.is_empty());
        assert!(!rules.is_ignored(Path::new("anything.yaml"), false));
    }
}
