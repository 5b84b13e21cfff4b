//! chartpush Core - change detection and chart packaging
//!
//! This crate provides the local half of the chartpush pipeline:
//! - `filter`: reduce changed-file lists to candidate chart directories
//! - `select`: resolve candidates by explicit path, git diff or directory scan
//! - `chart`: Chart.yaml model, loading and `.helmignore` rules
//! - `archive`: Helm-layout `.tgz` creation and digests
//! - `package`: per-candidate packaging with batch-level failure isolation

pub mod archive;
pub mod chart;
pub mod error;
pub mod filter;
pub mod package;
pub mod select;

pub use archive::{create_archive, default_archive_name, file_digest};
pub use chart::{is_chart_dir, Chart, ChartType, IgnoreRules, LoadedChart};
pub use error::{CoreError, Result};
pub use filter::{
    deduplicate, filter_by_extension, parent_directories, remove_blank, strip_root, ExtensionSet,
};
pub use package::{
    ChartPackager, HelmPackager, PackageOutcome, PackageReport, PackagedArtifact, Packager,
};
pub use select::{ChangeLister, ChangeSource, GitCli, Selection};
