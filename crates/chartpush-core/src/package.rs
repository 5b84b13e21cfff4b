//! Chart packaging
//!
//! [`Packager`] turns candidate directories into archives. Directories that
//! are not charts are skipped and packaging failures are recorded per
//! candidate, so one bad chart never stops the batch.

use std::path::{Path, PathBuf};

use crate::archive::{create_archive, file_digest};
use crate::chart::{is_chart_dir, LoadedChart};
use crate::error::{CoreError, Result};

/// Packaging capability used by [`Packager`]
pub trait ChartPackager {
    /// Whether `path` is a well-formed chart directory
    fn is_chart_dir(&self, path: &Path) -> bool;

    /// Load the chart definition from a directory
    fn load_chart_dir(&self, path: &Path) -> Result<LoadedChart>;

    /// Write the chart archive into `output_dir`, returning its path
    fn save_archive(&self, chart: &LoadedChart, output_dir: &Path) -> Result<PathBuf>;
}

/// Packages charts as Helm-layout `.tgz` archives
#[derive(Debug, Clone, Copy, Default)]
pub struct HelmPackager;

impl ChartPackager for HelmPackager {
    fn is_chart_dir(&self, path: &Path) -> bool {
        is_chart_dir(path)
    }

    fn load_chart_dir(&self, path: &Path) -> Result<LoadedChart> {
        LoadedChart::load(path)
    }

    fn save_archive(&self, chart: &LoadedChart, output_dir: &Path) -> Result<PathBuf> {
        create_archive(chart, output_dir)
    }
}

/// An archive produced from a validated chart directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    /// Absolute path of the archive
    pub archive: PathBuf,
    /// Candidate directory the archive was built from
    pub source: PathBuf,
    /// Chart name
    pub name: String,
    /// Chart version
    pub version: String,
    /// `sha256:` digest of the archive
    pub digest: String,
}

/// Result of packaging one candidate
#[derive(Debug)]
pub enum PackageOutcome {
    /// Archive written
    Packaged(PackagedArtifact),
    /// Candidate is not a chart directory
    NotAChart,
    /// Candidate looked like a chart but packaging failed
    Failed(CoreError),
}

/// Summary of a packaging batch
#[derive(Debug, Default)]
pub struct PackageReport {
    pub artifacts: Vec<PackagedArtifact>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, CoreError)>,
}

impl PackageReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Drives a [`ChartPackager`] over candidate directories
pub struct Packager<P = HelmPackager> {
    packager: P,
}

impl Default for Packager<HelmPackager> {
    fn default() -> Self {
        Self::new(HelmPackager)
    }
}

impl<P: ChartPackager> Packager<P> {
    pub fn new(packager: P) -> Self {
        Self { packager }
    }

    /// Package a single candidate directory into `output_dir`
    pub fn package(&self, candidate: &Path, output_dir: &Path) -> PackageOutcome {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            tracing::warn!(
                "{}: cannot create output directory {}: {}",
                candidate.display(),
                output_dir.display(),
                e
            );
            return PackageOutcome::Failed(e.into());
        }

        if !self.packager.is_chart_dir(candidate) {
            tracing::info!("Skipping {}: not a chart directory", candidate.display());
            return PackageOutcome::NotAChart;
        }

        match self.try_package(candidate, output_dir) {
            Ok(artifact) => {
                tracing::info!(
                    "Packaged {} {} -> {}",
                    artifact.name,
                    artifact.version,
                    artifact.archive.display()
                );
                PackageOutcome::Packaged(artifact)
            }
            Err(e) => {
                tracing::warn!("{}: {}", candidate.display(), e);
                PackageOutcome::Failed(e)
            }
        }
    }

    fn try_package(&self, candidate: &Path, output_dir: &Path) -> Result<PackagedArtifact> {
        let chart = self.packager.load_chart_dir(candidate)?;
        let archive = self.packager.save_archive(&chart, output_dir)?;
        let archive = std::path::absolute(&archive)?;
        let digest = file_digest(&archive)?;

        Ok(PackagedArtifact {
            archive,
            source: candidate.to_path_buf(),
            name: chart.chart.name.clone(),
            version: chart.chart.version.to_string(),
            digest,
        })
    }

    /// Package every candidate, continuing past skipped and failed ones
    pub fn package_all(&self, candidates: &[PathBuf], output_dir: &Path) -> PackageReport {
        let mut report = PackageReport::default();

        for candidate in candidates {
            match self.package(candidate, output_dir) {
                PackageOutcome::Packaged(artifact) => report.artifacts.push(artifact),
                PackageOutcome::NotAChart => report.skipped.push(candidate.clone()),
                PackageOutcome::Failed(e) => report.failed.push((candidate.clone(), e)),
            }
        }

        report
    }
}
