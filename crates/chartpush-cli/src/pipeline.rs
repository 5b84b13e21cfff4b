//! Run pipeline: select, package, upload
//!
//! Stages run strictly in order. Configuration and selection errors end the
//! run; per-chart packaging and upload failures are collected into the
//! [`RunSummary`].

use std::fmt;
use std::path::PathBuf;

use chartpush_core::{
    deduplicate, ChangeLister, ChangeSource, HelmPackager, PackageReport, Packager,
};
use chartpush_registry::{RegistryClient, UploadReport, Uploader};

use crate::config::RunConfig;
use crate::error::{CliError, Result};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Selecting,
    Packaging,
    Uploading,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Selecting => "selecting",
            Stage::Packaging => "packaging",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

struct Progress {
    stage: Stage,
}

impl Progress {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!("stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// What one run did
#[derive(Debug)]
pub struct RunSummary {
    /// Active selection mode
    pub mode: &'static str,
    pub candidates: Vec<PathBuf>,
    pub packaging: PackageReport,
    /// `None` when nothing was uploaded (dry run or no artifacts)
    pub uploads: Option<UploadReport>,
}

impl RunSummary {
    pub fn failed_uploads(&self) -> usize {
        self.uploads
            .as_ref()
            .map(|r| r.results.iter().filter(|r| !r.is_success()).count())
            .unwrap_or(0)
    }

    /// Turn per-chart failures into an error when `fail_on_error` is set
    pub fn check(&self, fail_on_error: bool) -> Result<()> {
        let packaging = self.packaging.failed.len();
        let uploading = self.failed_uploads();

        if fail_on_error && (packaging > 0 || uploading > 0) {
            return Err(CliError::Batch {
                packaging,
                uploading,
            });
        }
        Ok(())
    }
}

/// Execute one run
pub async fn run<L: ChangeLister>(config: &RunConfig, lister: &L) -> Result<RunSummary> {
    let mut progress = Progress::new();

    // An unusable registry URL must fail before any work is done
    let client = match &config.registry_url {
        Some(url) if !config.dry_run => Some(RegistryClient::new(
            url,
            config.credentials.clone(),
            &config.client,
        )?),
        _ => None,
    };

    progress.advance(Stage::Selecting);
    tracing::info!("Selecting charts ({} mode)", config.selection.mode_name());
    let source = ChangeSource::new(
        lister,
        &config.workspace,
        &config.chart_dir,
        &config.extensions,
    );
    let candidates = deduplicate(source.candidates(&config.selection)?);
    for candidate in &candidates {
        tracing::debug!("candidate {}", candidate.display());
    }

    let mut summary = RunSummary {
        mode: config.selection.mode_name(),
        candidates,
        packaging: PackageReport::default(),
        uploads: None,
    };

    if summary.candidates.is_empty() {
        tracing::info!("No charts to package");
        progress.advance(Stage::Done);
        return Ok(summary);
    }

    progress.advance(Stage::Packaging);
    summary.packaging =
        Packager::new(HelmPackager).package_all(&summary.candidates, &config.save_dir);

    if let Some(client) = &client {
        if !summary.packaging.artifacts.is_empty() {
            progress.advance(Stage::Uploading);
            tracing::info!("Uploading to {}", client.base_url());
            let report = Uploader::new(client, config.upload_policy)
                .upload_all(&summary.packaging.artifacts)
                .await;
            summary.uploads = Some(report);
        }
    } else {
        tracing::info!("Dry run, skipping upload");
    }

    progress.advance(Stage::Done);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use chartpush_core::{CoreError, ExtensionSet, Selection};
    use chartpush_registry::{ClientOptions, UploadFailurePolicy};
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedLister(Vec<String>);

    impl ChangeLister for FixedLister {
        fn changed_files(
            &self,
            _repo: &Path,
            _previous: &str,
            _current: &str,
        ) -> chartpush_core::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct UnknownRevisionLister;

    impl ChangeLister for UnknownRevisionLister {
        fn changed_files(
            &self,
            _repo: &Path,
            previous: &str,
            _current: &str,
        ) -> chartpush_core::Result<Vec<String>> {
            Err(CoreError::UnknownRevision {
                revision: previous.to_string(),
            })
        }
    }

    fn no_changes() -> FixedLister {
        FixedLister(Vec::new())
    }

    fn write_chart(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("Chart.yaml"),
            format!("apiVersion: v2\nname: {}\nversion: 1.0.0\n", name),
        )
        .unwrap();
        std::fs::write(dir.join("values.yaml"), "replicas: 1\n").unwrap();
    }

    fn config(workspace: &Path, url: Option<String>, selection: Selection) -> RunConfig {
        RunConfig {
            registry_url: url,
            credentials: None,
            client: ClientOptions::default(),
            upload_policy: UploadFailurePolicy::Continue,
            selection,
            workspace: workspace.to_path_buf(),
            chart_dir: PathBuf::from("charts"),
            extensions: ExtensionSet::default(),
            save_dir: workspace.join("uploads"),
            dry_run: false,
            fail_on_error: false,
        }
    }

    async fn accepting_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/charts"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"saved":true}"#))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_diff_run_uploads_changed_chart() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("charts/foo"), "foo");
        write_chart(&temp.path().join("charts/bar"), "bar");
        let server = accepting_server().await;

        let lister = FixedLister(vec![
            "charts/foo/values.yaml".to_string(),
            "README.md".to_string(),
            String::new(),
        ]);
        let selection = Selection::Diff {
            previous: "aaa".to_string(),
            current: "bbb".to_string(),
        };
        let config = config(temp.path(), Some(server.uri()), selection);

        let summary = run(&config, &lister).await.unwrap();

        assert_eq!(summary.mode, "diff");
        assert_eq!(summary.candidates, vec![temp.path().join("charts/foo")]);
        assert_eq!(summary.packaging.artifacts.len(), 1);
        assert!(temp.path().join("uploads/foo-1.0.0.tgz").is_file());

        let uploads = summary.uploads.as_ref().unwrap();
        assert_eq!(uploads.uploaded(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert!(summary.check(true).is_ok());
    }

    #[tokio::test]
    async fn test_scan_run_skips_non_charts() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("charts/foo"), "foo");
        write_chart(&temp.path().join("charts/bar"), "bar");
        std::fs::create_dir_all(temp.path().join("charts/docs")).unwrap();
        let server = accepting_server().await;

        let config = config(temp.path(), Some(server.uri()), Selection::Scan);
        let summary = run(&config, &no_changes()).await.unwrap();

        assert_eq!(summary.candidates.len(), 3);
        assert_eq!(summary.packaging.artifacts.len(), 2);
        assert_eq!(summary.packaging.skipped, vec![temp.path().join("charts/docs")]);
        assert_eq!(summary.uploads.as_ref().unwrap().uploaded(), 2);
    }

    #[tokio::test]
    async fn test_explicit_run_ignores_other_inputs() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("elsewhere/baz");
        write_chart(&chart, "baz");
        write_chart(&temp.path().join("charts/foo"), "foo");
        let server = accepting_server().await;

        let config = config(
            temp.path(),
            Some(server.uri()),
            Selection::Explicit(chart.clone()),
        );
        let lister = FixedLister(vec!["charts/foo/Chart.yaml".to_string()]);
        let summary = run(&config, &lister).await.unwrap();

        assert_eq!(summary.candidates, vec![chart]);
        assert_eq!(summary.packaging.artifacts[0].name, "baz");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_packaging() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("charts/foo"), "foo");

        let config = config(temp.path(), Some("not a url".to_string()), Selection::Scan);
        let err = run(&config, &no_changes()).await.unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
        assert!(!temp.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_unknown_revision_is_fatal() {
        let temp = TempDir::new().unwrap();
        let selection = Selection::Diff {
            previous: "deadbeef".to_string(),
            current: "HEAD".to_string(),
        };
        let config = config(temp.path(), Some("http://127.0.0.1:9".to_string()), selection);

        let err = run(&config, &UnknownRevisionLister).await.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::SELECTION_ERROR);
    }

    #[tokio::test]
    async fn test_missing_chart_root_is_io_error() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path(), Some("http://127.0.0.1:9".to_string()), Selection::Scan);

        let err = run(&config, &no_changes()).await.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[tokio::test]
    async fn test_dry_run_packages_without_upload() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("charts/foo"), "foo");

        let mut config = config(temp.path(), None, Selection::Scan);
        config.dry_run = true;
        let summary = run(&config, &no_changes()).await.unwrap();

        assert_eq!(summary.packaging.artifacts.len(), 1);
        assert!(summary.uploads.is_none());
    }

    #[tokio::test]
    async fn test_no_candidates_is_success() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("charts")).unwrap();
        let selection = Selection::Diff {
            previous: "aaa".to_string(),
            current: "bbb".to_string(),
        };
        let lister = FixedLister(vec!["docs/index.md".to_string()]);
        let config = config(temp.path(), Some("http://127.0.0.1:9".to_string()), selection);

        let summary = run(&config, &lister).await.unwrap();
        assert!(summary.candidates.is_empty());
        assert!(summary.uploads.is_none());
    }

    #[tokio::test]
    async fn test_upload_failures_reported_or_raised() {
        let temp = TempDir::new().unwrap();
        write_chart(&temp.path().join("charts/foo"), "foo");
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string(r#"{"error":"exists"}"#))
            .mount(&server)
            .await;

        let config = config(temp.path(), Some(server.uri()), Selection::Scan);
        let summary = run(&config, &no_changes()).await.unwrap();

        assert_eq!(summary.failed_uploads(), 1);
        assert!(summary.check(false).is_ok());
        let err = summary.check(true).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::UPLOAD_ERROR);
    }
}
