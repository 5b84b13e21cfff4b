//! Batch upload of packaged charts
//!
//! Uploads are attempted one after another. A rejected upload never stops
//! the batch; a transport failure stops it only under
//! [`UploadFailurePolicy::Abort`].

use chartpush_core::PackagedArtifact;
use std::fmt;
use std::str::FromStr;

use crate::client::{ApiResponse, RegistryClient};
use crate::error::RegistryError;

/// What to do with the rest of the batch after a transport failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadFailurePolicy {
    /// Record the failure and keep uploading
    #[default]
    Continue,
    /// Stop and skip the remaining artifacts
    Abort,
}

impl FromStr for UploadFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown upload failure policy '{}' (expected 'continue' or 'abort')",
                other
            )),
        }
    }
}

impl fmt::Display for UploadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Outcome of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// Registry accepted the chart
    Uploaded(ApiResponse),
    /// Registry answered with a non-2xx status
    Rejected { status: u16, message: String },
    /// No usable response (network, timeout, unreadable archive)
    Failed(String),
    /// Not attempted because the batch was aborted
    Skipped,
}

/// Upload outcome for a single artifact
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub artifact: PackagedArtifact,
    pub status: UploadStatus,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, UploadStatus::Uploaded(_))
    }
}

/// Summary of an upload batch
#[derive(Debug, Default)]
pub struct UploadReport {
    pub results: Vec<UploadResult>,
    /// Batch stopped early after a transport failure
    pub aborted: bool,
}

impl UploadReport {
    pub fn uploaded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.is_success())
    }
}

/// Uploads artifacts through a [`RegistryClient`]
pub struct Uploader<'a> {
    client: &'a RegistryClient,
    policy: UploadFailurePolicy,
}

impl<'a> Uploader<'a> {
    pub fn new(client: &'a RegistryClient, policy: UploadFailurePolicy) -> Self {
        Self { client, policy }
    }

    /// Upload every artifact in order
    pub async fn upload_all(&self, artifacts: &[PackagedArtifact]) -> UploadReport {
        let mut report = UploadReport::default();

        for artifact in artifacts {
            let status = if report.aborted {
                UploadStatus::Skipped
            } else {
                self.upload_one(artifact, &mut report.aborted).await
            };

            report.results.push(UploadResult {
                artifact: artifact.clone(),
                status,
            });
        }

        report
    }

    async fn upload_one(&self, artifact: &PackagedArtifact, aborted: &mut bool) -> UploadStatus {
        tracing::info!("Uploading {}", artifact.archive.display());

        match self.client.upload_chart(&artifact.archive).await {
            Ok(response) => {
                tracing::info!(
                    "Uploaded {} {} ({})",
                    artifact.name,
                    artifact.version,
                    response.status
                );
                UploadStatus::Uploaded(response)
            }
            Err(RegistryError::Rejected { status, message }) => {
                tracing::warn!(
                    "Registry rejected {} {}: {} - {}",
                    artifact.name,
                    artifact.version,
                    status,
                    message
                );
                UploadStatus::Rejected { status, message }
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", artifact.archive.display(), e);
                if e.is_transport() && self.policy == UploadFailurePolicy::Abort {
                    tracing::error!("Aborting remaining uploads");
                    *aborted = true;
                }
                UploadStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artifact(dir: &Path, name: &str, body: Option<&str>) -> PackagedArtifact {
        let archive: PathBuf = dir.join(format!("{}-1.0.0.tgz", name));
        if let Some(body) = body {
            std::fs::write(&archive, body).unwrap();
        }
        PackagedArtifact {
            archive,
            source: dir.join(name),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            digest: String::new(),
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "continue".parse::<UploadFailurePolicy>(),
            Ok(UploadFailurePolicy::Continue)
        );
        assert_eq!(
            "ABORT".parse::<UploadFailurePolicy>(),
            Ok(UploadFailurePolicy::Abort)
        );
        assert!("retry".parse::<UploadFailurePolicy>().is_err());
        assert_eq!(UploadFailurePolicy::default().to_string(), "continue");
    }

    #[tokio::test]
    async fn test_rejection_does_not_stop_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/charts"))
            .and(body_bytes(b"two".to_vec()))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/charts"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"saved":true}"#))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "one", Some("one")),
            artifact(dir.path(), "two", Some("two")),
            artifact(dir.path(), "three", Some("three")),
        ];
        let client = RegistryClient::new(&server.uri(), None, &ClientOptions::default()).unwrap();

        let report = Uploader::new(&client, UploadFailurePolicy::Abort)
            .upload_all(&artifacts)
            .await;

        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        assert!(!report.aborted);
        assert_eq!(report.uploaded(), 2);
        assert!(report.results[0].is_success());
        assert_eq!(
            report.results[1].status,
            UploadStatus::Rejected {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert!(report.results[2].is_success());
        assert_eq!(report.results[2].artifact.name, "three");
    }

    #[tokio::test]
    async fn test_transport_failure_continue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "one", Some("one")),
            artifact(dir.path(), "missing", None),
            artifact(dir.path(), "three", Some("three")),
        ];
        let client = RegistryClient::new(&server.uri(), None, &ClientOptions::default()).unwrap();

        let report = Uploader::new(&client, UploadFailurePolicy::Continue)
            .upload_all(&artifacts)
            .await;

        assert!(!report.aborted);
        assert!(matches!(report.results[1].status, UploadStatus::Failed(_)));
        assert!(report.results[2].is_success());
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_abort() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "one", Some("one")),
            artifact(dir.path(), "missing", None),
            artifact(dir.path(), "three", Some("three")),
        ];
        let client = RegistryClient::new(&server.uri(), None, &ClientOptions::default()).unwrap();

        let report = Uploader::new(&client, UploadFailurePolicy::Abort)
            .upload_all(&artifacts)
            .await;

        assert!(report.aborted);
        assert!(report.has_failures());
        assert_eq!(report.results[2].status, UploadStatus::Skipped);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
