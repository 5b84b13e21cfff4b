//! chartpush Registry - ChartMuseum uploads
//!
//! This crate provides the remote half of the chartpush pipeline:
//!
//! - **Client**: streams chart archives to `POST {base}/api/charts`
//! - **Credentials**: HTTP basic auth, attached only when fully configured
//! - **Uploader**: best-effort batch upload with a configurable
//!   transport-failure policy
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartpush_registry::{ClientOptions, RegistryClient, UploadFailurePolicy, Uploader};
//!
//! # async fn example(artifacts: Vec<chartpush_core::PackagedArtifact>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::new("https://charts.example.com", None, &ClientOptions::default())?;
//! let report = Uploader::new(&client, UploadFailurePolicy::Continue)
//!     .upload_all(&artifacts)
//!     .await;
//! println!("{} uploaded", report.uploaded());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Redirects are never followed, so credentials stay on the registry origin
//! - TLS verification can be disabled per run for internal registries

pub mod client;
pub mod credentials;
pub mod error;
pub mod upload;

pub use client::{ApiResponse, ClientOptions, RegistryClient, DEFAULT_TIMEOUT, USER_AGENT};
pub use credentials::BasicAuth;
pub use error::{RegistryError, Result};
pub use upload::{UploadFailurePolicy, UploadReport, UploadResult, UploadStatus, Uploader};
