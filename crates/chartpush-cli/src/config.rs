//! Run configuration
//!
//! Flattens the parsed command line (flags and `PLUGIN_*` variables) plus
//! the CI fallbacks into the settings one run needs.

use std::path::PathBuf;
use std::time::Duration;

use chartpush_core::{ExtensionSet, Selection};
use chartpush_registry::{BasicAuth, ClientOptions, UploadFailurePolicy};

use crate::Cli;
use crate::error::{CliError, Result};

/// CI variable used when no previous commit is configured
pub const PREVIOUS_COMMIT_FALLBACK: &str = "DRONE_PREV_COMMIT_SHA";
/// CI variable used when no current commit is configured
pub const CURRENT_COMMIT_FALLBACK: &str = "DRONE_COMMIT_SHA";

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Registry base URL, `None` in dry-run mode
    pub registry_url: Option<String>,
    pub credentials: Option<BasicAuth>,
    pub client: ClientOptions,
    pub upload_policy: UploadFailurePolicy,
    pub selection: Selection,
    pub workspace: PathBuf,
    pub chart_dir: PathBuf,
    pub extensions: ExtensionSet,
    pub save_dir: PathBuf,
    pub dry_run: bool,
    pub fail_on_error: bool,
}

impl RunConfig {
    /// Build the run configuration
    ///
    /// `env` looks up the CI fallback variables; tests pass a closure over a
    /// fixed map.
    pub fn from_cli<F>(cli: Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry_url = match non_blank(cli.repo_url) {
            Some(url) => Some(url),
            None if cli.dry_run => None,
            None => {
                return Err(CliError::config_with_help(
                    "registry URL is required",
                    "Set --repo-url (or PLUGIN_REPO_URL), or pass --dry-run to package only",
                ));
            }
        };

        if cli.timeout == 0 {
            return Err(CliError::config("timeout must be at least one second"));
        }

        let extensions = ExtensionSet::new(cli.extensions.iter().map(|e| e.trim()));
        if extensions.is_empty() {
            return Err(CliError::config_with_help(
                "no file extensions configured",
                "Pass --extensions .yaml,.yml",
            ));
        }

        let previous =
            non_blank(cli.previous_commit).or_else(|| non_blank(env(PREVIOUS_COMMIT_FALLBACK)));
        let current =
            non_blank(cli.current_commit).or_else(|| non_blank(env(CURRENT_COMMIT_FALLBACK)));
        let selection = Selection::resolve(cli.chart_path, previous, current);

        let credentials = BasicAuth::from_parts(cli.username.as_deref(), cli.password.as_deref());
        if credentials.is_none() && (cli.username.is_some() || cli.password.is_some()) {
            tracing::debug!("Incomplete credentials, uploading without authentication");
        }

        Ok(Self {
            registry_url,
            credentials,
            client: ClientOptions {
                insecure_skip_tls_verify: cli.skip_tls_verify,
                timeout: Duration::from_secs(cli.timeout),
            },
            upload_policy: cli.on_upload_error,
            selection,
            workspace: cli.workspace,
            chart_dir: cli.chart_dir,
            extensions,
            save_dir: cli.save_dir,
            dry_run: cli.dry_run,
            fail_on_error: cli.fail_on_error,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
