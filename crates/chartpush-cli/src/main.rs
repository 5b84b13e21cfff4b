//! chartpush CLI - package changed Helm charts and push them to ChartMuseum

use clap::Parser;
use std::path::PathBuf;

use chartpush_core::GitCli;
use chartpush_registry::UploadFailurePolicy;

mod config;
mod display;
mod error;
mod exit_codes;
mod pipeline;
mod util;

use config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "chartpush")]
#[command(author = "chartpush Contributors")]
#[command(version)]
#[command(about = "Package changed Helm charts and upload them to ChartMuseum", long_about = None)]
pub struct Cli {
    /// ChartMuseum base URL
    #[arg(long, env = "PLUGIN_REPO_URL")]
    pub repo_url: Option<String>,

    /// Package and upload this chart only (overrides diff and scan)
    #[arg(long, env = "PLUGIN_CHART_PATH")]
    pub chart_path: Option<PathBuf>,

    /// Directory holding the charts, relative to the workspace
    #[arg(long, env = "PLUGIN_CHARTS_DIR", default_value = ".")]
    pub chart_dir: PathBuf,

    /// Repository working tree
    #[arg(long, env = "PLUGIN_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Directory the packaged archives are written to
    #[arg(long, env = "PLUGIN_SAVE_DIR", default_value = "uploads")]
    pub save_dir: PathBuf,

    /// Previous commit of the diff range [fallback: DRONE_PREV_COMMIT_SHA]
    #[arg(long, env = "PLUGIN_PREVIOUS_COMMIT")]
    pub previous_commit: Option<String>,

    /// Current commit of the diff range [fallback: DRONE_COMMIT_SHA]
    #[arg(long, env = "PLUGIN_CURRENT_COMMIT")]
    pub current_commit: Option<String>,

    /// Basic auth username
    #[arg(long, env = "PLUGIN_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "PLUGIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "PLUGIN_SKIP_TLS_VERIFY")]
    pub skip_tls_verify: bool,

    /// Per-request upload timeout in seconds
    #[arg(long, env = "PLUGIN_TIMEOUT", default_value_t = 5)]
    pub timeout: u64,

    /// File extensions that mark a changed chart file
    #[arg(
        long,
        env = "PLUGIN_EXTENSIONS",
        value_delimiter = ',',
        default_values_t = [".yaml".to_string(), ".yml".to_string()]
    )]
    pub extensions: Vec<String>,

    /// What to do after an upload transport failure: continue or abort
    #[arg(long, env = "PLUGIN_ON_UPLOAD_ERROR", default_value_t = UploadFailurePolicy::Continue)]
    pub on_upload_error: UploadFailurePolicy,

    /// Path to the git binary
    #[arg(long, env = "PLUGIN_GIT", default_value = "git")]
    pub git: PathBuf,

    /// Package only, do not upload
    #[arg(long, env = "PLUGIN_DRY_RUN")]
    pub dry_run: bool,

    /// Exit non-zero when any chart fails to package or upload
    #[arg(long, env = "PLUGIN_FAIL_ON_ERROR")]
    pub fail_on_error: bool,

    /// Enable debug output
    #[arg(long, env = "PLUGIN_DEBUG")]
    pub debug: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let git = GitCli::new(cli.git.clone());
    let result = match RunConfig::from_cli(cli, |key| std::env::var(key).ok()) {
        Ok(config) => pipeline::run(&config, &git).await.and_then(|summary| {
            display::print_summary(&summary);
            summary.check(config.fail_on_error)
        }),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        let code = e.exit_code();
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(code);
    }
}
