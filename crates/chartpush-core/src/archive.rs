//! Archive creation for packaged charts
//!
//! Produces Helm-layout `.tgz` archives: every entry lives under a
//! top-level directory named after the chart, with `Chart.yaml` first.

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};

use crate::chart::{LoadedChart, CHART_FILE};
use crate::error::Result;

/// Create a `.tgz` archive of a loaded chart inside `output_dir`
///
/// Returns the path to the created archive. A partially written archive is
/// removed when packaging fails.
pub fn create_archive(chart: &LoadedChart, output_dir: &Path) -> Result<PathBuf> {
    let files = chart.files()?;
    let output = output_dir.join(default_archive_name(chart));

    match write_archive(chart, &files, &output) {
        Ok(()) => Ok(output),
        Err(e) => {
            if output.exists() {
                let _ = std::fs::remove_file(&output);
            }
            Err(e)
        }
    }
}

fn write_archive(chart: &LoadedChart, files: &[PathBuf], output: &Path) -> Result<()> {
    let prefix = &chart.chart.name;

    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    // Chart.yaml first so readers can stop early
    add_file_to_archive(
        &mut builder,
        &chart.root.join(CHART_FILE),
        &format!("{}/{}", prefix, CHART_FILE),
    )?;

    for rel in files {
        if rel == Path::new(CHART_FILE) {
            continue;
        }
        let archive_path = format!(
            "{}/{}",
            prefix,
            rel.to_string_lossy().replace('\\', "/")
        );
        add_file_to_archive(&mut builder, &chart.root.join(rel), &archive_path)?;
    }

    let encoder = builder.into_inner()?;
    let mut file = encoder.finish()?;
    file.flush()?;

    Ok(())
}

/// SHA256 digest of a file, formatted as `sha256:<hex>`
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Add a file to a tar archive
fn add_file_to_archive<W: Write>(
    builder: &mut Builder<W>,
    file_path: &Path,
    archive_path: &str,
) -> Result<()> {
    let content = std::fs::read(file_path)?;
    add_bytes_to_archive(builder, archive_path, &content)
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // Reproducible builds: use epoch time
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}

/// Generate the default archive filename for a chart
#[must_use]
pub fn default_archive_name(chart: &LoadedChart) -> String {
    format!("{}-{}.tgz", chart.chart.name, chart.chart.version)
}
