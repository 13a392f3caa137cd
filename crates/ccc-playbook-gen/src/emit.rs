//! YAML playbook output.

use chrono::NaiveDateTime;
use ccc_orch_common::{OrchError, OrchResult};
use serde_json::Value;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Renders a document as block-style YAML with a `---` marker.
///
/// Keys keep their insertion order.
pub fn render_yaml(document: &Value) -> OrchResult<String> {
    let body = serde_yaml::to_string(document)
        .map_err(|e| OrchError::internal(format!("YAML serialization failed: {}", e)))?;
    Ok(format!("---\n{}", body))
}

/// `<module>_playbook_<DD_Mon_YYYY_HH_MM_SS_MS>.yml`
pub fn default_file_name(module: &str, at: NaiveDateTime) -> String {
    format!("{}_playbook_{}.yml", module, at.format("%d_%b_%Y_%H_%M_%S_%3f"))
}

/// Writes `document` to `path`, creating parent directories.
///
/// Without `overwrite` an existing file is an error rather than being
/// replaced.
#[instrument(skip(document), fields(path = %path.display()))]
pub async fn write_playbook(path: &Path, document: &Value, overwrite: bool) -> OrchResult<()> {
    let text = render_yaml(document)?;
    let io_err = |e: std::io::Error| OrchError::io(path.display().to_string(), e.to_string());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options.open(path).await.map_err(io_err)?;
    file.write_all(text.as_bytes()).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;

    info!(bytes = text.len(), "Playbook written");
    Ok(())
}
